use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum ErrorCode {
    #[serde(rename = "bad_request")]
    BadRequest,
    #[serde(rename = "auth_failed")]
    AuthFailed,
    #[serde(rename = "not_found")]
    NotFound,
    #[serde(rename = "forbidden")]
    Forbidden,
    #[serde(rename = "unprocessable_content")]
    UnprocessableContent,
    #[serde(rename = "internal_server_error")]
    InternalServerError,
}

#[derive(Serialize, Deserialize)]
pub struct HeartbeatMessage {
    pub i: i32,
}

#[derive(Serialize, Deserialize)]
pub struct RoomErrorMessage {
    pub room: Uuid,
    pub code: ErrorCode,
}

#[derive(Serialize, Deserialize)]
pub struct JoinedMessage {
    pub room: Uuid,
    pub rev: i64,
}

#[derive(Serialize, Deserialize)]
pub struct PostMessage {
    pub msgid: Uuid,
    pub body: String,
}

#[derive(Serialize, Deserialize)]
pub struct PostErrorMessage {
    pub msgid: Uuid,
    pub code: ErrorCode,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageBroadcast {
    pub id: Uuid,
    pub room: Uuid,
    pub ordinal: i64,
    pub author: Uuid,
    pub body: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ClientMessage {
    #[serde(rename = "h")]
    Heartbeat(HeartbeatMessage),

    #[serde(rename = "post")]
    Post(PostMessage),
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ServerMessage {
    #[serde(rename = "h")]
    Heartbeat(HeartbeatMessage),

    #[serde(rename = "joined")]
    Joined(JoinedMessage),

    #[serde(rename = "room_error")]
    RoomError(RoomErrorMessage),

    #[serde(rename = "msg")]
    Msg(ChatMessageBroadcast),

    #[serde(rename = "post_error")]
    PostError(PostErrorMessage),
}
