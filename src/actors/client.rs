use std::pin::Pin;

use axum::extract::ws::{Message, WebSocket};
use log::trace;
use tokio::{
    select,
    sync::{mpsc, oneshot},
    time::{sleep, Duration, Instant},
};
use uuid::Uuid;

use crate::actors::room;
use crate::actors::room::{RoomHandle, RoomMessage};
use crate::actors::supervisor::{ExitCallback, Supervisor};
use crate::protocol::*;

// Period after which the client is considered inactive and will be
// disconnected (clients send heartbeat messages every 30 seconds)
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(60);

// Client actor reads messages from the websocket connection,
// dispatches them to the room actor and relays replies and
// broadcasts back to the socket.

pub enum ClientActorMessage {
    Raw(String),
}

struct ClientActor {
    supervisor: Supervisor,
    client_id: i32,
    user_id: Uuid,
    websocket: WebSocket,
    receiver: mpsc::UnboundedReceiver<ClientActorMessage>,
    room: RoomHandle,
    since: i64,
    timeout: Pin<Box<tokio::time::Sleep>>,
}

impl ClientActor {
    async fn run(&mut self) {
        trace!("client-{}: start", self.client_id);

        self.replay_history().await;

        loop {
            select! {
                _ = &mut self.timeout => {
                    trace!("client-{}: disconnect by timeout", self.client_id);
                    break
                },
                Some(msg) = self.receiver.recv() => {
                    match msg {
                        ClientActorMessage::Raw(msg) => {
                            self.send_to_ws_raw(msg).await;
                        }
                    };
                },
                msg = self.websocket.recv() => {
                    match msg {
                        Some(Ok(msg)) => self.handle_message(msg).await,
                        _ => break
                    }
                },
            }
        }
    }

    /// Replays messages the client hasn't seen yet, then confirms
    /// the join.
    async fn replay_history(&mut self) {
        let (sender, receiver) = oneshot::channel();
        self.send_to_room(RoomMessage::History(room::HistoryMessage {
            since: self.since,
            reply: sender,
        }));
        match receiver.await {
            Ok(Ok(messages)) => {
                let mut rev = self.since;
                for message in &messages {
                    rev = rev.max(message.ordinal);
                }
                let mut replies: Vec<ServerMessage> = messages
                    .into_iter()
                    .map(|message| {
                        ServerMessage::Msg(ChatMessageBroadcast {
                            id: message.id,
                            room: message.room_id,
                            ordinal: message.ordinal,
                            author: message.author_id,
                            body: message.body,
                            created_at: message.created_at,
                        })
                    })
                    .collect();
                replies.push(ServerMessage::Joined(JoinedMessage {
                    room: self.room.id,
                    rev,
                }));
                self.send_to_ws_many(replies).await;
            }
            Ok(Err(err)) => {
                let msg = ServerMessage::RoomError(RoomErrorMessage {
                    room: self.room.id,
                    code: err.code,
                });
                self.send_to_ws(msg).await;
            }
            Err(_) => {
                let msg = ServerMessage::RoomError(RoomErrorMessage {
                    room: self.room.id,
                    code: ErrorCode::InternalServerError,
                });
                self.send_to_ws(msg).await;
            }
        }
    }

    async fn handle_message(&mut self, msg: Message) {
        let Message::Text(str) = msg else {
            // unsupported message type
            return;
        };
        let Ok(deserialized) = serde_json::from_str::<ClientMessage>(&str)
        else {
            // deserialize error
            return;
        };
        match deserialized {
            ClientMessage::Heartbeat(msg) => self.handle_heartbeat(msg).await,
            ClientMessage::Post(msg) => self.handle_post(msg).await,
        };
    }

    async fn handle_heartbeat(&mut self, msg: HeartbeatMessage) {
        // reset disconnect timeout
        self.timeout
            .as_mut()
            .reset(Instant::now() + DISCONNECT_TIMEOUT);

        let reply = HeartbeatMessage { i: msg.i + 1 };
        self.send_to_ws(ServerMessage::Heartbeat(reply)).await;
    }

    async fn handle_post(&mut self, msg: PostMessage) {
        let (sender, receiver) = oneshot::channel();
        self.send_to_room(RoomMessage::Post(room::PostMessageToRoom {
            author: self.user_id,
            body: msg.body,
            reply: sender,
        }));
        match receiver.await {
            Ok(Ok(())) => {
                // accepted, the broadcast will arrive like everyone
                // else's messages
            }
            Ok(Err(err)) => {
                let err = PostErrorMessage {
                    msgid: msg.msgid,
                    code: err.code,
                };
                self.send_to_ws(ServerMessage::PostError(err)).await;
            }
            Err(_) => {
                let err = PostErrorMessage {
                    msgid: msg.msgid,
                    code: ErrorCode::InternalServerError,
                };
                self.send_to_ws(ServerMessage::PostError(err)).await;
            }
        }
    }

    fn send_to_room(&self, msg: RoomMessage) {
        let res = self.room.send(msg);
        if res.is_err() {
            self.supervisor.stop();
        }
    }

    async fn send_to_ws(&mut self, msg: ServerMessage) {
        if let Ok(encoded) = serde_json::to_string(&msg) {
            self.send_to_ws_raw(encoded).await;
        }
    }

    async fn send_to_ws_many(&mut self, messages: Vec<ServerMessage>) {
        for msg in messages {
            self.send_to_ws(msg).await
        }
    }

    async fn send_to_ws_raw(&mut self, msg: String) {
        let res = self.websocket.send(Message::Text(msg)).await;
        if res.is_err() {
            self.supervisor.stop();
            return;
        }
        trace!("client-{}: sent message to websocket", self.client_id);
    }
}

#[derive(Clone)]
pub struct ClientHandle {
    sender: mpsc::UnboundedSender<ClientActorMessage>,
}

impl ClientHandle {
    pub fn new(
        client_id: i32,
        user_id: Uuid,
        websocket: WebSocket,
        room: RoomHandle,
        since: i64,
        on_exit: Option<ExitCallback>,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let supervisor = Supervisor::new();
        let mut actor = ClientActor {
            supervisor: supervisor.clone(),
            client_id,
            user_id,
            websocket,
            receiver,
            room,
            since,
            timeout: Box::pin(sleep(DISCONNECT_TIMEOUT)),
        };
        supervisor.spawn(async move { actor.run().await }, on_exit);
        Self { sender }
    }

    pub fn send(&self, msg: ClientActorMessage) {
        _ = self.sender.send(msg);
    }
}
