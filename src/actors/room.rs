use std::collections::HashMap;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use log::trace;
use tokio::{
    select,
    sync::{mpsc, oneshot},
    time::{sleep, Duration},
};
use uuid::Uuid;

use crate::actors::client::{ClientActorMessage, ClientHandle};
use crate::actors::supervisor::{ExitCallback, Supervisor};
use crate::db;
use crate::error::{internal_error, CampusError};
use crate::models;
use crate::protocol::*;
use crate::schema;

// Room actor stops after this long without subscribers
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

// Room actor persists messages of a single chat room, stamps them
// with a room-local ordinal and broadcasts them to all subscribed
// clients.

pub struct PostMessageToRoom {
    pub author: Uuid,
    pub body: String,
    pub reply: oneshot::Sender<Result<(), CampusError>>,
}

pub struct HistoryMessage {
    pub since: i64,
    pub reply: oneshot::Sender<Result<Vec<models::ChatMessage>, CampusError>>,
}

pub enum RoomMessage {
    Subscribe {
        client_id: i32,
        handle: ClientHandle,
    },
    Unsubscribe {
        client_id: i32,
    },
    Post(PostMessageToRoom),
    History(HistoryMessage),
}

struct RoomActor {
    id: Uuid,
    rev: i64,
    pool: db::DbConnectionPool,
    receiver: mpsc::UnboundedReceiver<RoomMessage>,
    subscribers: HashMap<i32, ClientHandle>,
}

impl RoomActor {
    async fn run(&mut self) {
        trace!("room-{}: actor start", self.id);
        loop {
            select! {
                msg = self.receiver.recv() => {
                    match msg {
                        Some(msg) => self.handle_message(msg).await,
                        None => break,
                    }
                },
                _ = sleep(IDLE_TIMEOUT), if self.subscribers.is_empty() => {
                    trace!("room-{}: idle, stopping", self.id);
                    break
                },
            }
        }
        trace!("room-{}: actor exit", self.id);
    }

    async fn handle_message(&mut self, msg: RoomMessage) {
        match msg {
            RoomMessage::Subscribe { client_id, handle } => {
                self.subscribers.insert(client_id, handle);
            }
            RoomMessage::Unsubscribe { client_id } => {
                self.subscribers.remove(&client_id);
            }
            RoomMessage::Post(msg) => {
                let PostMessageToRoom { author, body, reply } = msg;
                match self.post(author, body).await {
                    Ok(message) => {
                        let _ = reply.send(Ok(()));
                        self.broadcast(message);
                    }
                    Err(err) => {
                        let _ = reply.send(Err(err));
                    }
                }
            }
            RoomMessage::History(msg) => {
                let res = self.history(msg.since).await;
                let _ = msg.reply.send(res);
            }
        }
    }

    async fn connect(&self) -> Result<db::DbConnection, CampusError> {
        self.pool.get().await.map_err(internal_error)
    }

    async fn post(
        &mut self,
        author: Uuid,
        body: String,
    ) -> Result<models::ChatMessage, CampusError> {
        if body.trim().is_empty() {
            return Err(CampusError::bad_request("Message body is empty"));
        }
        let mut conn = self.connect().await?;
        let next_rev = self.rev + 1;
        let new_message = models::NewChatMessage {
            id: Uuid::new_v4(),
            room_id: self.id,
            ordinal: next_rev,
            author_id: author,
            body,
        };
        let message = diesel::insert_into(schema::chat_messages::table)
            .values(&new_message)
            .returning(models::ChatMessage::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(internal_error)?;
        let _ = diesel::update(schema::chat_rooms::table)
            .filter(schema::chat_rooms::id.eq(&self.id))
            .set(schema::chat_rooms::rev.eq(next_rev))
            .execute(&mut conn)
            .await
            .map_err(internal_error)?;
        self.rev = next_rev;
        Ok(message)
    }

    async fn history(
        &self,
        since: i64,
    ) -> Result<Vec<models::ChatMessage>, CampusError> {
        let mut conn = self.connect().await?;
        schema::chat_messages::table
            .filter(schema::chat_messages::room_id.eq(&self.id))
            .filter(schema::chat_messages::ordinal.gt(since))
            .order(schema::chat_messages::ordinal.asc())
            .select(models::ChatMessage::as_select())
            .get_results(&mut conn)
            .await
            .map_err(internal_error)
    }

    fn broadcast(&self, message: models::ChatMessage) {
        let msg = ServerMessage::Msg(ChatMessageBroadcast {
            id: message.id,
            room: message.room_id,
            ordinal: message.ordinal,
            author: message.author_id,
            body: message.body,
            created_at: message.created_at,
        });
        let Ok(encoded) = serde_json::to_string(&msg) else {
            return;
        };
        for handle in self.subscribers.values() {
            handle.send(ClientActorMessage::Raw(encoded.clone()));
        }
    }
}

#[derive(Clone)]
pub struct RoomHandle {
    pub id: Uuid,
    sender: mpsc::UnboundedSender<RoomMessage>,
}

impl RoomHandle {
    pub fn new(
        room: models::ChatRoom,
        pool: db::DbConnectionPool,
        on_exit: Option<ExitCallback>,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut actor = RoomActor {
            id: room.id,
            rev: room.rev,
            pool,
            receiver,
            subscribers: HashMap::new(),
        };
        let supervisor = Supervisor::new();
        supervisor.spawn(async move { actor.run().await }, on_exit);
        Self {
            id: room.id,
            sender,
        }
    }

    pub fn send(
        &self,
        msg: RoomMessage,
    ) -> Result<(), mpsc::error::SendError<RoomMessage>> {
        self.sender.send(msg)
    }
}
