use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use log::trace;
use tokio::select;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::actors::client::ClientHandle;
use crate::actors::room::{RoomHandle, RoomMessage};
use crate::actors::supervisor::ExitCallback;
use crate::db;
use crate::models;
use crate::protocol::*;
use crate::roles::AccessApi;
use crate::schema;

// Chat actor owns one room actor per active room, admits clients
// after a membership check and wires them to their room.

pub struct ConnectMessage {
    pub websocket: WebSocket,
    pub user: Uuid,
    pub room: Uuid,
    pub since: i64,
}

pub enum ChatActorMessage {
    Connect(ConnectMessage),
}

struct ChatActor {
    receiver: mpsc::UnboundedReceiver<ChatActorMessage>,
    client_id: i32,
    rooms: HashMap<Uuid, RoomHandle>,
    access: Arc<AccessApi>,
    pool: db::DbConnectionPool,
    exit_channel: (
        mpsc::UnboundedSender<Uuid>,
        mpsc::UnboundedReceiver<Uuid>,
    ),
}

impl ChatActor {
    fn new(
        receiver: mpsc::UnboundedReceiver<ChatActorMessage>,
        access: Arc<AccessApi>,
        pool: db::DbConnectionPool,
    ) -> Self {
        Self {
            receiver,
            client_id: 0,
            rooms: HashMap::new(),
            access,
            pool,
            exit_channel: mpsc::unbounded_channel(),
        }
    }

    async fn run(&mut self) {
        trace!("chat: actor start");
        loop {
            select! {
                msg = self.receiver.recv() => {
                    match msg {
                        Some(msg) => self.handle_message(msg).await,
                        None => break
                    }
                },
                Some(id) = self.exit_channel.1.recv() => {
                    trace!("chat: room exit, id: {}", id);
                    self.rooms.remove(&id);
                },
            }
        }
        trace!("chat: actor exit");
    }

    async fn handle_message(&mut self, msg: ChatActorMessage) {
        match msg {
            ChatActorMessage::Connect(msg) => {
                self.handle_connect(msg).await;
            }
        }
    }

    async fn handle_connect(&mut self, msg: ConnectMessage) {
        trace!("chat: client connect");

        let ConnectMessage { mut websocket, user, room, since } = msg;

        let room_model = {
            let res = match self.pool.get().await {
                Ok(mut conn) => {
                    schema::chat_rooms::table
                        .find(&room)
                        .select(models::ChatRoom::as_select())
                        .first(&mut conn)
                        .await
                }
                Err(_) => {
                    send_room_error(
                        &mut websocket,
                        room,
                        ErrorCode::InternalServerError,
                    )
                    .await;
                    return;
                }
            };
            match res {
                Ok(room_model) => room_model,
                Err(_) => {
                    send_room_error(&mut websocket, room, ErrorCode::NotFound)
                        .await;
                    return;
                }
            }
        };

        // any role within the room's institution may join
        if self
            .access
            .role(user, room_model.institution_id)
            .await
            .is_err()
        {
            send_room_error(&mut websocket, room, ErrorCode::Forbidden).await;
            return;
        }

        let room_handle = self.get_room_actor(room_model);

        // spawn client actor
        let client_id = self.get_client_id();
        let on_exit: ExitCallback = {
            let room_handle = room_handle.clone();
            Box::new(move || {
                trace!("client-{}: exit", client_id);
                _ = room_handle.send(RoomMessage::Unsubscribe { client_id });
            })
        };
        let client = ClientHandle::new(
            client_id,
            user,
            websocket,
            room_handle.clone(),
            since,
            Some(on_exit),
        );

        // subscribe client to the room
        _ = room_handle.send(RoomMessage::Subscribe {
            client_id,
            handle: client,
        });
    }

    fn get_client_id(&mut self) -> i32 {
        self.client_id += 1;
        self.client_id
    }

    fn get_room_actor(&mut self, room: models::ChatRoom) -> RoomHandle {
        match self.rooms.get(&room.id) {
            Some(handle) => handle.clone(),
            None => self.spawn_room_actor(room),
        }
    }

    fn spawn_room_actor(&mut self, room: models::ChatRoom) -> RoomHandle {
        let on_exit: ExitCallback = {
            let exit_sender = self.exit_channel.0.clone();
            let id = room.id;
            Box::new(move || {
                _ = exit_sender.send(id);
            })
        };
        let id = room.id;
        let handle = RoomHandle::new(room, self.pool.clone(), Some(on_exit));
        self.rooms.insert(id, handle.clone());
        handle
    }
}

async fn send_room_error(
    websocket: &mut WebSocket,
    room: Uuid,
    code: ErrorCode,
) {
    let msg = ServerMessage::RoomError(RoomErrorMessage { room, code });
    if let Ok(encoded) = serde_json::to_string(&msg) {
        let _ = websocket.send(Message::Text(encoded)).await;
    }
}

#[derive(Clone)]
pub struct ChatHandle {
    sender: mpsc::UnboundedSender<ChatActorMessage>,
}

impl ChatHandle {
    pub fn new(pool: db::DbConnectionPool, access: Arc<AccessApi>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut actor = ChatActor::new(receiver, access, pool);
        tokio::spawn(async move { actor.run().await });
        Self { sender }
    }

    pub fn send(&self, msg: ChatActorMessage) {
        _ = self.sender.send(msg);
    }
}
