//! WebSocket connection actor for chat clients

use super::message::{ChatAuthor, ClientCommand, Connect, Disconnect, Post, Reply};
use super::server::ChatServer;
use super::{CLIENT_TIMEOUT, HEARTBEAT_INTERVAL};
use actix::*;
use actix_web_actors::ws;
use std::time::Instant;

pub struct Connection {
    /// Connection ID (assigned by server)
    pub id: usize,
    /// Name and id messages from this socket are shown with
    pub author: ChatAuthor,
    pub room: u32,
    /// Last heartbeat timestamp
    pub hb: Instant,
    pub server: Addr<ChatServer>,
}

impl Connection {
    pub fn new(author: ChatAuthor, room: u32, server: Addr<ChatServer>) -> Self {
        Self {
            id: 0,
            author,
            room,
            hb: Instant::now(),
            server,
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                log::debug!("Chat connection {} timed out", act.id);
                act.server.do_send(Disconnect { id: act.id });
                ctx.stop();
                return;
            }

            ctx.ping(b"");
        });
    }

    fn handle_text(&self, text: &str) {
        match serde_json::from_str::<ClientCommand>(text) {
            Ok(ClientCommand::Send { message }) => self.server.do_send(Post {
                id: self.id,
                author: self.author.clone(),
                message,
            }),
            Err(e) => log::warn!("Chat connection {} sent a bad frame: {}", self.id, e),
        }
    }
}

impl Actor for Connection {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);

        self.server
            .send(Connect {
                addr: ctx.address().recipient(),
                room: self.room,
            })
            .into_actor(self)
            .then(|res, act, ctx| {
                match res {
                    Ok(id) => act.id = id,
                    Err(err) => {
                        log::warn!("Failed to register chat connection: {:?}", err);
                        ctx.stop();
                    }
                }
                fut::ready(())
            })
            .wait(ctx);
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        self.server.do_send(Disconnect { id: self.id });
        Running::Stop
    }
}

impl Handler<Reply> for Connection {
    type Result = ();

    fn handle(&mut self, msg: Reply, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for Connection {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        let msg = match msg {
            Err(_) => {
                ctx.stop();
                return;
            }
            Ok(msg) => msg,
        };

        match msg {
            ws::Message::Ping(data) => {
                self.hb = Instant::now();
                ctx.pong(&data);
            }
            ws::Message::Pong(_) => {
                self.hb = Instant::now();
            }
            ws::Message::Text(text) => {
                self.hb = Instant::now();
                self.handle_text(&text);
            }
            ws::Message::Binary(_) => {
                log::debug!("Chat connection {} sent binary; ignored", self.id);
            }
            ws::Message::Close(reason) => {
                ctx.close(reason);
                ctx.stop();
            }
            ws::Message::Continuation(_) => {
                ctx.stop();
            }
            ws::Message::Nop => (),
        }
    }
}
