pub mod connection;
pub mod message;
pub mod server;

use crate::app_config;
use crate::middleware::ClientCtx;
use actix::Addr;
use actix_web::{get, web, Error, HttpRequest, HttpResponse, Responder};
use actix_web_actors::ws;
use askama_actix::{Template, TemplateToResponse};
use message::ChatAuthor;
use std::time::Duration;

/// How often heartbeat pings are sent
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
/// How long before lack of client response causes a timeout
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_chat_socket).service(view_chat);
}

/// Who a socket speaks as. Guests may listen and talk too.
pub fn author_for(client: &ClientCtx) -> ChatAuthor {
    match client.get_user() {
        Some(user) => ChatAuthor {
            user_id: Some(user.id),
            full_name: user.full_name(),
        },
        None => ChatAuthor::guest(),
    }
}

/// Entry point for our websocket route
#[get("/live-chat.ws")]
pub async fn view_chat_socket(
    client: ClientCtx,
    req: HttpRequest,
    stream: web::Payload,
    server: web::Data<Addr<server::ChatServer>>,
) -> Result<HttpResponse, Error> {
    ws::start(
        connection::Connection::new(
            author_for(&client),
            app_config::chat().room_id,
            server.get_ref().clone(),
        ),
        &req,
        stream,
    )
}

#[derive(Template)]
#[template(path = "chat.html")]
struct ChatTemplate {
    client: ClientCtx,
    room_id: u32,
}

#[get("/live-chat")]
pub async fn view_chat(client: ClientCtx) -> Result<impl Responder, Error> {
    if !client.is_user() {
        return Ok(super::login_redirect());
    }

    Ok(ChatTemplate {
        client,
        room_id: app_config::chat().room_id,
    }
    .to_response())
}
