use super::{db_error, login_redirect};
use crate::app_config;
use crate::db::get_db_pool;
use crate::leaderboard::{self, LeaderboardEntry};
use crate::middleware::ClientCtx;
use actix_web::{get, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_index).service(view_favicon);
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub client: ClientCtx,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub score: i32,
}

#[get("/")]
pub async fn view_index(client: ClientCtx) -> Result<impl Responder, Error> {
    let user_id = match client.get_id() {
        Some(id) => id,
        None => return Ok(login_redirect()),
    };

    let db = get_db_pool();
    let leaderboard = leaderboard::build(db, Some(user_id), &app_config::leaderboard())
        .await
        .map_err(|e| db_error("view_index", e))?;
    let score = crate::user::get_profile(db, user_id)
        .await
        .map_err(|e| db_error("view_index", e))?
        .map(|p| p.forum_score)
        .unwrap_or_default();

    Ok(IndexTemplate {
        client,
        leaderboard,
        score,
    }
    .to_response())
}

#[get("/favicon.ico")]
pub async fn view_favicon() -> HttpResponse {
    HttpResponse::MovedPermanently()
        .append_header(("Location", "/static/favicon.ico"))
        .finish()
}
