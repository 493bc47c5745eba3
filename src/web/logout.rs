use super::redirect;
use crate::db::get_db_pool;
use crate::session::{get_token, remove_session, SESSION_LOGGED_IN_KEY, SESSION_TOKEN_KEY};
use actix_web::{get, HttpResponse};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_logout);
}

#[get("/logout")]
pub async fn view_logout(cookies: actix_session::Session) -> HttpResponse {
    match get_token(&cookies) {
        Some(token) => {
            if let Err(e) = remove_session(get_db_pool(), token).await {
                log::error!("view_logout: remove_session() {}", e);
            }
        }
        None => log::debug!("view_logout: missing token (already logged out?)"),
    }

    cookies.remove(SESSION_LOGGED_IN_KEY);
    cookies.remove(SESSION_TOKEN_KEY);

    redirect("/login")
}
