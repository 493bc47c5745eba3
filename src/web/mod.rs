pub mod account;
pub mod chat;
pub mod error;
pub mod forum;
pub mod index;
pub mod login;
pub mod logout;
pub mod post;
pub mod thread;

use actix_web::{error as actix_error, HttpResponse};
use sea_orm::DbErr;

/// Configures the web app by adding services from each web file.
///
/// @see https://docs.rs/actix-web/4.0.1/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Descending order. Order is important.
    // Route resolution will stop at the first match.
    index::configure(conf);
    account::configure(conf);
    chat::configure(conf);
    login::configure(conf);
    logout::configure(conf);
    post::configure(conf);
    thread::configure(conf);
    forum::configure(conf);

    conf.service(crate::create_user::view_register)
        .service(crate::create_user::post_register);
}

/// 302 to `location`.
pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .append_header(("Location", location))
        .finish()
}

/// Where pages that need an account send guests.
pub fn login_redirect() -> HttpResponse {
    redirect("/login")
}

/// Logs a store failure and hides it behind a 500.
pub fn db_error(context: &str, e: DbErr) -> actix_web::Error {
    log::error!("{}: {}", context, e);
    actix_error::ErrorInternalServerError("DB error")
}
