use super::{db_error, redirect};
use crate::app_config;
use crate::db::get_db_pool;
use crate::form::FormErrors;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::session;
use crate::user;
use actix_web::{get, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::{ConnectionTrait, DbErr};
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(post_login).service(view_login);
}

pub const BAD_LOGIN: &str = "Invalid email address/password!";

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub client: ClientCtx,
    pub email: String,
    pub errors: FormErrors,
}

#[derive(Deserialize)]
pub struct FormData {
    email: String,
    password: String,
    csrf_token: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum LoginResult {
    Success(i32),
    WrongDomain,
    BadCredentials,
}

/// Checks an email and password pair.
pub async fn login<C: ConnectionTrait>(
    db: &C,
    email: &str,
    password: &str,
    email_domain: &str,
) -> Result<LoginResult, DbErr> {
    if crate::create_user::validate_email_domain(email, email_domain).is_err() {
        return Ok(LoginResult::WrongDomain);
    }

    let user = match user::find_by_email(db, email).await? {
        Some(user) => user,
        None => return Ok(LoginResult::BadCredentials),
    };

    if session::verify_password(password, &user.password) {
        Ok(LoginResult::Success(user.id))
    } else {
        Ok(LoginResult::BadCredentials)
    }
}

#[post("/login")]
pub async fn post_login(
    client: ClientCtx,
    cookies: actix_session::Session,
    form: web::Form<FormData>,
) -> Result<impl Responder, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let db = get_db_pool();
    let domain = app_config::registration().email_domain;
    let result = login(db, form.email.trim(), &form.password, &domain)
        .await
        .map_err(|e| db_error("post_login", e))?;

    let mut errors = FormErrors::new();
    match result {
        LoginResult::Success(user_id) => {
            session::login(db, &cookies, user_id).await?;
            return Ok(redirect("/"));
        }
        LoginResult::WrongDomain => {
            errors.add("email", format!("Email address must contain {}.", domain));
        }
        LoginResult::BadCredentials => {
            log::debug!("login failure for {}", form.email);
            errors.add("email", BAD_LOGIN);
            errors.add("password", BAD_LOGIN);
        }
    }

    Ok(LoginTemplate {
        client,
        email: form.email.trim().to_owned(),
        errors,
    }
    .to_response())
}

#[get("/login")]
pub async fn view_login(client: ClientCtx) -> HttpResponse {
    if client.is_user() {
        return redirect("/");
    }

    LoginTemplate {
        client,
        email: String::new(),
        errors: FormErrors::new(),
    }
    .to_response()
}
