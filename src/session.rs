//! Login sessions and password hashing.
//!
//! A session is a random token stored in the `sessions` table and mirrored in
//! the signed cookie session under the `token` key.

use crate::orm::sessions;
use actix_session::Session;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString};
use argon2::{Argon2, PasswordVerifier};
use chrono::Utc;
use once_cell::sync::Lazy;
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr};
use uuid::Uuid;

static ARGON2: Lazy<Argon2<'static>> = Lazy::new(Argon2::default);

pub const SESSION_TOKEN_KEY: &str = "token";
pub const SESSION_LOGGED_IN_KEY: &str = "logged_in";

pub fn get_argon2() -> &'static Argon2<'static> {
    &ARGON2
}

/// Hashes a password into a PHC string.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    Ok(get_argon2()
        .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))?
        .to_string())
}

/// Checks a password against a stored PHC string. Malformed hashes never verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => get_argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::error!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// Creates a session row for the user and returns its token.
pub async fn new_session<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Uuid, DbErr> {
    let token = Uuid::new_v4();
    sessions::ActiveModel {
        token: Set(token.to_string()),
        user_id: Set(user_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(token)
}

pub async fn find_session<C: ConnectionTrait>(
    db: &C,
    token: Uuid,
) -> Result<Option<sessions::Model>, DbErr> {
    sessions::Entity::find()
        .filter(sessions::Column::Token.eq(token.to_string()))
        .one(db)
        .await
}

pub async fn remove_session<C: ConnectionTrait>(db: &C, token: Uuid) -> Result<(), DbErr> {
    sessions::Entity::delete_many()
        .filter(sessions::Column::Token.eq(token.to_string()))
        .exec(db)
        .await?;
    Ok(())
}

/// Removes every session of the user except `keep`. Used after a password change.
pub async fn remove_other_sessions<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    keep: Uuid,
) -> Result<u64, DbErr> {
    let res = sessions::Entity::delete_many()
        .filter(sessions::Column::UserId.eq(user_id))
        .filter(sessions::Column::Token.ne(keep.to_string()))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

/// Reads the session token from the cookie jar.
pub fn get_token(cookies: &Session) -> Option<Uuid> {
    match cookies.get::<String>(SESSION_TOKEN_KEY) {
        Ok(Some(token)) => Uuid::parse_str(&token).ok(),
        Ok(None) => None,
        Err(e) => {
            log::error!("get_token: cookies.get() {}", e);
            None
        }
    }
}

/// Resolves the cookie session to a stored session row.
pub async fn authenticate_by_cookie<C: ConnectionTrait>(
    db: &C,
    cookies: &Session,
) -> Option<(Uuid, sessions::Model)> {
    let token = get_token(cookies)?;
    match find_session(db, token).await {
        Ok(Some(session)) => Some((token, session)),
        Ok(None) => None,
        Err(e) => {
            log::error!("authenticate_by_cookie: {}", e);
            None
        }
    }
}

/// Starts a session and writes it to the cookie jar.
pub async fn login<C: ConnectionTrait>(
    db: &C,
    cookies: &Session,
    user_id: i32,
) -> Result<Uuid, actix_web::Error> {
    use actix_web::error;

    let token = new_session(db, user_id).await.map_err(|e| {
        log::error!("new_session: {}", e);
        error::ErrorInternalServerError("DB error")
    })?;

    cookies
        .insert(SESSION_LOGGED_IN_KEY, true)
        .map_err(|_| error::ErrorInternalServerError("middleware error"))?;
    cookies
        .insert(SESSION_TOKEN_KEY, token.to_string())
        .map_err(|_| error::ErrorInternalServerError("middleware error"))?;

    Ok(token)
}
