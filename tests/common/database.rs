//! Test database setup
#![allow(dead_code)]

use sea_orm::{DatabaseConnection, DbErr};

/// A fresh in-memory database with the full schema. Every call gets its own
/// database, so tests do not need to run serially or clean up.
pub async fn setup_test_database() -> Result<DatabaseConnection, DbErr> {
    let db = lounge::db::connect("sqlite::memory:").await?;
    lounge::db::create_schema(&db).await?;
    Ok(db)
}

/// Current forum score of a user, or None without a profile.
pub async fn forum_score(db: &DatabaseConnection, user_id: i32) -> Option<i32> {
    lounge::user::get_profile(db, user_id)
        .await
        .expect("Failed to load profile")
        .map(|p| p.forum_score)
}
