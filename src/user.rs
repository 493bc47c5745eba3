use crate::orm::profiles::{self, LeaderboardPrivacy};
use crate::orm::users;
use crate::{academic, session};
use chrono::Utc;
use sea_orm::{entity::*, query::*, ConnectionTrait, DatabaseConnection, DbErr};

/// Picture path every new profile starts with.
pub static DEFAULT_PROFILE_PIC: &str = "profile_pictures/default.png";

/// Base URL the profile picture paths are served from.
pub static MEDIA_URL: &str = "/media/";

/// "First Last", tolerating either part being empty.
pub fn full_name(first_name: &str, last_name: &str) -> String {
    format!("{} {}", first_name.trim(), last_name.trim())
        .trim()
        .to_owned()
}

/// "Jane Mary Smith" -> "J. M. S."
pub fn initials(full_name: &str) -> String {
    full_name
        .split_whitespace()
        .filter_map(|part| part.chars().next())
        .map(|c| format!("{}.", c.to_uppercase()))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn media_url(path: &str) -> String {
    format!("{}{}", MEDIA_URL, path)
}

/// The logged-in user as seen by request handlers.
#[derive(Clone, Debug)]
pub struct ClientUser {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_pic: String,
}

impl ClientUser {
    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.last_name)
    }

    /// Loads the user and their profile picture.
    pub async fn get_by_id<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<Self>, DbErr> {
        let found = users::Entity::find_by_id(id)
            .find_also_related(profiles::Entity)
            .one(db)
            .await?;

        Ok(found.map(|(user, profile)| Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            profile_pic: profile
                .map(|p| p.profile_pic)
                .unwrap_or_else(|| DEFAULT_PROFILE_PIC.to_owned()),
        }))
    }

    pub fn profile_pic_url(&self) -> String {
        media_url(&self.profile_pic)
    }
}

pub async fn find_by_email<C: ConnectionTrait>(
    db: &C,
    email: &str,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find()
        .filter(users::Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await
}

pub async fn email_exists<C: ConnectionTrait>(db: &C, email: &str) -> Result<bool, DbErr> {
    Ok(find_by_email(db, email).await?.is_some())
}

pub async fn get_profile<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<Option<profiles::Model>, DbErr> {
    profiles::Entity::find()
        .filter(profiles::Column::UserId.eq(user_id))
        .one(db)
        .await
}

/// A blank profile for a new user. Dates default to today.
pub fn new_profile(user_id: i32) -> profiles::ActiveModel {
    let now = Utc::now().naive_utc();
    profiles::ActiveModel {
        user_id: Set(user_id),
        date_of_birth: Set(now.date()),
        admission_date: Set(now.date()),
        course_id: Set(None),
        bio: Set(String::new()),
        profile_pic: Set(DEFAULT_PROFILE_PIC.to_owned()),
        leaderboard_privacy: Set(profiles::LeaderboardPrivacy::default()),
        forum_score: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
}

/// Returns the user's profile, creating a blank one if it is missing, and
/// stamps `updated_at`. Called whenever a user row is saved.
pub async fn ensure_profile<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<profiles::Model, DbErr> {
    match get_profile(db, user_id).await? {
        Some(profile) => {
            let mut active: profiles::ActiveModel = profile.into();
            active.updated_at = Set(Utc::now().naive_utc());
            active.update(db).await
        }
        None => {
            log::debug!("Creating missing profile for user_id={}", user_id);
            new_profile(user_id).insert(db).await
        }
    }
}

/// Saves a changed user row and keeps its profile in step.
pub async fn save_user<C: ConnectionTrait>(
    db: &C,
    user: users::ActiveModel,
) -> Result<users::Model, DbErr> {
    let user = user.update(db).await?;
    ensure_profile(db, user.id).await?;
    Ok(user)
}

/// Everything the settings page can change.
#[derive(Clone, Debug)]
pub struct ProfileSettings {
    pub course_id: i32,
    pub module_ids: Vec<i32>,
    pub leaderboard_privacy: LeaderboardPrivacy,
    pub bio: String,
    /// Puts the default picture back.
    pub clear_profile_pic: bool,
}

pub async fn update_settings(
    db: &DatabaseConnection,
    user_id: i32,
    settings: &ProfileSettings,
) -> Result<profiles::Model, DbErr> {
    let txn = db.begin().await?;

    let profile = ensure_profile(&txn, user_id).await?;
    let mut active: profiles::ActiveModel = profile.into();
    active.course_id = Set(Some(settings.course_id));
    active.leaderboard_privacy = Set(settings.leaderboard_privacy);
    active.bio = Set(settings.bio.trim().to_owned());
    if settings.clear_profile_pic {
        active.profile_pic = Set(DEFAULT_PROFILE_PIC.to_owned());
    }
    active.updated_at = Set(Utc::now().naive_utc());
    let profile = active.update(&txn).await?;

    academic::set_profile_modules(&txn, profile.id, &settings.module_ids).await?;

    txn.commit().await?;
    Ok(profile)
}

/// Replaces the user's password hash.
pub async fn set_password<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    new_password: &str,
) -> Result<(), DbErr> {
    let hash = session::hash_password(new_password).map_err(|e| {
        log::error!("Failed to hash password: {}", e);
        DbErr::Custom("password hashing failed".to_owned())
    })?;

    let user = users::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("user {}", user_id)))?;

    let mut active: users::ActiveModel = user.into();
    active.password = Set(hash);
    save_user(db, active).await?;
    Ok(())
}
