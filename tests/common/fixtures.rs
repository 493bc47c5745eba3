//! Test fixtures for creating test data
#![allow(dead_code)]

use chrono::{NaiveDate, Utc};
use lounge::forum::{self, NewPost, NewReply, NewSection, NewThread};
use lounge::orm::forum_sections::SectionCategory;
use lounge::orm::profiles::LeaderboardPrivacy;
use lounge::orm::{
    colleges, courses, departments, forum_posts, forum_replies, forum_sections, forum_threads,
    modules, profiles, users,
};
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};

/// Test user fixture
pub struct TestUser {
    pub id: i32,
    pub email: String,
    pub password: String, // Plain text password for testing
}

/// Create a user with a profile and known credentials.
pub async fn create_test_user(
    db: &DatabaseConnection,
    first_name: &str,
    last_name: &str,
) -> Result<TestUser, DbErr> {
    let password = "password123".to_string();
    let password_hash = lounge::session::hash_password(&password)
        .map_err(|e| DbErr::Custom(format!("Password hashing failed: {}", e)))?;
    let email = format!(
        "{}.{}@exeter.ac.uk",
        first_name.to_lowercase(),
        last_name.to_lowercase()
    );

    let user = users::ActiveModel {
        email: Set(email.clone()),
        password: Set(password_hash),
        first_name: Set(first_name.to_string()),
        last_name: Set(last_name.to_string()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    lounge::user::new_profile(user.id).insert(db).await?;

    Ok(TestUser {
        id: user.id,
        email,
        password,
    })
}

/// Create a user row without any profile.
pub async fn create_user_without_profile(
    db: &DatabaseConnection,
    email: &str,
) -> Result<users::Model, DbErr> {
    users::ActiveModel {
        email: Set(email.to_string()),
        password: Set(String::new()),
        first_name: Set("No".to_string()),
        last_name: Set("Profile".to_string()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn set_privacy(
    db: &DatabaseConnection,
    user_id: i32,
    privacy: LeaderboardPrivacy,
) -> Result<profiles::Model, DbErr> {
    let profile = lounge::user::ensure_profile(db, user_id).await?;
    let mut active: profiles::ActiveModel = profile.into();
    active.leaderboard_privacy = Set(privacy);
    active.update(db).await
}

pub async fn set_score(
    db: &DatabaseConnection,
    user_id: i32,
    score: i32,
) -> Result<profiles::Model, DbErr> {
    let profile = lounge::user::ensure_profile(db, user_id).await?;
    let mut active: profiles::ActiveModel = profile.into();
    active.forum_score = Set(score);
    active.update(db).await
}

/// One college, department and course with modules worth 60, 45, 15 and 15
/// credits (codes ECM1400, ECM1410, ECM1413, ECM1415).
pub struct TestCatalogue {
    pub course: courses::Model,
    pub modules: Vec<modules::Model>,
}

pub async fn create_test_catalogue(db: &DatabaseConnection) -> Result<TestCatalogue, DbErr> {
    let college = colleges::ActiveModel {
        name: Set("Engineering, Mathematics and Physical Sciences".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let department = departments::ActiveModel {
        name: Set("Computer Science".to_string()),
        college_id: Set(college.id),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let course = courses::ActiveModel {
        title: Set("BSc Computer Science".to_string()),
        level: Set("UG".to_string()),
        campus: Set("Streatham".to_string()),
        department_id: Set(department.id),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let mut created = Vec::new();
    for (code, title, credits) in [
        ("ECM1400", "Programming", 60),
        ("ECM1410", "Object-Oriented Programming", 45),
        ("ECM1413", "Computers and the Internet", 15),
        ("ECM1415", "Discrete Mathematics", 15),
    ] {
        let module = modules::ActiveModel {
            code: Set(code.to_string()),
            title: Set(title.to_string()),
            year: Set(1),
            credits: Set(credits),
            convenor: Set("Dr Test".to_string()),
            descriptor_url: Set(String::new()),
            fch_available: Set(false),
            department_id: Set(department.id),
            ..Default::default()
        }
        .insert(db)
        .await?;
        created.push(module);
    }

    Ok(TestCatalogue {
        course,
        modules: created,
    })
}

pub async fn create_test_section(db: &DatabaseConnection) -> Result<forum_sections::Model, DbErr> {
    forum::create_section(
        db,
        NewSection {
            name: "Study Help",
            description: "Ask about coursework",
            category: SectionCategory::Academic,
        },
    )
    .await
}

pub async fn create_test_thread(
    db: &DatabaseConnection,
    section_id: i32,
) -> Result<forum_threads::Model, DbErr> {
    forum::create_thread(
        db,
        NewThread {
            section_id,
            name: "Exams",
            description: "Revision and exam questions",
            scope: None,
        },
    )
    .await
}

pub async fn create_test_post(
    db: &DatabaseConnection,
    thread_id: i32,
    author_id: i32,
) -> Result<forum_posts::Model, DbErr> {
    forum::create_post(
        db,
        NewPost {
            thread_id,
            author_id,
            title: "Past papers",
            body: "Where can I find them?",
            is_anonymous: false,
        },
    )
    .await
}

pub async fn create_test_reply(
    db: &DatabaseConnection,
    post_id: i32,
    author_id: i32,
) -> Result<forum_replies::Model, DbErr> {
    forum::create_reply(
        db,
        NewReply {
            post_id,
            author_id,
            body: "On the library site.",
            is_anonymous: false,
        },
    )
    .await
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}
