//! SeaORM entities.

pub mod colleges;
pub mod courses;
pub mod departments;
pub mod forum_posts;
pub mod forum_replies;
pub mod forum_sections;
pub mod forum_threads;
pub mod modules;
pub mod post_votes;
pub mod profile_modules;
pub mod profiles;
pub mod reply_votes;
pub mod sessions;
pub mod users;
