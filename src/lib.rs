pub mod academic;
pub mod app_config;
pub mod create_user;
pub mod db;
pub mod form;
pub mod forum;
pub mod leaderboard;
pub mod middleware;
pub mod orm;
pub mod sanitize;
pub mod score;
pub mod session;
pub mod user;
pub mod web;
pub mod word_filter;
