//! Deleting part of the forum tree removes everything below it and takes
//! back the points it earned

mod common;

use common::database::{forum_score, setup_test_database};
use common::fixtures::*;
use lounge::forum;
use lounge::orm::{forum_posts, forum_replies, forum_threads, post_votes, reply_votes};
use sea_orm::{EntityTrait, PaginatorTrait};

#[actix_rt::test]
async fn test_delete_post_cascades_to_replies_and_votes() {
    let db = setup_test_database().await.unwrap();
    let alice = create_test_user(&db, "Alice", "Smith").await.unwrap();
    let bob = create_test_user(&db, "Bob", "Jones").await.unwrap();
    let section = create_test_section(&db).await.unwrap();
    let thread = create_test_thread(&db, section.id).await.unwrap();
    let post = create_test_post(&db, thread.id, alice.id).await.unwrap();
    let reply = create_test_reply(&db, post.id, bob.id).await.unwrap();
    forum::create_post_vote(&db, bob.id, post.id, true).await.unwrap();
    forum::create_reply_vote(&db, alice.id, reply.id, true).await.unwrap();

    assert_eq!(forum_score(&db, alice.id).await, Some(6));
    assert_eq!(forum_score(&db, bob.id).await, Some(4));

    assert!(forum::delete_post(&db, post.id).await.unwrap());

    assert_eq!(forum_posts::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(forum_replies::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(post_votes::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(reply_votes::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(forum_score(&db, alice.id).await, Some(0));
    assert_eq!(forum_score(&db, bob.id).await, Some(0));
}

#[actix_rt::test]
async fn test_delete_reply_keeps_post() {
    let db = setup_test_database().await.unwrap();
    let alice = create_test_user(&db, "Alice", "Smith").await.unwrap();
    let bob = create_test_user(&db, "Bob", "Jones").await.unwrap();
    let section = create_test_section(&db).await.unwrap();
    let thread = create_test_thread(&db, section.id).await.unwrap();
    let post = create_test_post(&db, thread.id, alice.id).await.unwrap();
    let reply = create_test_reply(&db, post.id, bob.id).await.unwrap();

    assert!(forum::delete_reply(&db, reply.id).await.unwrap());
    assert_eq!(forum::count_replies(&db, post.id).await.unwrap(), 0);
    assert_eq!(forum_posts::Entity::find().count(&db).await.unwrap(), 1);
    assert_eq!(forum_score(&db, bob.id).await, Some(0));
    assert_eq!(forum_score(&db, alice.id).await, Some(5));
}

#[actix_rt::test]
async fn test_delete_section_removes_whole_tree() {
    let db = setup_test_database().await.unwrap();
    let alice = create_test_user(&db, "Alice", "Smith").await.unwrap();
    let section = create_test_section(&db).await.unwrap();
    let first = create_test_thread(&db, section.id).await.unwrap();
    let second = create_test_thread(&db, section.id).await.unwrap();
    assert_ne!(first.url_slug, second.url_slug);

    let post = create_test_post(&db, first.id, alice.id).await.unwrap();
    create_test_post(&db, second.id, alice.id).await.unwrap();
    create_test_reply(&db, post.id, alice.id).await.unwrap();
    assert_eq!(forum_score(&db, alice.id).await, Some(13));

    assert!(forum::delete_section(&db, section.id).await.unwrap());
    assert_eq!(forum_threads::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(forum_posts::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(forum_replies::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(forum_score(&db, alice.id).await, Some(0));
}

#[actix_rt::test]
async fn test_lookups_follow_url_slugs() {
    let db = setup_test_database().await.unwrap();
    let alice = create_test_user(&db, "Alice", "Smith").await.unwrap();
    let section = create_test_section(&db).await.unwrap();
    let thread = create_test_thread(&db, section.id).await.unwrap();
    let post = create_test_post(&db, thread.id, alice.id).await.unwrap();

    let found = forum::find_section(&db, section.category, &section.url_slug)
        .await
        .unwrap();
    assert_eq!(found.map(|s| s.id), Some(section.id));
    let found = forum::find_thread(&db, section.id, &thread.url_slug)
        .await
        .unwrap();
    assert_eq!(found.map(|t| t.id), Some(thread.id));
    let found = forum::find_post(&db, thread.id, &post.url_slug).await.unwrap();
    assert_eq!(found.map(|p| p.id), Some(post.id));
    assert!(forum::find_post(&db, thread.id, "nope").await.unwrap().is_none());

    let grouped = forum::sections_by_category(&db).await.unwrap();
    let academic = grouped
        .iter()
        .find(|(category, _)| *category == section.category)
        .unwrap();
    assert_eq!(academic.1.len(), 1);
}
