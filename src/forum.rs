//! Forum tree: sections, threads, posts, replies and their votes.
//!
//! Every write runs in its own transaction and settles forum scores through
//! `crate::score` before committing. Deletes cascade here rather than in the
//! database so that each removed post, reply and vote gives its points back.

use crate::orm::forum_sections::SectionCategory;
use crate::orm::forum_threads::ScopeKind;
use crate::orm::{forum_posts, forum_replies, forum_sections, forum_threads, post_votes};
use crate::orm::{reply_votes, users};
use crate::score::{self, Contribution, Lifecycle};
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use sea_orm::{entity::*, query::*, ConnectionTrait, DatabaseConnection, DbErr};

const SLUG_SUFFIX_LEN: usize = 6;

/// Lower-case ASCII words joined by hyphens.
pub fn slugify(text: &str) -> String {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// Slug with a random suffix, so equal titles still get distinct URLs.
pub fn unique_slug(text: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SLUG_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();

    let base = slugify(text);
    if base.is_empty() {
        suffix
    } else {
        format!("{}-{}", base, suffix)
    }
}

/// What a thread is about, if it belongs to one part of the university.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadScope {
    Department(i32),
    Module(i32),
    College(i32),
}

impl ThreadScope {
    fn into_columns(self) -> (ScopeKind, i32) {
        match self {
            ThreadScope::Department(id) => (ScopeKind::Department, id),
            ThreadScope::Module(id) => (ScopeKind::Module, id),
            ThreadScope::College(id) => (ScopeKind::College, id),
        }
    }

    pub fn from_columns(kind: Option<ScopeKind>, id: Option<i32>) -> Option<Self> {
        match (kind?, id?) {
            (ScopeKind::Department, id) => Some(ThreadScope::Department(id)),
            (ScopeKind::Module, id) => Some(ThreadScope::Module(id)),
            (ScopeKind::College, id) => Some(ThreadScope::College(id)),
        }
    }
}

pub struct NewSection<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub category: SectionCategory,
}

pub struct NewThread<'a> {
    pub section_id: i32,
    pub name: &'a str,
    pub description: &'a str,
    pub scope: Option<ThreadScope>,
}

pub struct NewPost<'a> {
    pub thread_id: i32,
    pub author_id: i32,
    pub title: &'a str,
    pub body: &'a str,
    pub is_anonymous: bool,
}

pub struct NewReply<'a> {
    pub post_id: i32,
    pub author_id: i32,
    pub body: &'a str,
    pub is_anonymous: bool,
}

/// Result of toggling a vote from the UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    /// No vote existed; one was cast.
    Cast,
    /// A vote in the same direction existed and was withdrawn.
    Removed,
    /// A vote in the other direction was replaced.
    Changed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub up: i64,
    pub down: i64,
}

impl VoteTally {
    pub fn net(&self) -> i64 {
        self.up - self.down
    }
}

//
// Sections and threads
//

pub async fn create_section(
    db: &DatabaseConnection,
    new: NewSection<'_>,
) -> Result<forum_sections::Model, DbErr> {
    forum_sections::ActiveModel {
        name: Set(new.name.to_owned()),
        description: Set(new.description.to_owned()),
        category: Set(new.category),
        url_slug: Set(unique_slug(new.name)),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_thread(
    db: &DatabaseConnection,
    new: NewThread<'_>,
) -> Result<forum_threads::Model, DbErr> {
    let (scope_kind, scope_id) = match new.scope.map(ThreadScope::into_columns) {
        Some((kind, id)) => (Some(kind), Some(id)),
        None => (None, None),
    };

    forum_threads::ActiveModel {
        name: Set(new.name.to_owned()),
        description: Set(new.description.to_owned()),
        section_id: Set(new.section_id),
        url_slug: Set(unique_slug(new.name)),
        scope_kind: Set(scope_kind),
        scope_id: Set(scope_id),
        ..Default::default()
    }
    .insert(db)
    .await
}

//
// Posts and replies
//

pub async fn create_post(
    db: &DatabaseConnection,
    new: NewPost<'_>,
) -> Result<forum_posts::Model, DbErr> {
    let txn = db.begin().await?;

    let post = forum_posts::ActiveModel {
        title: Set(new.title.to_owned()),
        body: Set(new.body.to_owned()),
        created_at: Set(Utc::now().naive_utc()),
        url_slug: Set(unique_slug(new.title)),
        thread_id: Set(new.thread_id),
        author_id: Set(new.author_id),
        is_anonymous: Set(new.is_anonymous),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    score::record(&txn, post.author_id, Contribution::Post, Lifecycle::Created).await?;

    txn.commit().await?;
    Ok(post)
}

pub async fn create_reply(
    db: &DatabaseConnection,
    new: NewReply<'_>,
) -> Result<forum_replies::Model, DbErr> {
    let txn = db.begin().await?;

    let reply = forum_replies::ActiveModel {
        body: Set(new.body.to_owned()),
        created_at: Set(Utc::now().naive_utc()),
        url_slug: Set(unique_slug(&format!("reply {}", new.post_id))),
        post_id: Set(new.post_id),
        author_id: Set(new.author_id),
        is_anonymous: Set(new.is_anonymous),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    score::record(&txn, reply.author_id, Contribution::Reply, Lifecycle::Created).await?;

    txn.commit().await?;
    Ok(reply)
}

//
// Votes
//

async fn post_or_not_found<C: ConnectionTrait>(
    db: &C,
    post_id: i32,
) -> Result<forum_posts::Model, DbErr> {
    forum_posts::Entity::find_by_id(post_id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("forum post {}", post_id)))
}

async fn reply_or_not_found<C: ConnectionTrait>(
    db: &C,
    reply_id: i32,
) -> Result<forum_replies::Model, DbErr> {
    forum_replies::Entity::find_by_id(reply_id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("forum reply {}", reply_id)))
}

async fn insert_post_vote<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    post: &forum_posts::Model,
    direction: bool,
) -> Result<post_votes::Model, DbErr> {
    let vote = post_votes::ActiveModel {
        user_id: Set(user_id),
        post_id: Set(post.id),
        direction: Set(direction),
        created_at: Set(Utc::now().naive_utc().date()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    score::record(
        db,
        post.author_id,
        Contribution::PostVote { direction },
        Lifecycle::Created,
    )
    .await?;
    Ok(vote)
}

async fn remove_post_vote<C: ConnectionTrait>(
    db: &C,
    vote: post_votes::Model,
    post_author_id: i32,
) -> Result<(), DbErr> {
    let direction = vote.direction;
    post_votes::Entity::delete_by_id(vote.id).exec(db).await?;
    score::record(
        db,
        post_author_id,
        Contribution::PostVote { direction },
        Lifecycle::Deleted,
    )
    .await
}

async fn insert_reply_vote<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    reply: &forum_replies::Model,
    direction: bool,
) -> Result<reply_votes::Model, DbErr> {
    let vote = reply_votes::ActiveModel {
        user_id: Set(user_id),
        reply_id: Set(reply.id),
        direction: Set(direction),
        created_at: Set(Utc::now().naive_utc().date()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    score::record(
        db,
        reply.author_id,
        Contribution::ReplyVote { direction },
        Lifecycle::Created,
    )
    .await?;
    Ok(vote)
}

async fn remove_reply_vote<C: ConnectionTrait>(
    db: &C,
    vote: reply_votes::Model,
    reply_author_id: i32,
) -> Result<(), DbErr> {
    let direction = vote.direction;
    reply_votes::Entity::delete_by_id(vote.id).exec(db).await?;
    score::record(
        db,
        reply_author_id,
        Contribution::ReplyVote { direction },
        Lifecycle::Deleted,
    )
    .await
}

async fn find_post_vote<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    post_id: i32,
) -> Result<Option<post_votes::Model>, DbErr> {
    post_votes::Entity::find()
        .filter(post_votes::Column::UserId.eq(user_id))
        .filter(post_votes::Column::PostId.eq(post_id))
        .one(db)
        .await
}

async fn find_reply_vote<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    reply_id: i32,
) -> Result<Option<reply_votes::Model>, DbErr> {
    reply_votes::Entity::find()
        .filter(reply_votes::Column::UserId.eq(user_id))
        .filter(reply_votes::Column::ReplyId.eq(reply_id))
        .one(db)
        .await
}

/// Casts a vote on a post. A second vote by the same user on the same post
/// violates the unique index and comes back as an error.
pub async fn create_post_vote(
    db: &DatabaseConnection,
    user_id: i32,
    post_id: i32,
    direction: bool,
) -> Result<post_votes::Model, DbErr> {
    let txn = db.begin().await?;
    let post = post_or_not_found(&txn, post_id).await?;
    let vote = insert_post_vote(&txn, user_id, &post, direction).await?;
    txn.commit().await?;
    Ok(vote)
}

pub async fn create_reply_vote(
    db: &DatabaseConnection,
    user_id: i32,
    reply_id: i32,
    direction: bool,
) -> Result<reply_votes::Model, DbErr> {
    let txn = db.begin().await?;
    let reply = reply_or_not_found(&txn, reply_id).await?;
    let vote = insert_reply_vote(&txn, user_id, &reply, direction).await?;
    txn.commit().await?;
    Ok(vote)
}

/// Withdraws a user's vote on a post. Returns false if there was none.
pub async fn delete_post_vote(
    db: &DatabaseConnection,
    user_id: i32,
    post_id: i32,
) -> Result<bool, DbErr> {
    let txn = db.begin().await?;
    let vote = match find_post_vote(&txn, user_id, post_id).await? {
        Some(vote) => vote,
        None => return Ok(false),
    };
    let post = post_or_not_found(&txn, post_id).await?;
    remove_post_vote(&txn, vote, post.author_id).await?;
    txn.commit().await?;
    Ok(true)
}

pub async fn delete_reply_vote(
    db: &DatabaseConnection,
    user_id: i32,
    reply_id: i32,
) -> Result<bool, DbErr> {
    let txn = db.begin().await?;
    let vote = match find_reply_vote(&txn, user_id, reply_id).await? {
        Some(vote) => vote,
        None => return Ok(false),
    };
    let reply = reply_or_not_found(&txn, reply_id).await?;
    remove_reply_vote(&txn, vote, reply.author_id).await?;
    txn.commit().await?;
    Ok(true)
}

/// Up/down button semantics: no vote casts, the same direction withdraws,
/// the other direction replaces.
pub async fn vote_on_post(
    db: &DatabaseConnection,
    user_id: i32,
    post_id: i32,
    direction: bool,
) -> Result<VoteOutcome, DbErr> {
    let txn = db.begin().await?;
    let post = post_or_not_found(&txn, post_id).await?;

    let outcome = match find_post_vote(&txn, user_id, post_id).await? {
        None => {
            insert_post_vote(&txn, user_id, &post, direction).await?;
            VoteOutcome::Cast
        }
        Some(vote) if vote.direction == direction => {
            remove_post_vote(&txn, vote, post.author_id).await?;
            VoteOutcome::Removed
        }
        Some(vote) => {
            remove_post_vote(&txn, vote, post.author_id).await?;
            insert_post_vote(&txn, user_id, &post, direction).await?;
            VoteOutcome::Changed
        }
    };

    txn.commit().await?;
    Ok(outcome)
}

pub async fn vote_on_reply(
    db: &DatabaseConnection,
    user_id: i32,
    reply_id: i32,
    direction: bool,
) -> Result<VoteOutcome, DbErr> {
    let txn = db.begin().await?;
    let reply = reply_or_not_found(&txn, reply_id).await?;

    let outcome = match find_reply_vote(&txn, user_id, reply_id).await? {
        None => {
            insert_reply_vote(&txn, user_id, &reply, direction).await?;
            VoteOutcome::Cast
        }
        Some(vote) if vote.direction == direction => {
            remove_reply_vote(&txn, vote, reply.author_id).await?;
            VoteOutcome::Removed
        }
        Some(vote) => {
            remove_reply_vote(&txn, vote, reply.author_id).await?;
            insert_reply_vote(&txn, user_id, &reply, direction).await?;
            VoteOutcome::Changed
        }
    };

    txn.commit().await?;
    Ok(outcome)
}

//
// Cascading deletes
//

async fn delete_reply_tree<C: ConnectionTrait>(
    db: &C,
    reply: forum_replies::Model,
) -> Result<(), DbErr> {
    let votes = reply_votes::Entity::find()
        .filter(reply_votes::Column::ReplyId.eq(reply.id))
        .all(db)
        .await?;
    for vote in votes {
        remove_reply_vote(db, vote, reply.author_id).await?;
    }

    let author_id = reply.author_id;
    forum_replies::Entity::delete_by_id(reply.id).exec(db).await?;
    score::record(db, author_id, Contribution::Reply, Lifecycle::Deleted).await
}

async fn delete_post_tree<C: ConnectionTrait>(
    db: &C,
    post: forum_posts::Model,
) -> Result<(), DbErr> {
    let replies = forum_replies::Entity::find()
        .filter(forum_replies::Column::PostId.eq(post.id))
        .all(db)
        .await?;
    for reply in replies {
        delete_reply_tree(db, reply).await?;
    }

    let votes = post_votes::Entity::find()
        .filter(post_votes::Column::PostId.eq(post.id))
        .all(db)
        .await?;
    for vote in votes {
        remove_post_vote(db, vote, post.author_id).await?;
    }

    let author_id = post.author_id;
    forum_posts::Entity::delete_by_id(post.id).exec(db).await?;
    score::record(db, author_id, Contribution::Post, Lifecycle::Deleted).await
}

async fn delete_thread_tree<C: ConnectionTrait>(
    db: &C,
    thread: forum_threads::Model,
) -> Result<(), DbErr> {
    let posts = forum_posts::Entity::find()
        .filter(forum_posts::Column::ThreadId.eq(thread.id))
        .all(db)
        .await?;
    for post in posts {
        delete_post_tree(db, post).await?;
    }
    forum_threads::Entity::delete_by_id(thread.id).exec(db).await?;
    Ok(())
}

/// Deletes a reply with its votes. Returns false if it did not exist.
pub async fn delete_reply(db: &DatabaseConnection, reply_id: i32) -> Result<bool, DbErr> {
    let txn = db.begin().await?;
    let reply = match forum_replies::Entity::find_by_id(reply_id).one(&txn).await? {
        Some(reply) => reply,
        None => return Ok(false),
    };
    delete_reply_tree(&txn, reply).await?;
    txn.commit().await?;
    Ok(true)
}

/// Deletes a post with its replies and all their votes.
pub async fn delete_post(db: &DatabaseConnection, post_id: i32) -> Result<bool, DbErr> {
    let txn = db.begin().await?;
    let post = match forum_posts::Entity::find_by_id(post_id).one(&txn).await? {
        Some(post) => post,
        None => return Ok(false),
    };
    delete_post_tree(&txn, post).await?;
    txn.commit().await?;
    Ok(true)
}

pub async fn delete_thread(db: &DatabaseConnection, thread_id: i32) -> Result<bool, DbErr> {
    let txn = db.begin().await?;
    let thread = match forum_threads::Entity::find_by_id(thread_id).one(&txn).await? {
        Some(thread) => thread,
        None => return Ok(false),
    };
    delete_thread_tree(&txn, thread).await?;
    txn.commit().await?;
    Ok(true)
}

pub async fn delete_section(db: &DatabaseConnection, section_id: i32) -> Result<bool, DbErr> {
    let txn = db.begin().await?;
    let section = match forum_sections::Entity::find_by_id(section_id)
        .one(&txn)
        .await?
    {
        Some(section) => section,
        None => return Ok(false),
    };

    let threads = forum_threads::Entity::find()
        .filter(forum_threads::Column::SectionId.eq(section.id))
        .all(&txn)
        .await?;
    for thread in threads {
        delete_thread_tree(&txn, thread).await?;
    }
    forum_sections::Entity::delete_by_id(section.id)
        .exec(&txn)
        .await?;

    txn.commit().await?;
    Ok(true)
}

//
// Lookups
//

pub async fn find_section<C: ConnectionTrait>(
    db: &C,
    category: SectionCategory,
    slug: &str,
) -> Result<Option<forum_sections::Model>, DbErr> {
    forum_sections::Entity::find()
        .filter(forum_sections::Column::Category.eq(category))
        .filter(forum_sections::Column::UrlSlug.eq(slug))
        .one(db)
        .await
}

pub async fn find_thread<C: ConnectionTrait>(
    db: &C,
    section_id: i32,
    slug: &str,
) -> Result<Option<forum_threads::Model>, DbErr> {
    forum_threads::Entity::find()
        .filter(forum_threads::Column::SectionId.eq(section_id))
        .filter(forum_threads::Column::UrlSlug.eq(slug))
        .one(db)
        .await
}

pub async fn find_post<C: ConnectionTrait>(
    db: &C,
    thread_id: i32,
    slug: &str,
) -> Result<Option<forum_posts::Model>, DbErr> {
    forum_posts::Entity::find()
        .filter(forum_posts::Column::ThreadId.eq(thread_id))
        .filter(forum_posts::Column::UrlSlug.eq(slug))
        .one(db)
        .await
}

pub async fn find_reply<C: ConnectionTrait>(
    db: &C,
    post_id: i32,
    slug: &str,
) -> Result<Option<forum_replies::Model>, DbErr> {
    forum_replies::Entity::find()
        .filter(forum_replies::Column::PostId.eq(post_id))
        .filter(forum_replies::Column::UrlSlug.eq(slug))
        .one(db)
        .await
}

/// Every category with its sections, categories in display order.
pub async fn sections_by_category<C: ConnectionTrait>(
    db: &C,
) -> Result<Vec<(SectionCategory, Vec<forum_sections::Model>)>, DbErr> {
    let sections = forum_sections::Entity::find()
        .order_by_asc(forum_sections::Column::Name)
        .all(db)
        .await?;

    Ok(SectionCategory::all()
        .into_iter()
        .map(|category| {
            let members = sections
                .iter()
                .filter(|s| s.category == category)
                .cloned()
                .collect();
            (category, members)
        })
        .collect())
}

pub async fn list_threads<C: ConnectionTrait>(
    db: &C,
    section_id: i32,
) -> Result<Vec<forum_threads::Model>, DbErr> {
    forum_threads::Entity::find()
        .filter(forum_threads::Column::SectionId.eq(section_id))
        .order_by_asc(forum_threads::Column::Name)
        .all(db)
        .await
}

/// Posts of a thread with their authors, newest first.
pub async fn list_posts<C: ConnectionTrait>(
    db: &C,
    thread_id: i32,
) -> Result<Vec<(forum_posts::Model, Option<users::Model>)>, DbErr> {
    forum_posts::Entity::find()
        .filter(forum_posts::Column::ThreadId.eq(thread_id))
        .find_also_related(users::Entity)
        .order_by_desc(forum_posts::Column::CreatedAt)
        .order_by_desc(forum_posts::Column::Id)
        .all(db)
        .await
}

/// Replies of a post with their authors, oldest first.
pub async fn list_replies<C: ConnectionTrait>(
    db: &C,
    post_id: i32,
) -> Result<Vec<(forum_replies::Model, Option<users::Model>)>, DbErr> {
    forum_replies::Entity::find()
        .filter(forum_replies::Column::PostId.eq(post_id))
        .find_also_related(users::Entity)
        .order_by_asc(forum_replies::Column::CreatedAt)
        .order_by_asc(forum_replies::Column::Id)
        .all(db)
        .await
}

pub async fn count_replies<C: ConnectionTrait>(db: &C, post_id: i32) -> Result<i64, DbErr> {
    let count = forum_replies::Entity::find()
        .filter(forum_replies::Column::PostId.eq(post_id))
        .count(db)
        .await?;
    Ok(count as i64)
}

pub async fn post_tally<C: ConnectionTrait>(db: &C, post_id: i32) -> Result<VoteTally, DbErr> {
    let votes = post_votes::Entity::find()
        .filter(post_votes::Column::PostId.eq(post_id))
        .all(db)
        .await?;
    Ok(tally(votes.iter().map(|v| v.direction)))
}

pub async fn reply_tally<C: ConnectionTrait>(db: &C, reply_id: i32) -> Result<VoteTally, DbErr> {
    let votes = reply_votes::Entity::find()
        .filter(reply_votes::Column::ReplyId.eq(reply_id))
        .all(db)
        .await?;
    Ok(tally(votes.iter().map(|v| v.direction)))
}

/// The direction of the user's vote on a post, if any.
pub async fn user_post_vote<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    post_id: i32,
) -> Result<Option<bool>, DbErr> {
    Ok(find_post_vote(db, user_id, post_id)
        .await?
        .map(|v| v.direction))
}

pub async fn user_reply_vote<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    reply_id: i32,
) -> Result<Option<bool>, DbErr> {
    Ok(find_reply_vote(db, user_id, reply_id)
        .await?
        .map(|v| v.direction))
}

fn tally(directions: impl Iterator<Item = bool>) -> VoteTally {
    directions.fold(VoteTally::default(), |mut acc, up| {
        if up {
            acc.up += 1;
        } else {
            acc.down += 1;
        }
        acc
    })
}
