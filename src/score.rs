//! Forum score bookkeeping.
//!
//! Creating or deleting a post, reply or vote moves the score of the author
//! of the content involved. Votes credit the author of the voted item, never
//! the voter. Scores never drop below zero; a decrement that would go
//! negative lands on zero instead.
//!
//! These functions are called by `crate::forum` inside the transaction that
//! writes the row, so a rolled back insert never leaves a score behind.

use crate::orm::profiles;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr};

pub const POST_WEIGHT: i32 = 5;
pub const REPLY_WEIGHT: i32 = 3;
pub const UPVOTE_WEIGHT: i32 = 1;
/// Down votes do not move the score.
pub const DOWNVOTE_WEIGHT: i32 = 0;

/// Something that earns its author points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Contribution {
    Post,
    Reply,
    PostVote { direction: bool },
    ReplyVote { direction: bool },
}

impl Contribution {
    pub fn weight(&self) -> i32 {
        match self {
            Contribution::Post => POST_WEIGHT,
            Contribution::Reply => REPLY_WEIGHT,
            Contribution::PostVote { direction } | Contribution::ReplyVote { direction } => {
                if *direction {
                    UPVOTE_WEIGHT
                } else {
                    DOWNVOTE_WEIGHT
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Deleted,
}

impl Lifecycle {
    fn sign(&self) -> i32 {
        match self {
            Lifecycle::Created => 1,
            Lifecycle::Deleted => -1,
        }
    }
}

/// Signed score change for a contribution event.
pub fn delta(contribution: Contribution, lifecycle: Lifecycle) -> i32 {
    contribution.weight() * lifecycle.sign()
}

/// Applies a change, flooring at zero.
pub fn clamp_score(current: i32, delta: i32) -> i32 {
    current.saturating_add(delta).max(0)
}

/// Credits (or debits) `beneficiary_id` for a contribution event.
///
/// A missing profile is not an error: the change is skipped and logged.
pub async fn record<C: ConnectionTrait>(
    db: &C,
    beneficiary_id: i32,
    contribution: Contribution,
    lifecycle: Lifecycle,
) -> Result<(), DbErr> {
    adjust(db, beneficiary_id, delta(contribution, lifecycle)).await
}

/// Floors `forum_score + delta` at zero inside the store, in the same shape
/// as [`clamp_score`]. `CASE` rather than `MAX`/`GREATEST` so it reads the
/// same on Postgres and SQLite.
fn clamped_score_expr(delta: i32) -> sea_orm::sea_query::SimpleExpr {
    Expr::cust_with_values(
        "CASE WHEN forum_score + ? < 0 THEN 0 ELSE forum_score + ? END",
        vec![delta, delta],
    )
}

/// Moves a user's score by `delta`, clamped at zero.
///
/// One `UPDATE` does the arithmetic, so concurrent changes to the same
/// profile cannot overwrite each other.
pub async fn adjust<C: ConnectionTrait>(db: &C, user_id: i32, delta: i32) -> Result<(), DbErr> {
    if delta == 0 {
        return Ok(());
    }

    let res = profiles::Entity::update_many()
        .col_expr(profiles::Column::ForumScore, clamped_score_expr(delta))
        .col_expr(
            profiles::Column::UpdatedAt,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(profiles::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    if res.rows_affected == 0 {
        log::debug!(
            "No profile for user_id={}; skipping score change of {}",
            user_id,
            delta
        );
    } else {
        log::debug!("Forum score user_id={} moved by {:+}", user_id, delta);
    }

    Ok(())
}
