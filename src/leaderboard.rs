//! Forum score leaderboard shown on the home page.
//!
//! Each profile decides how it appears to others. Hidden profiles are left
//! out, except that viewers always see themselves.

use crate::app_config::LeaderboardConfig;
use crate::orm::profiles::{self, LeaderboardPrivacy};
use crate::orm::users;
use crate::user::{self, initials};
use sea_orm::{entity::*, query::*, ActiveEnum, Condition, ConnectionTrait, DbErr};

/// A profile eligible for the board, before display rules apply.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub user_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub profile_pic: String,
    pub privacy: LeaderboardPrivacy,
    pub score: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub place: usize,
    pub name: String,
    /// Picture path relative to the media root.
    pub photo: String,
    pub score: i32,
    pub is_viewer: bool,
}

impl LeaderboardEntry {
    pub fn photo_url(&self) -> String {
        user::media_url(&self.photo)
    }
}

/// Name and picture a candidate is shown with.
fn identity(candidate: &Candidate, config: &LeaderboardConfig) -> (String, String) {
    let full_name = user::full_name(&candidate.first_name, &candidate.last_name);
    match candidate.privacy {
        LeaderboardPrivacy::FullName => (full_name, candidate.profile_pic.clone()),
        LeaderboardPrivacy::FirstName => (
            candidate.first_name.trim().to_owned(),
            config.default_picture.clone(),
        ),
        LeaderboardPrivacy::Initials => (initials(&full_name), config.default_picture.clone()),
        LeaderboardPrivacy::Hide => (
            config.hidden_placeholder.clone(),
            config.default_picture.clone(),
        ),
    }
}

/// Assigns competition places ("1, 1, 3") to candidates already sorted by
/// score, keeping at most `config.size` entries.
pub fn rank(
    candidates: &[Candidate],
    viewer_id: Option<i32>,
    config: &LeaderboardConfig,
) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = Vec::with_capacity(config.size.min(candidates.len()));

    for (i, candidate) in candidates.iter().take(config.size).enumerate() {
        let place = match entries.last() {
            Some(prev) if prev.score == candidate.score => prev.place,
            _ => i + 1,
        };
        let (name, photo) = identity(candidate, config);
        entries.push(LeaderboardEntry {
            place,
            name,
            photo,
            score: candidate.score,
            is_viewer: viewer_id == Some(candidate.user_id),
        });
    }

    entries
}

/// Loads eligible profiles, best first.
pub async fn candidates<C: ConnectionTrait>(
    db: &C,
    viewer_id: Option<i32>,
    limit: usize,
) -> Result<Vec<Candidate>, DbErr> {
    let mut visible = Condition::any()
        .add(profiles::Column::LeaderboardPrivacy.ne(LeaderboardPrivacy::Hide.into_value()));
    if let Some(viewer_id) = viewer_id {
        visible = visible.add(profiles::Column::UserId.eq(viewer_id));
    }

    let rows = profiles::Entity::find()
        .filter(visible)
        .find_also_related(users::Entity)
        .order_by_desc(profiles::Column::ForumScore)
        .order_by_asc(profiles::Column::UserId)
        .limit(limit as u64)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(profile, user)| {
            let user = user?;
            Some(Candidate {
                user_id: profile.user_id,
                first_name: user.first_name,
                last_name: user.last_name,
                profile_pic: profile.profile_pic,
                privacy: profile.leaderboard_privacy,
                score: profile.forum_score,
            })
        })
        .collect())
}

/// The board as `viewer_id` sees it.
pub async fn build<C: ConnectionTrait>(
    db: &C,
    viewer_id: Option<i32>,
    config: &LeaderboardConfig,
) -> Result<Vec<LeaderboardEntry>, DbErr> {
    let candidates = candidates(db, viewer_id, config.size).await?;
    Ok(rank(&candidates, viewer_id, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LeaderboardConfig {
        LeaderboardConfig {
            size: 15,
            default_picture: "profile_pictures/default.png".to_owned(),
            hidden_placeholder: "Anonymous".to_owned(),
        }
    }

    fn candidate(user_id: i32, score: i32, privacy: LeaderboardPrivacy) -> Candidate {
        Candidate {
            user_id,
            first_name: "Jane".to_owned(),
            last_name: "Mary Smith".to_owned(),
            profile_pic: format!("profile_pictures/{}.png", user_id),
            privacy,
            score,
        }
    }

    #[test]
    fn test_competition_ranking() {
        let candidates: Vec<_> = [10, 10, 8, 5]
            .iter()
            .enumerate()
            .map(|(i, s)| candidate(i as i32 + 1, *s, LeaderboardPrivacy::FullName))
            .collect();
        let places: Vec<_> = rank(&candidates, None, &config())
            .iter()
            .map(|e| e.place)
            .collect();
        assert_eq!(places, vec![1, 1, 3, 4]);
    }

    #[test]
    fn test_three_way_tie_then_gap() {
        let candidates: Vec<_> = [7, 7, 7, 2]
            .iter()
            .enumerate()
            .map(|(i, s)| candidate(i as i32 + 1, *s, LeaderboardPrivacy::Initials))
            .collect();
        let places: Vec<_> = rank(&candidates, None, &config())
            .iter()
            .map(|e| e.place)
            .collect();
        assert_eq!(places, vec![1, 1, 1, 4]);
    }

    #[test]
    fn test_capped_at_size() {
        let candidates: Vec<_> = (0..20)
            .map(|i| candidate(i, 100 - i, LeaderboardPrivacy::FirstName))
            .collect();
        let entries = rank(&candidates, None, &config());
        assert_eq!(entries.len(), 15);
        assert_eq!(entries.last().map(|e| e.place), Some(15));
    }

    #[test]
    fn test_display_identity() {
        let cfg = config();
        let entries = rank(
            &[
                candidate(1, 4, LeaderboardPrivacy::FullName),
                candidate(2, 3, LeaderboardPrivacy::FirstName),
                candidate(3, 2, LeaderboardPrivacy::Initials),
                candidate(4, 1, LeaderboardPrivacy::Hide),
            ],
            Some(4),
            &cfg,
        );

        assert_eq!(entries[0].name, "Jane Mary Smith");
        assert_eq!(entries[0].photo, "profile_pictures/1.png");
        assert_eq!(entries[1].name, "Jane");
        assert_eq!(entries[1].photo, cfg.default_picture);
        assert_eq!(entries[2].name, "J. M. S.");
        assert_eq!(entries[2].photo, cfg.default_picture);
        assert_eq!(entries[3].name, "Anonymous");
        assert!(entries[3].is_viewer);
        assert!(!entries[0].is_viewer);
    }

    #[test]
    fn test_empty_board() {
        assert!(rank(&[], Some(1), &config()).is_empty());
    }
}
