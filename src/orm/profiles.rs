//! Student profile, one per user.
//!
//! Holds the study details picked at registration, the leaderboard privacy
//! choice and the forum score. The score is only written by `crate::score`.

use sea_orm::entity::prelude::*;

/// How a profile appears on other people's leaderboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[derive(Default)]
pub enum LeaderboardPrivacy {
    #[sea_orm(string_value = "HIDE")]
    #[default]
    Hide,
    #[sea_orm(string_value = "INITIALS")]
    Initials,
    #[sea_orm(string_value = "FIRST_NAME")]
    FirstName,
    #[sea_orm(string_value = "FULL_NAME")]
    FullName,
}

impl LeaderboardPrivacy {
    /// Every choice with its settings label, in display order.
    pub fn choices() -> [(LeaderboardPrivacy, &'static str); 4] {
        [
            (LeaderboardPrivacy::Hide, "Hide entirely"),
            (LeaderboardPrivacy::Initials, "Show initials only"),
            (LeaderboardPrivacy::FirstName, "Show first name only"),
            (LeaderboardPrivacy::FullName, "Show full name"),
        ]
    }

    /// Form value, identical to the stored value.
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderboardPrivacy::Hide => "HIDE",
            LeaderboardPrivacy::Initials => "INITIALS",
            LeaderboardPrivacy::FirstName => "FIRST_NAME",
            LeaderboardPrivacy::FullName => "FULL_NAME",
        }
    }

    pub fn from_form_value(value: &str) -> Option<Self> {
        Self::choices()
            .into_iter()
            .map(|(choice, _)| choice)
            .find(|choice| choice.as_str() == value)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_id: i32,
    pub date_of_birth: Date,
    pub admission_date: Date,
    pub course_id: Option<i32>,
    pub bio: String,
    pub profile_pic: String,
    pub leaderboard_privacy: LeaderboardPrivacy,
    pub forum_score: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::courses::Entity",
        from = "Column::CourseId",
        to = "super::courses::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Course,
    #[sea_orm(has_many = "super::profile_modules::Entity")]
    ProfileModules,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::courses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<super::modules::Entity> for Entity {
    fn to() -> RelationDef {
        super::profile_modules::Relation::Module.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::profile_modules::Relation::Profile.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
