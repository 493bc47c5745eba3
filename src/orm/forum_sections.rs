//! Forum sections, the top level of the forum tree.

use sea_orm::entity::prelude::*;

/// Category a section is listed under; also the first URL segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
pub enum SectionCategory {
    #[sea_orm(string_value = "ACADEMIC")]
    Academic,
    #[sea_orm(string_value = "GUILD")]
    Guild,
    #[sea_orm(string_value = "SOCIAL")]
    Social,
    #[sea_orm(string_value = "WELLBEING")]
    Wellbeing,
}

impl SectionCategory {
    pub fn all() -> [SectionCategory; 4] {
        [
            SectionCategory::Academic,
            SectionCategory::Guild,
            SectionCategory::Social,
            SectionCategory::Wellbeing,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            SectionCategory::Academic => "Academic",
            SectionCategory::Guild => "Students' Guild",
            SectionCategory::Social => "Social",
            SectionCategory::Wellbeing => "Wellbeing",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            SectionCategory::Academic => "academic",
            SectionCategory::Guild => "guild",
            SectionCategory::Social => "social",
            SectionCategory::Wellbeing => "wellbeing",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::all().into_iter().find(|c| c.slug() == slug)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "forum_sections")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub category: SectionCategory,
    #[sea_orm(unique)]
    pub url_slug: String,
}

impl Model {
    pub fn url(&self) -> String {
        format!("/forums/{}/{}", self.category.slug(), self.url_slug)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::forum_threads::Entity")]
    Threads,
}

impl Related<super::forum_threads::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Threads.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
