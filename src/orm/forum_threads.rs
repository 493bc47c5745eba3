//! Forum threads.
//!
//! A thread may be scoped to a department, a module or a college. The scope
//! is an optional (kind, id) pair; `scope_id` is not a foreign key because
//! its target table depends on `scope_kind`.

use sea_orm::entity::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
pub enum ScopeKind {
    #[sea_orm(string_value = "DEPARTMENT")]
    Department,
    #[sea_orm(string_value = "MODULE")]
    Module,
    #[sea_orm(string_value = "COLLEGE")]
    College,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "forum_threads")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub section_id: i32,
    #[sea_orm(unique)]
    pub url_slug: String,
    pub scope_kind: Option<ScopeKind>,
    pub scope_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::forum_sections::Entity",
        from = "Column::SectionId",
        to = "super::forum_sections::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Section,
    #[sea_orm(has_many = "super::forum_posts::Entity")]
    Posts,
}

impl Related<super::forum_sections::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Section.def()
    }
}

impl Related<super::forum_posts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
