use super::{db_error, login_redirect};
use crate::db::get_db_pool;
use crate::forum;
use crate::middleware::ClientCtx;
use crate::orm::forum_sections::{self, SectionCategory};
use crate::orm::forum_threads;
use actix_web::{error, get, web, Error, Responder};
use askama_actix::{Template, TemplateToResponse};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_forums).service(view_section);
}

/// Link in the trail above forum pages.
pub struct Breadcrumb {
    pub url: String,
    pub label: String,
}

pub fn forums_crumb() -> Breadcrumb {
    Breadcrumb {
        url: "/forums".to_owned(),
        label: "Forums".to_owned(),
    }
}

pub fn section_crumb(section: &forum_sections::Model) -> Breadcrumb {
    Breadcrumb {
        url: section.url(),
        label: section.name.to_owned(),
    }
}

pub fn thread_url(section: &forum_sections::Model, thread: &forum_threads::Model) -> String {
    format!("{}/{}", section.url(), thread.url_slug)
}

/// Finds a section from its URL segments or fails with 404.
pub async fn resolve_section(
    category: &str,
    section: &str,
) -> Result<forum_sections::Model, Error> {
    let category = SectionCategory::from_slug(category)
        .ok_or_else(|| error::ErrorNotFound("Section not found."))?;
    forum::find_section(get_db_pool(), category, section)
        .await
        .map_err(|e| db_error("resolve_section", e))?
        .ok_or_else(|| error::ErrorNotFound("Section not found."))
}

pub struct CategoryForTemplate {
    pub label: &'static str,
    pub sections: Vec<forum_sections::Model>,
}

#[derive(Template)]
#[template(path = "forums.html")]
pub struct ForumsTemplate {
    pub client: ClientCtx,
    pub categories: Vec<CategoryForTemplate>,
}

#[get("/forums")]
pub async fn view_forums(client: ClientCtx) -> Result<impl Responder, Error> {
    if !client.is_user() {
        return Ok(login_redirect());
    }

    let categories = forum::sections_by_category(get_db_pool())
        .await
        .map_err(|e| db_error("view_forums", e))?
        .into_iter()
        .map(|(category, sections)| CategoryForTemplate {
            label: category.label(),
            sections,
        })
        .collect();

    Ok(ForumsTemplate { client, categories }.to_response())
}

pub struct ThreadForTemplate {
    pub name: String,
    pub description: String,
    pub url: String,
}

#[derive(Template)]
#[template(path = "section.html")]
pub struct SectionTemplate {
    pub client: ClientCtx,
    pub section: forum_sections::Model,
    pub category_label: &'static str,
    pub threads: Vec<ThreadForTemplate>,
    pub breadcrumbs: Vec<Breadcrumb>,
}

#[get("/forums/{category}/{section}")]
pub async fn view_section(
    client: ClientCtx,
    path: web::Path<(String, String)>,
) -> Result<impl Responder, Error> {
    if !client.is_user() {
        return Ok(login_redirect());
    }

    let (category, section) = path.into_inner();
    let section = resolve_section(&category, &section).await?;

    let threads = forum::list_threads(get_db_pool(), section.id)
        .await
        .map_err(|e| db_error("view_section", e))?
        .into_iter()
        .map(|thread| ThreadForTemplate {
            url: thread_url(&section, &thread),
            name: thread.name,
            description: thread.description,
        })
        .collect();

    Ok(SectionTemplate {
        client,
        category_label: section.category.label(),
        breadcrumbs: vec![forums_crumb()],
        section,
        threads,
    }
    .to_response())
}
