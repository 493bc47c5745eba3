use super::forum::{forums_crumb, resolve_section, section_crumb, thread_url, Breadcrumb};
use super::{db_error, login_redirect, redirect};
use crate::db::get_db_pool;
use crate::form::FormErrors;
use crate::forum::{self, NewPost};
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::orm::{forum_posts, forum_sections, forum_threads, users};
use actix_web::{error, get, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_thread).service(create_post);
}

/// Shown in place of the author on anonymous contributions.
pub const ANONYMOUS: &str = "Anonymous";

pub const POST_DATE_FORMAT: &str = "%d %b %Y, %H:%M";

/// Byline shown beside a post or reply.
pub struct AuthorForTemplate {
    pub id: Option<i32>,
    pub name: String,
}

impl AuthorForTemplate {
    pub fn new(author: Option<&users::Model>, is_anonymous: bool) -> Self {
        match author {
            Some(author) if !is_anonymous => Self {
                id: Some(author.id),
                name: author.full_name(),
            },
            _ => Self {
                id: None,
                name: ANONYMOUS.to_owned(),
            },
        }
    }
}

pub struct PostSummaryForTemplate {
    pub title: String,
    pub url: String,
    pub author: AuthorForTemplate,
    pub created_at: String,
    pub reply_count: i64,
    pub score: i64,
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct NewPostForm {
    #[validate(length(min = 1, max = 100, message = "Enter a title of at most 100 characters."))]
    #[serde(default)]
    pub title: String,
    #[validate(length(min = 1, message = "Your post cannot be empty."))]
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub is_anonymous: Option<String>,
    pub csrf_token: String,
}

impl NewPostForm {
    pub fn anonymous(&self) -> bool {
        self.is_anonymous.is_some()
    }
}

#[derive(Template)]
#[template(path = "thread.html")]
pub struct ThreadTemplate {
    pub client: ClientCtx,
    pub section: forum_sections::Model,
    pub thread: forum_threads::Model,
    pub url: String,
    pub posts: Vec<PostSummaryForTemplate>,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub form: NewPostForm,
    pub errors: FormErrors,
}

pub fn post_url(
    section: &forum_sections::Model,
    thread: &forum_threads::Model,
    post: &forum_posts::Model,
) -> String {
    format!("{}/{}", thread_url(section, thread), post.url_slug)
}

/// Finds a section and thread from URL segments or fails with 404.
pub async fn resolve_thread(
    category: &str,
    section: &str,
    thread: &str,
) -> Result<(forum_sections::Model, forum_threads::Model), Error> {
    let section = resolve_section(category, section).await?;
    let thread = forum::find_thread(get_db_pool(), section.id, thread)
        .await
        .map_err(|e| db_error("resolve_thread", e))?
        .ok_or_else(|| error::ErrorNotFound("Thread not found."))?;
    Ok((section, thread))
}

async fn render_thread(
    client: ClientCtx,
    section: forum_sections::Model,
    thread: forum_threads::Model,
    form: NewPostForm,
    errors: FormErrors,
) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let rows = forum::list_posts(db, thread.id)
        .await
        .map_err(|e| db_error("render_thread", e))?;

    let mut posts = Vec::with_capacity(rows.len());
    for (post, author) in rows {
        let reply_count = forum::count_replies(db, post.id)
            .await
            .map_err(|e| db_error("render_thread", e))?;
        let tally = forum::post_tally(db, post.id)
            .await
            .map_err(|e| db_error("render_thread", e))?;

        posts.push(PostSummaryForTemplate {
            url: post_url(&section, &thread, &post),
            author: AuthorForTemplate::new(author.as_ref(), post.is_anonymous),
            created_at: post.created_at.format(POST_DATE_FORMAT).to_string(),
            reply_count,
            score: tally.net(),
            title: post.title,
        });
    }

    Ok(ThreadTemplate {
        client,
        url: thread_url(&section, &thread),
        breadcrumbs: vec![forums_crumb(), section_crumb(&section)],
        section,
        thread,
        posts,
        form,
        errors,
    }
    .to_response())
}

#[get("/forums/{category}/{section}/{thread}")]
pub async fn view_thread(
    client: ClientCtx,
    path: web::Path<(String, String, String)>,
) -> Result<impl Responder, Error> {
    if !client.is_user() {
        return Ok(login_redirect());
    }

    let (category, section, thread) = path.into_inner();
    let (section, thread) = resolve_thread(&category, &section, &thread).await?;
    render_thread(client, section, thread, NewPostForm::default(), FormErrors::new()).await
}

#[post("/forums/{category}/{section}/{thread}")]
pub async fn create_post(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<(String, String, String)>,
    form: web::Form<NewPostForm>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let (category, section, thread) = path.into_inner();
    let (section, thread) = resolve_thread(&category, &section, &thread).await?;

    let mut form = form.into_inner();
    form.title = form.title.trim().to_owned();

    let mut errors = FormErrors::new();
    if let Err(e) = form.validate() {
        errors.add_validation_errors(&e);
    }
    if form.body.trim().is_empty() && !errors.has("body") {
        errors.add("body", "Your post cannot be empty.");
    }
    if !errors.is_empty() {
        return render_thread(client, section, thread, form, errors).await;
    }

    let post = forum::create_post(
        get_db_pool(),
        NewPost {
            thread_id: thread.id,
            author_id: user_id,
            title: &form.title,
            body: &form.body,
            is_anonymous: form.anonymous(),
        },
    )
    .await
    .map_err(|e| db_error("create_post", e))?;

    log::info!(
        "user_id={} created post_id={} in thread_id={}",
        user_id,
        post.id,
        thread.id
    );

    Ok(redirect(&post_url(&section, &thread, &post)))
}
