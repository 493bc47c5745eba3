use super::forum::{forums_crumb, section_crumb, thread_url, Breadcrumb};
use super::thread::{post_url, resolve_thread, AuthorForTemplate, POST_DATE_FORMAT};
use super::{db_error, login_redirect, redirect};
use crate::app_config;
use crate::db::get_db_pool;
use crate::form::FormErrors;
use crate::forum::{self, NewReply};
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::orm::{forum_posts, forum_replies, forum_sections, forum_threads, users};
use crate::sanitize;
use actix_web::{error, get, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::EntityTrait;
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_post)
        .service(create_reply)
        .service(vote_post)
        .service(delete_post)
        .service(vote_reply)
        .service(delete_reply);
}

type PostPath = web::Path<(String, String, String, String)>;
type ReplyPath = web::Path<(String, String, String, String, String)>;

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct NewReplyForm {
    #[validate(length(min = 1, message = "Your reply cannot be empty."))]
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub is_anonymous: Option<String>,
    pub csrf_token: String,
}

impl NewReplyForm {
    pub fn anonymous(&self) -> bool {
        self.is_anonymous.is_some()
    }
}

#[derive(Deserialize)]
pub struct VoteForm {
    pub direction: String,
    pub csrf_token: String,
}

#[derive(Deserialize)]
pub struct DeleteForm {
    pub csrf_token: String,
}

/// "up" is true, "down" is false, anything else is refused.
pub fn parse_direction(direction: &str) -> Option<bool> {
    match direction {
        "up" => Some(true),
        "down" => Some(false),
        _ => None,
    }
}

/// Vote state of one post or reply as the viewer sees it.
pub struct VotesForTemplate {
    pub score: i64,
    pub up: i64,
    pub down: i64,
    pub voted_up: bool,
    pub voted_down: bool,
}

impl VotesForTemplate {
    fn new(tally: forum::VoteTally, viewer_vote: Option<bool>) -> Self {
        Self {
            score: tally.net(),
            up: tally.up,
            down: tally.down,
            voted_up: viewer_vote == Some(true),
            voted_down: viewer_vote == Some(false),
        }
    }
}

pub struct ReplyForTemplate {
    pub url_slug: String,
    pub body_html: String,
    pub author: AuthorForTemplate,
    pub created_at: String,
    pub votes: VotesForTemplate,
    pub can_delete: bool,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub client: ClientCtx,
    pub post: forum_posts::Model,
    pub url: String,
    pub body_html: String,
    pub author: AuthorForTemplate,
    pub created_at: String,
    pub votes: VotesForTemplate,
    pub can_delete: bool,
    pub replies: Vec<ReplyForTemplate>,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub form: NewReplyForm,
    pub errors: FormErrors,
}

/// Finds the section, thread and post named by the URL or fails with 404.
async fn resolve_post(
    category: &str,
    section: &str,
    thread: &str,
    post: &str,
) -> Result<
    (
        forum_sections::Model,
        forum_threads::Model,
        forum_posts::Model,
    ),
    Error,
> {
    let (section, thread) = resolve_thread(category, section, thread).await?;
    let post = forum::find_post(get_db_pool(), thread.id, post)
        .await
        .map_err(|e| db_error("resolve_post", e))?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;
    Ok((section, thread, post))
}

async fn resolve_reply(
    post: &forum_posts::Model,
    reply: &str,
) -> Result<forum_replies::Model, Error> {
    forum::find_reply(get_db_pool(), post.id, reply)
        .await
        .map_err(|e| db_error("resolve_reply", e))?
        .ok_or_else(|| error::ErrorNotFound("Reply not found."))
}

async fn render_post(
    client: ClientCtx,
    section: forum_sections::Model,
    thread: forum_threads::Model,
    post: forum_posts::Model,
    form: NewReplyForm,
    errors: FormErrors,
) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let viewer = client.get_id();
    let local_domains = app_config::chat().local_domains;

    let author = users::Entity::find_by_id(post.author_id)
        .one(db)
        .await
        .map_err(|e| db_error("render_post", e))?;
    let tally = forum::post_tally(db, post.id)
        .await
        .map_err(|e| db_error("render_post", e))?;
    let viewer_vote = match viewer {
        Some(user_id) => forum::user_post_vote(db, user_id, post.id)
            .await
            .map_err(|e| db_error("render_post", e))?,
        None => None,
    };

    let rows = forum::list_replies(db, post.id)
        .await
        .map_err(|e| db_error("render_post", e))?;
    let mut replies = Vec::with_capacity(rows.len());
    for (reply, reply_author) in rows {
        let tally = forum::reply_tally(db, reply.id)
            .await
            .map_err(|e| db_error("render_post", e))?;
        let viewer_vote = match viewer {
            Some(user_id) => forum::user_reply_vote(db, user_id, reply.id)
                .await
                .map_err(|e| db_error("render_post", e))?,
            None => None,
        };

        replies.push(ReplyForTemplate {
            body_html: sanitize::linkify_text(&reply.body, &local_domains),
            author: AuthorForTemplate::new(reply_author.as_ref(), reply.is_anonymous),
            created_at: reply.created_at.format(POST_DATE_FORMAT).to_string(),
            votes: VotesForTemplate::new(tally, viewer_vote),
            can_delete: viewer == Some(reply.author_id),
            url_slug: reply.url_slug,
        });
    }

    let breadcrumbs = vec![
        forums_crumb(),
        section_crumb(&section),
        Breadcrumb {
            url: thread_url(&section, &thread),
            label: thread.name.to_owned(),
        },
    ];

    Ok(PostTemplate {
        client,
        url: post_url(&section, &thread, &post),
        body_html: sanitize::linkify_text(&post.body, &local_domains),
        author: AuthorForTemplate::new(author.as_ref(), post.is_anonymous),
        created_at: post.created_at.format(POST_DATE_FORMAT).to_string(),
        votes: VotesForTemplate::new(tally, viewer_vote),
        can_delete: viewer == Some(post.author_id),
        post,
        replies,
        breadcrumbs,
        form,
        errors,
    }
    .to_response())
}

#[get("/forums/{category}/{section}/{thread}/{post}")]
pub async fn view_post(client: ClientCtx, path: PostPath) -> Result<impl Responder, Error> {
    if !client.is_user() {
        return Ok(login_redirect());
    }

    let (category, section, thread, post) = path.into_inner();
    let (section, thread, post) = resolve_post(&category, &section, &thread, &post).await?;
    render_post(
        client,
        section,
        thread,
        post,
        NewReplyForm::default(),
        FormErrors::new(),
    )
    .await
}

#[post("/forums/{category}/{section}/{thread}/{post}")]
pub async fn create_reply(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: PostPath,
    form: web::Form<NewReplyForm>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let (category, section, thread, post) = path.into_inner();
    let (section, thread, post) = resolve_post(&category, &section, &thread, &post).await?;

    let form = form.into_inner();
    let mut errors = FormErrors::new();
    if let Err(e) = form.validate() {
        errors.add_validation_errors(&e);
    }
    if form.body.trim().is_empty() && !errors.has("body") {
        errors.add("body", "Your reply cannot be empty.");
    }
    if !errors.is_empty() {
        return render_post(client, section, thread, post, form, errors).await;
    }

    let reply = forum::create_reply(
        get_db_pool(),
        NewReply {
            post_id: post.id,
            author_id: user_id,
            body: &form.body,
            is_anonymous: form.anonymous(),
        },
    )
    .await
    .map_err(|e| db_error("create_reply", e))?;

    log::info!(
        "user_id={} created reply_id={} on post_id={}",
        user_id,
        reply.id,
        post.id
    );

    Ok(redirect(&post_url(&section, &thread, &post)))
}

#[post("/forums/{category}/{section}/{thread}/{post}/vote")]
pub async fn vote_post(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: PostPath,
    form: web::Form<VoteForm>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let direction = parse_direction(&form.direction)
        .ok_or_else(|| error::ErrorBadRequest("Unknown vote direction."))?;

    let (category, section, thread, post) = path.into_inner();
    let (section, thread, post) = resolve_post(&category, &section, &thread, &post).await?;

    let outcome = forum::vote_on_post(get_db_pool(), user_id, post.id, direction)
        .await
        .map_err(|e| db_error("vote_post", e))?;
    log::debug!("user_id={} vote on post_id={}: {:?}", user_id, post.id, outcome);

    Ok(redirect(&post_url(&section, &thread, &post)))
}

#[post("/forums/{category}/{section}/{thread}/{post}/delete")]
pub async fn delete_post(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: PostPath,
    form: web::Form<DeleteForm>,
) -> Result<impl Responder, Error> {
    client.require_login()?;
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let (category, section, thread, post) = path.into_inner();
    let (section, thread, post) = resolve_post(&category, &section, &thread, &post).await?;
    client.require_ownership(post.author_id)?;

    forum::delete_post(get_db_pool(), post.id)
        .await
        .map_err(|e| db_error("delete_post", e))?;
    log::info!("post_id={} deleted by its author", post.id);

    Ok(redirect(&thread_url(&section, &thread)))
}

#[post("/forums/{category}/{section}/{thread}/{post}/replies/{reply}/vote")]
pub async fn vote_reply(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: ReplyPath,
    form: web::Form<VoteForm>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let direction = parse_direction(&form.direction)
        .ok_or_else(|| error::ErrorBadRequest("Unknown vote direction."))?;

    let (category, section, thread, post, reply) = path.into_inner();
    let (section, thread, post) = resolve_post(&category, &section, &thread, &post).await?;
    let reply = resolve_reply(&post, &reply).await?;

    let outcome = forum::vote_on_reply(get_db_pool(), user_id, reply.id, direction)
        .await
        .map_err(|e| db_error("vote_reply", e))?;
    log::debug!("user_id={} vote on reply_id={}: {:?}", user_id, reply.id, outcome);

    Ok(redirect(&post_url(&section, &thread, &post)))
}

#[post("/forums/{category}/{section}/{thread}/{post}/replies/{reply}/delete")]
pub async fn delete_reply(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: ReplyPath,
    form: web::Form<DeleteForm>,
) -> Result<impl Responder, Error> {
    client.require_login()?;
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let (category, section, thread, post, reply) = path.into_inner();
    let (section, thread, post) = resolve_post(&category, &section, &thread, &post).await?;
    let reply = resolve_reply(&post, &reply).await?;
    client.require_ownership(reply.author_id)?;

    forum::delete_reply(get_db_pool(), reply.id)
        .await
        .map_err(|e| db_error("delete_reply", e))?;
    log::info!("reply_id={} deleted by its author", reply.id);

    Ok(redirect(&post_url(&section, &thread, &post)))
}
