use super::{db_error, login_redirect, redirect};
use crate::academic;
use crate::app_config;
use crate::create_user::{check_course_and_modules, validate_password_match};
use crate::db::get_db_pool;
use crate::form::{FormErrors, FormPairs};
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::orm::{courses, users};
use crate::orm::profiles::LeaderboardPrivacy;
use crate::session;
use crate::user::{self, ProfileSettings};
use actix_web::{get, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::EntityTrait;
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_settings)
        .service(update_settings)
        .service(view_change_password)
        .service(update_password)
        .service(redirect_change_password)
        .service(redirect_well_known_change_password);
}

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub struct CourseOption {
    pub title: String,
    pub selected: bool,
}

pub struct ModuleOption {
    pub code: String,
    pub label: String,
    pub selected: bool,
}

pub struct PrivacyOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "settings.html")]
pub struct SettingsTemplate {
    pub client: ClientCtx,
    pub courses: Vec<CourseOption>,
    pub modules: Vec<ModuleOption>,
    pub privacy: Vec<PrivacyOption>,
    pub bio: String,
    pub profile_pic_url: String,
    pub errors: FormErrors,
    pub saved: bool,
    pub required_credits: i32,
}

/// Values the settings form shows, either from the store or as posted.
struct SettingsValues {
    course: String,
    module_codes: Vec<String>,
    privacy: LeaderboardPrivacy,
    bio: String,
}

async fn render_settings(
    client: ClientCtx,
    values: SettingsValues,
    errors: FormErrors,
    saved: bool,
) -> Result<HttpResponse, Error> {
    let db = get_db_pool();

    let courses = academic::list_courses(db)
        .await
        .map_err(|e| db_error("render_settings", e))?
        .into_iter()
        .map(|c| CourseOption {
            selected: c.title == values.course,
            title: c.title,
        })
        .collect();

    let modules = academic::list_modules(db)
        .await
        .map_err(|e| db_error("render_settings", e))?
        .into_iter()
        .map(|m| ModuleOption {
            selected: values.module_codes.contains(&m.code),
            label: m.label(),
            code: m.code,
        })
        .collect();

    let privacy = LeaderboardPrivacy::choices()
        .into_iter()
        .map(|(choice, label)| PrivacyOption {
            value: choice.as_str(),
            label,
            selected: choice == values.privacy,
        })
        .collect();

    let profile_pic_url = client.get_avatar_url();

    Ok(SettingsTemplate {
        client,
        courses,
        modules,
        privacy,
        bio: values.bio,
        profile_pic_url,
        errors,
        saved,
        required_credits: app_config::registration().required_credits,
    }
    .to_response())
}

#[get("/settings")]
pub async fn view_settings(client: ClientCtx) -> Result<impl Responder, Error> {
    let user_id = match client.get_id() {
        Some(id) => id,
        None => return Ok(login_redirect()),
    };

    let db = get_db_pool();
    let profile = user::ensure_profile(db, user_id)
        .await
        .map_err(|e| db_error("view_settings", e))?;

    let course = match profile.course_id {
        Some(id) => courses::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(|e| db_error("view_settings", e))?
            .map(|c| c.title)
            .unwrap_or_default(),
        None => String::new(),
    };
    let module_codes = academic::modules_for_profile(db, profile.id)
        .await
        .map_err(|e| db_error("view_settings", e))?
        .into_iter()
        .map(|m| m.code)
        .collect();

    let values = SettingsValues {
        course,
        module_codes,
        privacy: profile.leaderboard_privacy,
        bio: profile.bio,
    };
    render_settings(client, values, FormErrors::new(), false).await
}

#[post("/settings")]
pub async fn update_settings(
    client: ClientCtx,
    cookies: actix_session::Session,
    body: web::Bytes,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let pairs = FormPairs::parse(&body);
    validate_csrf_token(&cookies, &pairs.get("csrf_token"))?;

    let db = get_db_pool();
    let mut errors = FormErrors::new();

    let values = SettingsValues {
        course: pairs.get("course"),
        module_codes: pairs.get_all("modules"),
        privacy: LeaderboardPrivacy::from_form_value(&pairs.get("leaderboard_privacy"))
            .unwrap_or_default(),
        bio: pairs.get("bio"),
    };

    if LeaderboardPrivacy::from_form_value(&pairs.get("leaderboard_privacy")).is_none() {
        errors.add("leaderboard_privacy", "You must pick a privacy option.");
    }

    let study = check_course_and_modules(
        db,
        &values.course,
        &values.module_codes,
        app_config::registration().required_credits,
        &mut errors,
    )
    .await
    .map_err(|e| db_error("update_settings", e))?;

    let (course, modules) = match study {
        Some(study) if errors.is_empty() => study,
        _ => return render_settings(client, values, errors, false).await,
    };

    let settings = ProfileSettings {
        course_id: course.id,
        module_ids: modules.iter().map(|m| m.id).collect(),
        leaderboard_privacy: values.privacy,
        bio: values.bio.clone(),
        clear_profile_pic: pairs.get_bool("clear_profile_pic"),
    };
    user::update_settings(db, user_id, &settings)
        .await
        .map_err(|e| db_error("update_settings", e))?;

    log::info!("Settings updated for user_id={}", user_id);

    // The avatar in the navigation bar comes from the request context.
    let client = ClientCtx::from_session(&cookies).await;
    render_settings(client, values, FormErrors::new(), true).await
}

#[derive(Template)]
#[template(path = "change_password.html")]
pub struct ChangePasswordTemplate {
    pub client: ClientCtx,
    pub errors: FormErrors,
    pub saved: bool,
}

#[derive(Deserialize)]
pub struct ChangePasswordForm {
    old_password: String,
    new_password: String,
    new_password_confirm: String,
    csrf_token: String,
}

#[get("/settings/change-password")]
pub async fn view_change_password(client: ClientCtx) -> HttpResponse {
    if !client.is_user() {
        return login_redirect();
    }

    ChangePasswordTemplate {
        client,
        errors: FormErrors::new(),
        saved: false,
    }
    .to_response()
}

#[post("/settings/change-password")]
pub async fn update_password(
    client: ClientCtx,
    cookies: actix_session::Session,
    form: web::Form<ChangePasswordForm>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let db = get_db_pool();
    let mut errors = FormErrors::new();

    let stored = users::Entity::find_by_id(user_id)
        .one(db)
        .await
        .map_err(|e| db_error("update_password", e))?;
    match stored {
        Some(user) if session::verify_password(&form.old_password, &user.password) => {}
        _ => errors.add(
            "old_password",
            "Your old password was entered incorrectly. Please enter it again.",
        ),
    }

    if form.new_password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(
            "new_password",
            format!(
                "Your password must contain at least {} characters.",
                MIN_PASSWORD_LENGTH
            ),
        );
    }
    if let Err(e) = validate_password_match(&form.new_password, &form.new_password_confirm) {
        errors.add("new_password_confirm", e);
    }

    if !errors.is_empty() {
        return Ok(ChangePasswordTemplate {
            client,
            errors,
            saved: false,
        }
        .to_response());
    }

    user::set_password(db, user_id, &form.new_password)
        .await
        .map_err(|e| db_error("update_password", e))?;

    // Everyone else holding this account is signed out; this browser stays in.
    if let Some(token) = session::get_token(&cookies) {
        let removed = session::remove_other_sessions(db, user_id, token)
            .await
            .map_err(|e| db_error("update_password", e))?;
        log::info!(
            "Password changed for user_id={}; {} other sessions ended",
            user_id,
            removed
        );
    }

    Ok(ChangePasswordTemplate {
        client,
        errors,
        saved: true,
    }
    .to_response())
}

#[get("/change-password")]
pub async fn redirect_change_password() -> HttpResponse {
    redirect("/settings/change-password")
}

#[get("/.well-known/change-password")]
pub async fn redirect_well_known_change_password() -> HttpResponse {
    redirect("/settings/change-password")
}
