use crate::academic;
use crate::app_config::{self, RegistrationConfig};
use crate::db::get_db_pool;
use crate::form::{FormErrors, FormPairs};
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::orm::{courses, modules, users};
use crate::session;
use crate::user;
use actix_web::{error, get, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use chrono::{Datelike, NaiveDate, Utc};
use sea_orm::{entity::*, ConnectionTrait, DatabaseConnection, DbErr, TransactionTrait};
use validator::Validate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Debug, Default, Validate)]
pub struct RegistrationForm {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "Enter your first name."))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Enter your last name."))]
    pub last_name: String,
    pub date_of_birth: String,
    pub admission_date: String,
    pub course: String,
    pub modules: Vec<String>,
    #[validate(length(
        min = 8,
        max = 1000,
        message = "Your password must contain at least 8 characters."
    ))]
    pub password: String,
    pub password_confirm: String,
    pub csrf_token: String,
}

impl RegistrationForm {
    pub fn from_pairs(pairs: &FormPairs) -> Self {
        Self {
            email: pairs.get("email").trim().to_lowercase(),
            first_name: pairs.get("first_name").trim().to_owned(),
            last_name: pairs.get("last_name").trim().to_owned(),
            date_of_birth: pairs.get("date_of_birth"),
            admission_date: pairs.get("admission_date"),
            course: pairs.get("course"),
            modules: pairs.get_all("modules"),
            password: pairs.get("password"),
            password_confirm: pairs.get("password_confirm"),
            csrf_token: pairs.get("csrf_token"),
        }
    }

    pub fn has_module(&self, code: &str) -> bool {
        self.modules.iter().any(|m| m == code)
    }
}

/// A registration that passed every check.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub date_of_birth: NaiveDate,
    pub admission_date: NaiveDate,
    pub course_id: i32,
    pub module_ids: Vec<i32>,
}

pub fn validate_email_domain(email: &str, domain: &str) -> Result<(), String> {
    if email.to_lowercase().contains(&domain.to_lowercase()) {
        Ok(())
    } else {
        Err(format!("Email address must contain {}.", domain))
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| "Enter a valid date.".to_owned())
}

/// Whole years between `dob` and `today`.
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> i32 {
    let birthday_pending = (today.month(), today.day()) < (dob.month(), dob.day());
    today.year() - dob.year() - i32::from(birthday_pending)
}

pub fn validate_over_age(dob: NaiveDate, today: NaiveDate, minimum: i32) -> Result<(), String> {
    if age_on(dob, today) < minimum {
        Err(format!("You must be over {} to use this app.", minimum))
    } else {
        Ok(())
    }
}

pub fn validate_admission_date(date: NaiveDate, today: NaiveDate) -> Result<(), String> {
    if date > today {
        Err("The admission date cannot be in the future.".to_owned())
    } else {
        Ok(())
    }
}

pub fn validate_password_match(password: &str, confirm: &str) -> Result<(), String> {
    if password == confirm {
        Ok(())
    } else {
        Err("The two password fields didn't match.".to_owned())
    }
}

/// Resolves the picked course and modules and applies the credit rule.
/// Problems are recorded against the `course` and `modules` fields.
pub async fn check_course_and_modules<C: ConnectionTrait>(
    db: &C,
    course: &str,
    module_codes: &[String],
    required_credits: i32,
    errors: &mut FormErrors,
) -> Result<Option<(courses::Model, Vec<modules::Model>)>, DbErr> {
    let course = if course.trim().is_empty() {
        errors.add("course", "You must pick a course.");
        None
    } else {
        let found = academic::course_by_title(db, course.trim()).await?;
        if found.is_none() {
            errors.add("course", "Select a valid choice.");
        }
        found
    };

    let picked = if module_codes.is_empty() {
        errors.add("modules", "You must pick some modules.");
        None
    } else {
        let found = academic::modules_by_codes(db, module_codes).await?;
        let mut unique_codes = module_codes.to_vec();
        unique_codes.sort();
        unique_codes.dedup();
        if found.len() != unique_codes.len() {
            errors.add("modules", "Select a valid choice.");
            None
        } else if let Err(e) = academic::validate_credits(&found, required_credits) {
            errors.add("modules", e);
            None
        } else {
            Some(found)
        }
    };

    Ok(match (course, picked) {
        (Some(course), Some(modules)) => Some((course, modules)),
        _ => None,
    })
}

/// Runs every registration rule. The outer error is a store failure; the
/// inner one carries the messages to show next to each field.
pub async fn check_registration<C: ConnectionTrait>(
    db: &C,
    form: &RegistrationForm,
    config: &RegistrationConfig,
    today: NaiveDate,
) -> Result<Result<NewUser, FormErrors>, DbErr> {
    let mut errors = FormErrors::new();

    if let Err(e) = form.validate() {
        errors.add_validation_errors(&e);
    }

    if !errors.has("email") {
        if let Err(e) = validate_email_domain(&form.email, &config.email_domain) {
            errors.add("email", e);
        } else if user::email_exists(db, &form.email).await? {
            errors.add(
                "email",
                already_registered(&form.email),
            );
        }
    }

    let date_of_birth = match parse_date(&form.date_of_birth) {
        Ok(dob) => {
            if let Err(e) = validate_over_age(dob, today, config.minimum_age) {
                errors.add("date_of_birth", e);
            }
            Some(dob)
        }
        Err(e) => {
            errors.add("date_of_birth", e);
            None
        }
    };

    let admission_date = match parse_date(&form.admission_date) {
        Ok(date) => {
            if let Err(e) = validate_admission_date(date, today) {
                errors.add("admission_date", e);
            }
            Some(date)
        }
        Err(e) => {
            errors.add("admission_date", e);
            None
        }
    };

    if let Err(e) = validate_password_match(&form.password, &form.password_confirm) {
        errors.add("password_confirm", e);
    }

    let study = check_course_and_modules(
        db,
        &form.course,
        &form.modules,
        config.required_credits,
        &mut errors,
    )
    .await?;

    if !errors.is_empty() {
        return Ok(Err(errors));
    }

    match (date_of_birth, admission_date, study) {
        (Some(date_of_birth), Some(admission_date), Some((course, modules))) => Ok(Ok(NewUser {
            email: form.email.clone(),
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            password: form.password.clone(),
            date_of_birth,
            admission_date,
            course_id: course.id,
            module_ids: modules.iter().map(|m| m.id).collect(),
        })),
        _ => Ok(Err(errors)),
    }
}

fn already_registered(email: &str) -> String {
    format!("The email address {} is already registered", email)
}

/// Registers a checked user. An insert that loses a race with another
/// registration for the same address comes back as an `email` field error.
pub async fn create_account(
    db: &DatabaseConnection,
    new: &NewUser,
) -> Result<Result<users::Model, FormErrors>, DbErr> {
    match register_user(db, new).await {
        Ok(user) => Ok(Ok(user)),
        Err(e) => {
            if !user::email_exists(db, &new.email).await? {
                return Err(e);
            }
            log::warn!("Registration for an address taken meanwhile: {}", e);
            let mut errors = FormErrors::new();
            errors.add("email", already_registered(&new.email));
            Ok(Err(errors))
        }
    }
}

/// Creates the user, their profile and module links in one transaction.
pub async fn register_user(
    db: &DatabaseConnection,
    new: &NewUser,
) -> Result<users::Model, DbErr> {
    let password_hash = session::hash_password(&new.password).map_err(|e| {
        log::error!("Failed to hash password: {}", e);
        DbErr::Custom("password hashing failed".to_owned())
    })?;

    let txn = db.begin().await?;

    let user = users::ActiveModel {
        email: Set(new.email.trim().to_lowercase()),
        password: Set(password_hash),
        first_name: Set(new.first_name.clone()),
        last_name: Set(new.last_name.clone()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut profile = user::new_profile(user.id);
    profile.date_of_birth = Set(new.date_of_birth);
    profile.admission_date = Set(new.admission_date);
    profile.course_id = Set(Some(new.course_id));
    let profile = profile.insert(&txn).await?;

    academic::set_profile_modules(&txn, profile.id, &new.module_ids).await?;

    txn.commit().await?;

    log::info!("New user registered: user_id={}", user.id);
    Ok(user)
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub client: ClientCtx,
    pub form: RegistrationForm,
    pub errors: FormErrors,
    pub courses: Vec<courses::Model>,
    pub modules: Vec<modules::Model>,
    pub email_domain: String,
    pub required_credits: i32,
}

async fn render_register(
    client: ClientCtx,
    form: RegistrationForm,
    errors: FormErrors,
) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let config = app_config::registration();

    let courses = academic::list_courses(db).await.map_err(|e| {
        log::error!("render_register: {}", e);
        error::ErrorInternalServerError("DB error")
    })?;
    let modules = academic::list_modules(db).await.map_err(|e| {
        log::error!("render_register: {}", e);
        error::ErrorInternalServerError("DB error")
    })?;

    Ok(RegisterTemplate {
        client,
        form,
        errors,
        courses,
        modules,
        email_domain: config.email_domain,
        required_credits: config.required_credits,
    }
    .to_response())
}

#[get("/register")]
pub async fn view_register(client: ClientCtx) -> Result<HttpResponse, Error> {
    if client.is_user() {
        return Ok(crate::web::redirect("/"));
    }
    render_register(client, RegistrationForm::default(), FormErrors::new()).await
}

#[post("/register")]
pub async fn post_register(
    client: ClientCtx,
    cookies: actix_session::Session,
    body: web::Bytes,
) -> Result<impl Responder, Error> {
    let form = RegistrationForm::from_pairs(&FormPairs::parse(&body));
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let db = get_db_pool();
    let config = app_config::registration();
    let today = Utc::now().naive_utc().date();

    let checked = check_registration(db, &form, &config, today)
        .await
        .map_err(|e| {
            log::error!("post_register: {}", e);
            error::ErrorInternalServerError("DB error")
        })?;

    let new_user = match checked {
        Ok(new_user) => new_user,
        Err(errors) => {
            log::debug!("Registration rejected: {:?}", errors);
            let form = RegistrationForm {
                password: String::new(),
                password_confirm: String::new(),
                ..form
            };
            return render_register(client, form, errors).await;
        }
    };

    let created = create_account(db, &new_user).await.map_err(|e| {
        log::error!("post_register: create_account: {}", e);
        error::ErrorInternalServerError("Failed to create user")
    })?;
    let user = match created {
        Ok(user) => user,
        Err(errors) => {
            let form = RegistrationForm {
                password: String::new(),
                password_confirm: String::new(),
                ..form
            };
            return render_register(client, form, errors).await;
        }
    };

    session::login(db, &cookies, user.id).await?;

    Ok(crate::web::redirect("/"))
}
