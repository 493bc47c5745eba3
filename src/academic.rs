//! College, department, course and module directory.

use crate::orm::{colleges, courses, departments, modules, profile_modules};
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr};

pub async fn list_colleges<C: ConnectionTrait>(db: &C) -> Result<Vec<colleges::Model>, DbErr> {
    colleges::Entity::find()
        .order_by_asc(colleges::Column::Name)
        .all(db)
        .await
}

pub async fn list_departments<C: ConnectionTrait>(
    db: &C,
) -> Result<Vec<departments::Model>, DbErr> {
    departments::Entity::find()
        .order_by_asc(departments::Column::Name)
        .all(db)
        .await
}

pub async fn list_courses<C: ConnectionTrait>(db: &C) -> Result<Vec<courses::Model>, DbErr> {
    courses::Entity::find()
        .order_by_asc(courses::Column::Title)
        .all(db)
        .await
}

pub async fn list_modules<C: ConnectionTrait>(db: &C) -> Result<Vec<modules::Model>, DbErr> {
    modules::Entity::find()
        .order_by_asc(modules::Column::Code)
        .all(db)
        .await
}

pub async fn course_by_title<C: ConnectionTrait>(
    db: &C,
    title: &str,
) -> Result<Option<courses::Model>, DbErr> {
    courses::Entity::find()
        .filter(courses::Column::Title.eq(title))
        .one(db)
        .await
}

/// Looks up modules by code. Unknown codes are simply absent from the result.
pub async fn modules_by_codes<C: ConnectionTrait>(
    db: &C,
    codes: &[String],
) -> Result<Vec<modules::Model>, DbErr> {
    if codes.is_empty() {
        return Ok(Vec::new());
    }
    modules::Entity::find()
        .filter(modules::Column::Code.is_in(codes.iter().cloned()))
        .order_by_asc(modules::Column::Code)
        .all(db)
        .await
}

/// Modules currently linked to a profile.
pub async fn modules_for_profile<C: ConnectionTrait>(
    db: &C,
    profile_id: i32,
) -> Result<Vec<modules::Model>, DbErr> {
    let ids: Vec<i32> = profile_modules::Entity::find()
        .filter(profile_modules::Column::ProfileId.eq(profile_id))
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.module_id)
        .collect();

    if ids.is_empty() {
        return Ok(Vec::new());
    }

    modules::Entity::find()
        .filter(modules::Column::Id.is_in(ids))
        .order_by_asc(modules::Column::Code)
        .all(db)
        .await
}

pub fn sum_credits(modules: &[modules::Model]) -> i32 {
    modules.iter().map(|m| m.credits).sum()
}

/// A student must pick modules worth exactly `required` credits.
pub fn validate_credits(modules: &[modules::Model], required: i32) -> Result<(), String> {
    let credits = sum_credits(modules);
    if credits == required {
        Ok(())
    } else {
        Err(format!(
            "You must take {} credits of modules (not {}).",
            required, credits
        ))
    }
}

/// Replaces the profile's module set.
pub async fn set_profile_modules<C: ConnectionTrait>(
    db: &C,
    profile_id: i32,
    module_ids: &[i32],
) -> Result<(), DbErr> {
    profile_modules::Entity::delete_many()
        .filter(profile_modules::Column::ProfileId.eq(profile_id))
        .exec(db)
        .await?;

    let mut seen = Vec::with_capacity(module_ids.len());
    for module_id in module_ids {
        if seen.contains(module_id) {
            continue;
        }
        seen.push(*module_id);
        profile_modules::ActiveModel {
            profile_id: Set(profile_id),
            module_id: Set(*module_id),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(code: &str, credits: i32) -> modules::Model {
        modules::Model {
            id: 0,
            code: code.to_owned(),
            title: format!("Module {}", code),
            year: 1,
            credits,
            convenor: String::new(),
            descriptor_url: String::new(),
            fch_available: false,
            department_id: 1,
        }
    }

    #[test]
    fn test_exact_credits_pass() {
        let picked = vec![
            module("ECM1400", 15),
            module("ECM1410", 15),
            module("ECM1413", 30),
            module("ECM1414", 60),
        ];
        assert_eq!(sum_credits(&picked), 120);
        assert!(validate_credits(&picked, 120).is_ok());
    }

    #[test]
    fn test_wrong_credits_message() {
        let picked = vec![module("ECM1400", 15), module("ECM1410", 30)];
        assert_eq!(
            validate_credits(&picked, 120).unwrap_err(),
            "You must take 120 credits of modules (not 45)."
        );
        assert!(validate_credits(&[], 120).is_err());
    }

    #[test]
    fn test_too_many_credits_rejected() {
        let picked = vec![module("A", 60), module("B", 60), module("C", 15)];
        assert!(validate_credits(&picked, 120).is_err());
    }
}
