//! Login checks, settings updates and password changes against the store

mod common;

use common::database::setup_test_database;
use common::fixtures::*;
use lounge::academic;
use lounge::orm::profiles::LeaderboardPrivacy;
use lounge::session;
use lounge::user::{self, ProfileSettings, DEFAULT_PROFILE_PIC};
use lounge::web::login::{login, LoginResult};

const DOMAIN: &str = "@exeter.ac.uk";

#[actix_rt::test]
async fn test_login_results() {
    let db = setup_test_database().await.unwrap();
    let jane = create_test_user(&db, "Jane", "Doe").await.unwrap();

    assert_eq!(
        login(&db, &jane.email, &jane.password, DOMAIN).await.unwrap(),
        LoginResult::Success(jane.id)
    );
    // Emails are matched case-insensitively.
    assert_eq!(
        login(&db, "JANE.DOE@exeter.ac.uk", &jane.password, DOMAIN)
            .await
            .unwrap(),
        LoginResult::Success(jane.id)
    );
    assert_eq!(
        login(&db, &jane.email, "wrong password", DOMAIN).await.unwrap(),
        LoginResult::BadCredentials
    );
    assert_eq!(
        login(&db, "nobody@exeter.ac.uk", &jane.password, DOMAIN)
            .await
            .unwrap(),
        LoginResult::BadCredentials
    );
    assert_eq!(
        login(&db, "jane.doe@gmail.com", &jane.password, DOMAIN)
            .await
            .unwrap(),
        LoginResult::WrongDomain
    );
}

#[actix_rt::test]
async fn test_password_change_ends_other_sessions() {
    let db = setup_test_database().await.unwrap();
    let jane = create_test_user(&db, "Jane", "Doe").await.unwrap();
    let john = create_test_user(&db, "John", "Smith").await.unwrap();

    let current = session::new_session(&db, jane.id).await.unwrap();
    let laptop = session::new_session(&db, jane.id).await.unwrap();
    let phone = session::new_session(&db, jane.id).await.unwrap();
    let johns = session::new_session(&db, john.id).await.unwrap();

    user::set_password(&db, jane.id, "a much better secret")
        .await
        .unwrap();
    let removed = session::remove_other_sessions(&db, jane.id, current)
        .await
        .unwrap();
    assert_eq!(removed, 2);

    assert!(session::find_session(&db, current).await.unwrap().is_some());
    assert!(session::find_session(&db, laptop).await.unwrap().is_none());
    assert!(session::find_session(&db, phone).await.unwrap().is_none());
    assert!(session::find_session(&db, johns).await.unwrap().is_some());

    assert_eq!(
        login(&db, &jane.email, "a much better secret", DOMAIN)
            .await
            .unwrap(),
        LoginResult::Success(jane.id)
    );
    assert_eq!(
        login(&db, &jane.email, &jane.password, DOMAIN).await.unwrap(),
        LoginResult::BadCredentials
    );
}

#[actix_rt::test]
async fn test_settings_replace_modules_and_privacy() {
    let db = setup_test_database().await.unwrap();
    let catalogue = create_test_catalogue(&db).await.unwrap();
    let jane = create_test_user(&db, "Jane", "Doe").await.unwrap();

    let by_code = |code: &str| {
        catalogue
            .modules
            .iter()
            .find(|m| m.code == code)
            .map(|m| m.id)
            .unwrap()
    };

    let first = ProfileSettings {
        course_id: catalogue.course.id,
        module_ids: vec![by_code("ECM1400"), by_code("ECM1410"), by_code("ECM1413")],
        leaderboard_privacy: LeaderboardPrivacy::FirstName,
        bio: "  Second year  ".to_string(),
        clear_profile_pic: false,
    };
    let profile = user::update_settings(&db, jane.id, &first).await.unwrap();
    assert_eq!(profile.course_id, Some(catalogue.course.id));
    assert_eq!(profile.leaderboard_privacy, LeaderboardPrivacy::FirstName);
    assert_eq!(profile.bio, "Second year");

    let second = ProfileSettings {
        module_ids: vec![by_code("ECM1400"), by_code("ECM1410"), by_code("ECM1415")],
        leaderboard_privacy: LeaderboardPrivacy::Hide,
        clear_profile_pic: true,
        ..first
    };
    let profile = user::update_settings(&db, jane.id, &second).await.unwrap();
    assert_eq!(profile.leaderboard_privacy, LeaderboardPrivacy::Hide);
    assert_eq!(profile.profile_pic, DEFAULT_PROFILE_PIC);

    let mut codes: Vec<String> = academic::modules_for_profile(&db, profile.id)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.code)
        .collect();
    codes.sort();
    assert_eq!(codes, ["ECM1400", "ECM1410", "ECM1415"]);
}
