//! Forum actions over HTTP for signed-in members: posting, replying, voting,
//! deleting, and the ownership and CSRF checks in front of them.
//!
//! The handlers read the global pool, which can only be installed once per
//! process, so everything here runs inside a single test.

mod common;

use actix_session::{storage::CookieSessionStore, Session, SessionMiddleware};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::ServiceResponse;
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App, HttpResponse};
use common::database::forum_score;
use common::fixtures::*;
use lounge::db::get_db_pool;
use lounge::forum;
use lounge::middleware::csrf::get_or_create_csrf_token;
use lounge::middleware::ClientCtx;
use lounge::orm::{forum_sections, forum_threads};
use lounge::score;
use lounge::session;

/// Starts a session for the user in the path and hands back the CSRF token.
async fn sign_in(cookies: Session, path: web::Path<i32>) -> Result<HttpResponse, actix_web::Error> {
    session::login(get_db_pool(), &cookies, path.into_inner()).await?;
    let token = get_or_create_csrf_token(&cookies)?;
    Ok(HttpResponse::Ok().body(token))
}

/// A signed-in browser: its session cookie and the CSRF token for it.
struct Member {
    id: i32,
    cookie: Cookie<'static>,
    csrf: String,
}

fn sign_in_request(user_id: i32) -> test::TestRequest {
    test::TestRequest::get().uri(&format!("/test-sign-in/{}", user_id))
}

async fn member_from(res: ServiceResponse, user_id: i32) -> Member {
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res
        .response()
        .cookies()
        .next()
        .expect("session cookie")
        .into_owned();
    let csrf = String::from_utf8(test::read_body(res).await.to_vec()).unwrap();

    Member {
        id: user_id,
        cookie,
        csrf,
    }
}

/// A form post from the member, carrying their CSRF token unless the fields
/// bring their own.
fn form_request(member: &Member, uri: &str, fields: &[(&str, &str)]) -> test::TestRequest {
    let mut form: Vec<(String, String)> = fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    if !fields.iter().any(|(k, _)| *k == "csrf_token") {
        form.push(("csrf_token".to_owned(), member.csrf.clone()));
    }
    test::TestRequest::post()
        .uri(uri)
        .cookie(member.cookie.clone())
        .set_form(&form)
}

fn location(res: &ServiceResponse) -> String {
    res.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

fn thread_path(section: &forum_sections::Model, thread: &forum_threads::Model) -> String {
    format!("{}/{}", section.url(), thread.url_slug)
}

#[actix_rt::test]
async fn test_member_forum_actions() {
    lounge::db::init_db("sqlite::memory:".to_owned()).await.unwrap();
    let db = get_db_pool();

    let alice = create_test_user(db, "Alice", "Smith").await.unwrap();
    let bob = create_test_user(db, "Bob", "Jones").await.unwrap();
    let section = create_test_section(db).await.unwrap();
    let thread = create_test_thread(db, section.id).await.unwrap();

    let app = test::init_service(
        App::new()
            .wrap(ClientCtx::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                    .cookie_secure(false)
                    .build(),
            )
            .route("/test-sign-in/{id}", web::get().to(sign_in))
            .configure(lounge::web::configure),
    )
    .await;

    let res = test::call_service(&app, sign_in_request(alice.id).to_request()).await;
    let alice = member_from(res, alice.id).await;
    let res = test::call_service(&app, sign_in_request(bob.id).to_request()).await;
    let bob = member_from(res, bob.id).await;

    let thread_url = thread_path(&section, &thread);

    // A new post lands on its own page and earns its author 5.
    let req = form_request(
        &alice,
        &thread_url,
        &[("title", "Past papers"), ("body", "Where can I find them?")],
    );
    let res = test::call_service(&app, req.to_request()).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    let post_url = location(&res);
    assert!(post_url.starts_with(&format!("{}/past-papers-", thread_url)));
    assert_eq!(forum_score(db, alice.id).await, Some(score::POST_WEIGHT));

    // A blank post is sent back to the form and scores nothing.
    let req = form_request(&alice, &thread_url, &[("title", "Nothing"), ("body", "   ")]);
    let res = test::call_service(&app, req.to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(forum_score(db, alice.id).await, Some(score::POST_WEIGHT));

    // A reply earns its author 3.
    let req = form_request(&bob, &post_url, &[("body", "On the library site.")]);
    let res = test::call_service(&app, req.to_request()).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), post_url);
    assert_eq!(forum_score(db, bob.id).await, Some(score::REPLY_WEIGHT));

    // Voting the same way twice takes the vote back.
    let vote_url = format!("{}/vote", post_url);
    let req = form_request(&bob, &vote_url, &[("direction", "up")]);
    let res = test::call_service(&app, req.to_request()).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(
        forum_score(db, alice.id).await,
        Some(score::POST_WEIGHT + score::UPVOTE_WEIGHT)
    );

    let req = form_request(&bob, &vote_url, &[("direction", "up")]);
    let res = test::call_service(&app, req.to_request()).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(forum_score(db, alice.id).await, Some(score::POST_WEIGHT));

    let req = form_request(&bob, &vote_url, &[("direction", "sideways")]);
    let res = test::call_service(&app, req.to_request()).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // A forged token is refused before anything is written.
    let req = form_request(
        &bob,
        &vote_url,
        &[("direction", "up"), ("csrf_token", "not-the-token")],
    );
    let res = test::call_service(&app, req.to_request()).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(forum_score(db, alice.id).await, Some(score::POST_WEIGHT));

    // Nobody deletes what they did not write.
    let post = forum::list_posts(db, thread.id)
        .await
        .unwrap()
        .into_iter()
        .map(|(post, _)| post)
        .find(|p| post_url.ends_with(&p.url_slug))
        .expect("created post");
    let reply = forum::list_replies(db, post.id)
        .await
        .unwrap()
        .into_iter()
        .map(|(reply, _)| reply)
        .next()
        .expect("created reply");

    let req = form_request(&bob, &format!("{}/delete", post_url), &[]);
    let res = test::call_service(&app, req.to_request()).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let reply_delete_url = format!("{}/replies/{}/delete", post_url, reply.url_slug);
    let req = form_request(&alice, &reply_delete_url, &[]);
    let res = test::call_service(&app, req.to_request()).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(forum_score(db, bob.id).await, Some(score::REPLY_WEIGHT));

    // The author may, and the reply under it goes too.
    let req = form_request(&alice, &format!("{}/delete", post_url), &[]);
    let res = test::call_service(&app, req.to_request()).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), thread_url);
    assert_eq!(forum_score(db, alice.id).await, Some(0));
    assert_eq!(forum_score(db, bob.id).await, Some(0));
    assert!(forum::find_post(db, thread.id, &post.url_slug)
        .await
        .unwrap()
        .is_none());
}
