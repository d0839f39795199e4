//! User management rules over the HTTP API.
//! Requires TEST_DATABASE_URL; each test returns early without it.

use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::{Value, json};

use formdesk::auth::password;
use formdesk::models::user::{self, Role};

mod common;
use common::{ADMIN_PASS, ADMIN_USER, USER_PASS, admin, create_form, create_user, login, setup_test_db, test_app};

#[tokio::test]
async fn superadmin_creates_users_with_hashed_passwords() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let f = create_form(pool, json!({ "name": "Generators" })).await;
    let app = test_app!(pool.clone(), db.config());
    let cookie = login!(app, ADMIN_USER, ADMIN_PASS);

    let req = test::TestRequest::post()
        .uri("/api/users")
        .cookie(cookie.clone())
        .set_json(json!({
            "username": "supervisor",
            "password": "Password1!",
            "role": "L2",
            "forms": [f.id.to_string()],
            "logs": ["form", "entry"]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["role"], "l2");
    assert!(created.get("password").is_none());

    let stored = user::find_by_username(pool, "supervisor").await.unwrap().unwrap();
    assert_ne!(stored.password, "Password1!");
    assert!(password::verify_password("Password1!", &stored.password).unwrap());

    // Duplicate username
    let req = test::TestRequest::post()
        .uri("/api/users")
        .cookie(cookie.clone())
        .set_json(json!({ "username": "supervisor", "password": "Password1!", "role": "l3" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    // Unknown form ids are rejected
    let req = test::TestRequest::post()
        .uri("/api/users")
        .cookie(cookie.clone())
        .set_json(json!({ "username": "op", "password": "Password1!", "role": "l3", "forms_view": ["99999"] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["details"][0], "forms_view: form '99999' does not exist");

    let req = test::TestRequest::get().uri("/api/users?role=l2").cookie(cookie).to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn l2_manages_only_l3_users() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    create_user(pool, "supervisor", Role::L2, &[], &[], &[]).await;
    let peer = create_user(pool, "peer", Role::L2, &[], &[], &[]).await;
    let operator = create_user(pool, "operator", Role::L3, &[], &[], &[]).await;
    let app = test_app!(pool.clone(), db.config());
    let cookie = login!(app, "supervisor", USER_PASS);

    let req = test::TestRequest::get().uri("/api/users").cookie(cookie.clone()).to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    let names: Vec<&str> = list.as_array().unwrap().iter().map(|u| u["username"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["operator"]);

    let req = test::TestRequest::post()
        .uri("/api/users")
        .cookie(cookie.clone())
        .set_json(json!({ "username": "boss", "password": "Password1!", "role": "superadmin" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{}", peer.id))
        .cookie(cookie.clone())
        .set_json(json!({ "nickname": "x" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    // Promoting an L3 beyond the actor's tier is refused
    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{}", operator.id))
        .cookie(cookie.clone())
        .set_json(json!({ "role": "l2" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{}", operator.id))
        .cookie(cookie.clone())
        .set_json(json!({ "nickname": "Night shift", "password": "NewPassword2" }))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["nickname"], "Night shift");
    let stored = user::find_by_id(pool, operator.id).await.unwrap().unwrap();
    assert!(password::verify_password("NewPassword2", &stored.password).unwrap());

    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/{}", operator.id))
        .cookie(cookie)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    assert!(user::find_by_id(pool, operator.id).await.unwrap().is_none());
}

#[tokio::test]
async fn l3_cannot_manage_users_and_nobody_deletes_themself() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    create_user(pool, "operator", Role::L3, &[], &[], &[]).await;
    let app = test_app!(pool.clone(), db.config());

    let op_cookie = login!(app, "operator", USER_PASS);
    let req = test::TestRequest::get().uri("/api/users").cookie(op_cookie.clone()).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    // Everyone can read their own profile
    let req = test::TestRequest::get().uri("/api/auth/me").cookie(op_cookie).to_request();
    let me: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(me["username"], "operator");

    let admin_user = admin(pool).await;
    let cookie = login!(app, ADMIN_USER, ADMIN_PASS);
    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/{}", admin_user.id))
        .cookie(cookie)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failed_logins_are_rate_limited() {
    let Some(db) = setup_test_db().await else { return };
    let app = test_app!(db.pool().clone(), db.config());

    let attempt = |password: &str| {
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "username": ADMIN_USER, "password": password }))
            .to_request()
    };
    for _ in 0..5 {
        let resp = test::call_service(&app, attempt("wrong-password")).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
    let resp = test::call_service(&app, attempt(ADMIN_PASS)).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn l2_cannot_grant_backup_or_log_access() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    create_user(pool, "supervisor", Role::L2, &[], &[], &[]).await;
    let operator = create_user(pool, "operator", Role::L3, &[], &[], &[]).await;
    let app = test_app!(pool.clone(), db.config());
    let cookie = login!(app, "supervisor", USER_PASS);

    let req = test::TestRequest::post()
        .uri("/api/users")
        .cookie(cookie.clone())
        .set_json(json!({ "username": "minion", "password": "Password1!", "role": "l3", "backupAllowed": true }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    assert!(user::find_by_username(pool, "minion").await.unwrap().is_none());

    let req = test::TestRequest::post()
        .uri("/api/users")
        .cookie(cookie.clone())
        .set_json(json!({ "username": "minion", "password": "Password1!", "role": "l3", "logs": ["user"] }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{}", operator.id))
        .cookie(cookie.clone())
        .set_json(json!({ "backupAllowed": true }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    assert!(!user::find_by_id(pool, operator.id).await.unwrap().unwrap().backup_allowed);

    // Sending back the unchanged values is still accepted
    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{}", operator.id))
        .cookie(cookie.clone())
        .set_json(json!({ "nickname": "Day shift", "backupAllowed": false, "logs": [] }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post().uri("/api/backups").cookie(login!(app, "operator", USER_PASS)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}
