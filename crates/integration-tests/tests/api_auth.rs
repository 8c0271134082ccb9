use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use integration_tests::{flash, form_post, init_app, location, login, register, session_cookie, Harness};

#[actix_web::test]
async fn register_redirects_to_login_with_message() {
    let harness = Harness::new().await;
    let app = init_app!(harness);

    let resp = test::call_service(
        &app,
        form_post("/register", &[("username", "alice"), ("password", "pw1")]).to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
    assert_eq!(flash(&resp).as_deref(), Some("Registration Successful! Please log in."));

    let stored = harness.state.repo.get_user_by_username("alice").await.unwrap().unwrap();
    assert_ne!(stored.password_hash, "pw1");
}

#[actix_web::test]
async fn duplicate_registration_is_rejected_and_keeps_original_password() {
    let harness = Harness::new().await;
    let app = init_app!(harness);
    register!(app, "alice", "pw1");

    let resp = test::call_service(
        &app,
        form_post("/register", &[("username", "alice"), ("password", "other")]).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("is already taken"));

    assert!(login!(app, "alice", "pw1").is_some());
    assert!(login!(app, "alice", "other").is_none());
}

#[actix_web::test]
async fn register_requires_username_and_password() {
    let harness = Harness::new().await;
    let app = init_app!(harness);

    for (fields, message) in [
        (vec![("username", "  "), ("password", "pw")], "Username is required."),
        (vec![("username", "carol"), ("password", "")], "Password is required."),
        (vec![("password", "pw")], "Username is required."),
    ] {
        let resp = test::call_service(&app, form_post("/register", &fields).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains(message), "expected {:?} in register page", message);
    }
    assert!(harness.state.repo.get_user_by_username("carol").await.unwrap().is_none());
}

#[actix_web::test]
async fn register_errors_keep_logged_in_navigation() {
    let harness = Harness::new().await;
    let app = init_app!(harness);
    register!(app, "alice", "pw1");
    let alice = login!(app, "alice", "pw1").unwrap();

    let resp = test::call_service(
        &app,
        form_post("/register", &[("username", "alice"), ("password", "pw9")])
            .cookie(alice)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("is already taken"));
    assert!(body.contains("href=\"/logout\""));
    assert!(body.contains("Profile (alice)"));
}

#[actix_web::test]
async fn login_failures_share_one_generic_message() {
    let harness = Harness::new().await;
    let app = init_app!(harness);
    register!(app, "alice", "pw1");

    for (username, password) in [("alice", "wrong"), ("nobody", "pw1")] {
        let resp = test::call_service(
            &app,
            form_post("/login", &[("username", username), ("password", password)]).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(session_cookie(&resp).is_none());
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("Login Unsuccessful. Check username and password."));
    }
}

#[actix_web::test]
async fn login_sets_http_only_session_and_redirects_home() {
    let harness = Harness::new().await;
    let app = init_app!(harness);
    register!(app, "alice", "pw1");

    let resp = test::call_service(
        &app,
        form_post("/login", &[("username", "alice"), ("password", "pw1")]).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");

    let cookie = session_cookie(&resp).expect("session cookie");
    assert_eq!(cookie.http_only(), Some(true));
    assert!(!cookie.value().contains("pw1"));

    let profile = test::call_service(
        &app,
        TestRequest::get().uri("/profile").cookie(cookie).to_request(),
    )
    .await;
    assert_eq!(profile.status(), StatusCode::OK);
}

#[actix_web::test]
async fn protected_routes_redirect_anonymous_users_to_login() {
    let harness = Harness::new().await;
    let app = init_app!(harness);

    let requests = vec![
        TestRequest::get().uri("/profile"),
        TestRequest::get().uri("/create"),
        TestRequest::get().uri("/logout"),
        TestRequest::get().uri("/like/1"),
        TestRequest::get().uri("/edit/1"),
        form_post("/edit/1", &[("title", "t"), ("content", "c")]),
        TestRequest::post().uri("/delete/1"),
    ];
    for req in requests {
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/login");
        assert_eq!(flash(&resp).as_deref(), Some("Please log in to access this page."));
    }
}

#[actix_web::test]
async fn tampered_session_is_treated_as_anonymous() {
    let harness = Harness::new().await;
    let app = init_app!(harness);
    register!(app, "alice", "pw1");
    let mut cookie = login!(app, "alice", "pw1").expect("session cookie");

    let forged = format!("{}x", cookie.value());
    cookie.set_value(forged);

    let resp = test::call_service(
        &app,
        TestRequest::get().uri("/profile").cookie(cookie).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
}

#[actix_web::test]
async fn logout_clears_session_cookie() {
    let harness = Harness::new().await;
    let app = init_app!(harness);
    register!(app, "alice", "pw1");
    let cookie = login!(app, "alice", "pw1").expect("session cookie");

    let resp = test::call_service(
        &app,
        TestRequest::get().uri("/logout").cookie(cookie).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");
    let cleared = session_cookie(&resp).expect("removal cookie");
    assert!(cleared.value().is_empty());
}

#[actix_web::test]
async fn public_pages_render_for_everyone() {
    let harness = Harness::new().await;
    let app = init_app!(harness);

    for uri in ["/", "/about", "/login", "/register"] {
        let resp = test::call_service(&app, TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {}", uri);
    }
}
