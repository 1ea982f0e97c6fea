#![cfg(feature = "axum")]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::get,
};
use chrono::{Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use plant_auth::{
    AuthConfig, AuthContext, InMemoryCredentialStore, ManualClock, Principal, Profile,
    axum_support,
};
use std::sync::Arc;
use tower::ServiceExt;

type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

const SECRET: &str = "c2lrZ3Utc2lrZ3Utc2lrZ3Utc2lrZ3Utc2lrZ3Utc2lrZ3U=";

fn context(clock: Arc<ManualClock>) -> AuthContext {
    let store = Arc::new(InMemoryCredentialStore::new());
    AuthContext::from_config(&AuthConfig::new(SECRET), store, clock).unwrap()
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ))
}

async fn body_string(resp: axum::response::Response) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let bytes = resp
        .into_body()
        .collect()
        .await
        .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })?
        .to_bytes();
    Ok(String::from_utf8(bytes.to_vec())?)
}

fn json_post(uri: &str, body: &str) -> Result<Request<Body>, axum::http::Error> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
}

async fn signup_and_login(app: &Router) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let creds = r#"{"email":"user@example.com","password":"pw"}"#;

    let resp = app
        .clone()
        .oneshot(json_post("/auth/signup", creds)?)
        .await
        .map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .clone()
        .oneshot(json_post("/auth/login", creds)?)
        .await
        .map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&body_string(resp).await?)?;
    Ok(body["token"]
        .as_str()
        .ok_or("login response without token")?
        .to_string())
}

fn get_with_token(uri: &str, token: &str) -> Result<Request<Body>, axum::http::Error> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
}

#[tokio::test]
async fn protected_route_without_token() -> TestResult {
    let app = axum_support::router(context(clock()));

    let req = Request::builder().uri("/auth/me").body(Body::empty())?;
    let resp = app.oneshot(req).await.map_err(|e| match e {})?;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(resp).await?, "Unauthorized");
    Ok(())
}

#[tokio::test]
async fn protected_route_with_invalid_token() -> TestResult {
    let app = axum_support::router(context(clock()));

    let resp = app
        .oneshot(get_with_token("/auth/me", "invalid-token-xyz")?)
        .await
        .map_err(|e| match e {})?;

    // Not rejected by the gate; the handler refuses for lack of identity.
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(resp).await?, "Unauthorized");
    Ok(())
}

#[tokio::test]
async fn login_me_logout_flow() -> TestResult {
    let app = axum_support::router(context(clock()));
    let token = signup_and_login(&app).await?;

    let resp = app
        .clone()
        .oneshot(get_with_token("/auth/me", &token)?)
        .await
        .map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::OK);
    let profile: Profile = serde_json::from_str(&body_string(resp).await?)?;
    assert_eq!(profile.email, "user@example.com");
    assert_eq!(profile.authorities, vec!["ROLE_USER"]);

    let logout = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())?;
    let resp = app.clone().oneshot(logout).await.map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(get_with_token("/auth/me", &token)?)
        .await
        .map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(resp).await?, "Token revoked");
    Ok(())
}

#[tokio::test]
async fn logout_without_bearer_is_bad_request() -> TestResult {
    let app = axum_support::router(context(clock()));

    let req = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .body(Body::empty())?;
    let resp = app.clone().oneshot(req).await.map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .header(header::AUTHORIZATION, "raw-token-without-scheme")
        .body(Body::empty())?;
    let resp = app.oneshot(req).await.map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn wrong_password_and_duplicate_signup() -> TestResult {
    let app = axum_support::router(context(clock()));
    signup_and_login(&app).await?;

    let resp = app
        .clone()
        .oneshot(json_post(
            "/auth/login",
            r#"{"email":"user@example.com","password":"nope"}"#,
        )?)
        .await
        .map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .oneshot(json_post(
            "/auth/signup",
            r#"{"email":"user@example.com","password":"pw"}"#,
        )?)
        .await
        .map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn expired_token_is_treated_as_anonymous() -> TestResult {
    let clock = clock();
    let app = axum_support::router(context(clock.clone()));
    let token = signup_and_login(&app).await?;

    clock.advance(Duration::hours(10) + Duration::seconds(1));

    let resp = app
        .oneshot(get_with_token("/auth/me", &token)?)
        .await
        .map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(resp).await?, "Unauthorized");
    Ok(())
}

#[tokio::test]
async fn optional_principal_on_custom_route() -> TestResult {
    async fn greeting(user: Option<Principal>) -> impl IntoResponse {
        match user {
            Some(user) => format!("Hello, {}", user.subject),
            None => "Hello, guest".to_string(),
        }
    }

    let clock = clock();
    let ctx = context(clock);
    let token = {
        let auth = axum_support::router(ctx.clone());
        signup_and_login(&auth).await?
    };
    let app = Router::new()
        .route("/greeting", get(greeting))
        .layer(middleware::from_fn_with_state(
            ctx.gate.clone(),
            axum_support::authenticate,
        ));

    let req = Request::builder().uri("/greeting").body(Body::empty())?;
    let resp = app.clone().oneshot(req).await.map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await?, "Hello, guest");

    let resp = app
        .clone()
        .oneshot(get_with_token("/greeting", &token)?)
        .await
        .map_err(|e| match e {})?;
    assert_eq!(body_string(resp).await?, "Hello, user@example.com");

    ctx.revocations.revoke(&token);
    let resp = app
        .oneshot(get_with_token("/greeting", &token)?)
        .await
        .map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
