//! actix-web flavour of the plant-auth server.
//!
//! Same endpoints as the axum binary. The gate middleware wraps every route;
//! `/auth/me` requires identity by declaring a [`Principal`] parameter.
//!
//! ```bash
//! PLANT_AUTH_SECRET=$(head -c 32 /dev/urandom | base64) \
//!   cargo run --bin actix_main --features actix
//! ```

use std::sync::Arc;

use actix_web::{
    App, HttpRequest, HttpResponse, HttpServer, get, http::header, middleware::from_fn, post, web,
};
use plant_auth::{
    AuthConfig, AuthContext, AuthError, AuthService, InMemoryCredentialStore, LoginRequest,
    Principal, SignupRequest, SystemClock, actix_support,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[post("/auth/signup")]
async fn do_signup(
    service: web::Data<AuthService>,
    body: web::Json<SignupRequest>,
) -> Result<HttpResponse, AuthError> {
    service.signup(&body).await?;
    Ok(HttpResponse::Created().body("Signed up"))
}

#[post("/auth/login")]
async fn do_login(
    service: web::Data<AuthService>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AuthError> {
    let response = service.login(&body).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[get("/auth/me")]
async fn do_me(service: web::Data<AuthService>, principal: Principal) -> HttpResponse {
    HttpResponse::Ok().json(service.profile(&principal))
}

#[post("/auth/logout")]
async fn do_logout(
    service: web::Data<AuthService>,
    req: HttpRequest,
) -> Result<HttpResponse, AuthError> {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    service.logout(authorization)?;
    Ok(HttpResponse::Ok().body("Logged out"))
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AuthConfig::from_env()?;
    let credentials = Arc::new(InMemoryCredentialStore::new());
    let ctx = AuthContext::from_config(&config, credentials, Arc::new(SystemClock))?;
    let sweeper = ctx.revocations.spawn_sweeper(config.sweep_interval());

    // Shared across workers: every clone points at the same cache and store.
    let gate = web::Data::new(ctx.gate.clone());
    let service = web::Data::new(ctx.service.clone());

    info!(addr = %config.bind_addr, "plant-auth actix server started");
    HttpServer::new(move || {
        App::new()
            .app_data(gate.clone())
            .app_data(service.clone())
            .wrap(from_fn(actix_support::authenticate))
            .service(do_signup)
            .service(do_login)
            .service(do_me)
            .service(do_logout)
    })
    .bind(config.bind_addr.as_str())?
    .run()
    .await?;

    sweeper.abort();
    Ok(())
}
