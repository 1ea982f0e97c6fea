//! axum integration.
//!
//! - [`authenticate`]: middleware running [`AuthGate`] on every request,
//!   installed with `axum::middleware::from_fn_with_state(gate, authenticate)`
//! - [`Principal`] as an extractor: handlers that declare it require identity,
//!   handlers that declare `Option<Principal>` accept anonymous requests
//! - [`router`]: the `/auth/*` endpoints
//!
//! ## 繁體中文
//!
//! axum 整合：提供 middleware、`Principal` extractor 與 `/auth/*` 路由。

use axum::{
    Json, Router,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::{
    AuthContext, AuthError, AuthGate, AuthService, GateOutcome, LoginRequest, LoginResponse,
    Principal, Profile, SignupRequest,
};

// Rejection type for the extractor and the middleware: status + static body.
type AxumRejection = (StatusCode, &'static str);

fn unauthorized(body: &'static str) -> AxumRejection {
    (StatusCode::UNAUTHORIZED, body)
}

fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
}

/// Runs the gate and either terminates the request (revoked token) or passes
/// it on, with a [`Principal`] in its extensions when one was established.
pub async fn authenticate(State(gate): State<AuthGate>, mut req: Request, next: Next) -> Response {
    // 1) Copy out what the gate needs; the request is mutated afterwards.
    let path = req.uri().path().to_string();
    let authorization = authorization_header(req.headers()).map(str::to_string);

    // 2) Only a revoked token stops the request here. Missing or invalid
    //    tokens proceed anonymously and the handler decides.
    match gate.authenticate(&path, authorization.as_deref()).await {
        GateOutcome::Rejected => return unauthorized("Token revoked").into_response(),
        GateOutcome::Authenticated(principal) => {
            req.extensions_mut().insert(principal);
        }
        GateOutcome::Bypassed | GateOutcome::Unauthenticated(_) => {}
    }

    next.run(req).await
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AxumRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // The middleware is the only writer of this extension.
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| unauthorized("Unauthorized"))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, self.to_string()).into_response()
    }
}

async fn signup(
    State(service): State<AuthService>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, &'static str), AuthError> {
    service.signup(&request).await?;
    Ok((StatusCode::CREATED, "Signed up"))
}

async fn login(
    State(service): State<AuthService>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    Ok(Json(service.login(&request).await?))
}

async fn me(State(service): State<AuthService>, principal: Principal) -> Json<Profile> {
    Json(service.profile(&principal))
}

async fn logout(
    State(service): State<AuthService>,
    headers: HeaderMap,
) -> Result<&'static str, AuthError> {
    service.logout(authorization_header(&headers))?;
    Ok("Logged out")
}

/// `/auth/signup`, `/auth/login`, `/auth/me` and `/auth/logout`, behind the
/// gate.
pub fn router(ctx: AuthContext) -> Router {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
        .with_state(ctx.service)
        .layer(middleware::from_fn_with_state(ctx.gate, authenticate))
}
