//! actix-web integration.
//!
//! - [`authenticate`]: middleware running [`AuthGate`] on every request,
//!   installed with `.wrap(actix_web::middleware::from_fn(authenticate))`.
//!   The gate must be registered with `.app_data(web::Data::new(gate))`.
//! - [`Principal`] as an extractor: handlers that declare it require identity,
//!   handlers that declare `Option<Principal>` accept anonymous requests.
//!
//! Failure modes:
//! - 500: gate is missing from `app_data`
//! - 401 "Token revoked": the bearer token was logged out (middleware)
//! - 401 "Unauthorized": no identity on a handler that requires one
//!
//! ## 繁體中文
//!
//! actix-web 整合。middleware 會對每個請求執行 gate：被註銷的 token 直接回 401，
//! 驗證成功則將 [`Principal`] 放入 request extensions；handler 宣告 [`Principal`]
//! 參數即要求身分。需先以 `.app_data(web::Data::new(gate))` 註冊 gate。

use std::future::{Ready, ready};

use actix_web::{
    FromRequest, HttpMessage, HttpRequest, HttpResponse, ResponseError,
    body::{BoxBody, MessageBody},
    dev::{Payload, ServiceRequest, ServiceResponse},
    error::{ErrorInternalServerError, ErrorUnauthorized},
    http::{StatusCode, header},
    middleware::Next,
    web,
};

use crate::{AuthError, AuthGate, GateOutcome, Principal};

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Runs the gate and either terminates the request (revoked token) or passes
/// it on, with a [`Principal`] in its extensions when one was established.
///
/// ## 繁體中文
///
/// 執行 gate：被註銷的 token 直接回 401，其餘請求繼續處理；驗證成功時會附上
/// [`Principal`]。
pub async fn authenticate(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, actix_web::Error> {
    // 1) The gate lives in app data; clone the handle out of the request.
    let Some(gate) = req.app_data::<web::Data<AuthGate>>().cloned() else {
        return Err(ErrorInternalServerError("Auth gate not found"));
    };
    // 2) Own the path and header; the request is mutated afterwards.
    let path = req.path().to_string();
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    // 3) Only a revoked token stops the request here.
    match gate.authenticate(&path, authorization.as_deref()).await {
        GateOutcome::Rejected => {
            let response = HttpResponse::Unauthorized().body("Token revoked");
            return Ok(req.into_response(response));
        }
        GateOutcome::Authenticated(principal) => {
            req.extensions_mut().insert(principal);
        }
        GateOutcome::Bypassed | GateOutcome::Unauthenticated(_) => {}
    }

    Ok(next.call(req).await?.map_into_boxed_body())
}

impl FromRequest for Principal {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // The middleware is the only writer of this extension.
        match req.extensions().get::<Principal>() {
            Some(principal) => ready(Ok(principal.clone())),
            None => ready(Err(ErrorUnauthorized("Unauthorized"))),
        }
    }
}
