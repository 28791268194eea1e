//! Some helper functions for the API.

use crate::config::{ApiConfig, CorsPolicy};
use phrase_ranker_common::error::{ErrorKind, RankerError};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::request::Request;
use rocket::response::Response;
use rocket::response::status as rocket_status;
use rocket::serde::json::{Error as JsonError, Json};
use rocket::serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Clone, Copy)]
pub struct RequestTimingFairing;

#[rocket::async_trait]
impl Fairing for RequestTimingFairing {
    fn info(&self) -> Info {
        Info {
            name: "Request timing",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _data: &mut rocket::Data<'_>) {
        request.local_cache(Instant::now);
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let started_at = request.local_cache(Instant::now);
        let elapsed = started_at.elapsed();
        let status = response.status().code;

        tracing::info!(
            method = %request.method(),
            path = %request.uri(),
            status = status,
            elapsed_ms = elapsed.as_millis(),
            "Request Completed"
        );
    }
}

#[derive(Clone)]
pub struct CorsFairing {
    policy: CorsPolicy,
}

impl CorsFairing {
    pub fn new(policy: CorsPolicy) -> Self {
        Self { policy }
    }
}

#[rocket::async_trait]
impl Fairing for CorsFairing {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let origin = request.headers().get_one("Origin");
        let Some(allowed) = self.policy.allowed_origin(origin) else {
            return;
        };

        if allowed != "*" {
            response.set_header(Header::new("Vary", "Origin"));
            response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
        }
        response.set_header(Header::new("Access-Control-Allow-Origin", allowed));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "Content-Type"));
        response.set_header(Header::new("Access-Control-Max-Age", "86400"));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    NotFound,
    BadRequest,
    NotEnoughData,
    Conflict,
    UnprocessableEntity,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ApiErrorBody {
    error: ApiErrorKind,
    message: String,
}

impl ApiErrorBody {
    fn new(error: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            error,
            message: message.into(),
        }
    }
}

pub type ApiError = rocket_status::Custom<Json<ApiErrorBody>>;
pub type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: Status, kind: ApiErrorKind, message: impl Into<String>) -> ApiError {
    rocket_status::Custom(status, Json(ApiErrorBody::new(kind, message)))
}

pub fn not_found_error(message: impl Into<String>) -> ApiError {
    api_error(Status::NotFound, ApiErrorKind::NotFound, message)
}

pub fn bad_request_error(message: impl Into<String>) -> ApiError {
    api_error(Status::BadRequest, ApiErrorKind::BadRequest, message)
}

pub fn not_enough_data_error(message: impl Into<String>) -> ApiError {
    api_error(Status::Conflict, ApiErrorKind::NotEnoughData, message)
}

pub fn conflict_error(message: impl Into<String>) -> ApiError {
    api_error(Status::Conflict, ApiErrorKind::Conflict, message)
}

pub fn internal_error(message: impl Into<String>) -> ApiError {
    api_error(Status::InternalServerError, ApiErrorKind::Internal, message)
}

/// Map a service error onto a status and body.
/// Store failures only carry their details in development mode.
pub fn ranker_error(err: RankerError, config: &ApiConfig) -> ApiError {
    match err.kind() {
        ErrorKind::Validation => bad_request_error(err.to_string()),
        ErrorKind::NotFound => not_found_error(err.to_string()),
        ErrorKind::NotEnoughData => not_enough_data_error(err.to_string()),
        ErrorKind::Conflict => {
            tracing::warn!(error = %err, "Comparison abandoned after repeated conflicts");
            conflict_error(err.to_string())
        }
        ErrorKind::Store => {
            tracing::error!(error = %err, "Store error");
            if config.is_development() {
                internal_error(err.to_string())
            } else {
                internal_error("Database error, please check your database configuration")
            }
        }
    }
}

/// Reject a body that could not be read or parsed as the expected JSON.
pub fn json_body_error(err: &JsonError<'_>) -> ApiError {
    match err {
        JsonError::Io(e) => bad_request_error(format!("Could not read request body: {e}")),
        JsonError::Parse(_, e) => bad_request_error(format!("Invalid JSON body: {e}")),
    }
}

#[catch(404)]
pub fn not_found(request: &Request) -> Json<ApiErrorBody> {
    Json(ApiErrorBody::new(
        ApiErrorKind::NotFound,
        format!("The requested resource {} could not be found.", request.uri()),
    ))
}

#[catch(422)]
pub fn unprocessable_entity(_request: &Request) -> Json<ApiErrorBody> {
    Json(ApiErrorBody::new(
        ApiErrorKind::UnprocessableEntity,
        "The request was well-formed but could not be processed.",
    ))
}

#[catch(500)]
pub fn internal_server_error(_request: &Request) -> Json<ApiErrorBody> {
    Json(ApiErrorBody::new(
        ApiErrorKind::Internal,
        "An internal server error occurred.",
    ))
}

#[catch(default)]
pub fn default_catcher(status: Status, _request: &Request) -> ApiError {
    let kind = if status.code < 500 {
        ApiErrorKind::BadRequest
    } else {
        ApiErrorKind::Internal
    };
    api_error(status, kind, status.reason_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppEnv;

    fn config(app_env: AppEnv) -> ApiConfig {
        ApiConfig {
            app_env,
            cors: CorsPolicy::AllowAll,
            database_url: None,
            pool_size: 1,
        }
    }

    #[test]
    fn test_ranker_error_status() {
        let production = config(AppEnv::Production);
        let cases = [
            (RankerError::Validation("bad".to_string()), Status::BadRequest),
            (RankerError::NotFound(4), Status::NotFound),
            (RankerError::NotEnoughData { available: 1 }, Status::Conflict),
            (RankerError::Conflict("busy".to_string()), Status::Conflict),
            (RankerError::Store("down".to_string()), Status::InternalServerError),
        ];
        for (err, status) in cases {
            assert_eq!(ranker_error(err, &production).0, status);
        }
    }

    #[test]
    fn test_store_error_details_only_in_development() {
        let err = RankerError::Store("connection refused".to_string());

        let body = ranker_error(err.clone(), &config(AppEnv::Production)).1;
        assert!(!body.message.contains("connection refused"));
        assert_eq!(body.error, ApiErrorKind::Internal);

        let body = ranker_error(err, &config(AppEnv::Development)).1;
        assert!(body.message.contains("connection refused"));
    }
}
