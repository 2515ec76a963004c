// HTTP API Error Types
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use sqlx::postgres::PgDatabaseError;

use crate::auth::AuthError;
use crate::database::manager::DatabaseError;
use crate::filter::FilterError;
use crate::services::geocoder::GeocodeError;
use crate::services::mailer::MailError;
use crate::services::photos::PhotoError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        errors: Vec<String>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (external service issues)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

pub const NOT_AUTHORIZED: &str = "Not Authorized To Access This Route";
const INTERNAL: &str = "Internal Server Error!";

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::PayloadTooLarge(_) => 413,
            ApiError::InternalServerError(_) => 500,
            ApiError::BadGateway(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::PayloadTooLarge(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::BadGateway(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let status_code = self.status_code();
        let mut body = json!({
            "success": false,
            "status": if status_code < 500 { "fail" } else { "error" },
            "statusCode": status_code,
            "code": self.error_code(),
            "message": self.message(),
        });
        if let ApiError::ValidationError { errors, .. } = self {
            body["errors"] = json!(errors);
        }
        body
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(errors: Vec<String>) -> Self {
        ApiError::ValidationError {
            message: "Invalid data".to_string(),
            errors,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_authorized() -> Self {
        ApiError::Unauthorized(NOT_AUTHORIZED.to_string())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    /// `<Resource> not found with id of <id>`
    pub fn resource_not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        ApiError::NotFound(format!("{} not found with id of {}", resource, id))
    }

    /// Logs `detail` and hides it from the client outside development
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", detail);
        if crate::is_development!() {
            ApiError::InternalServerError(detail.to_string())
        } else {
            ApiError::InternalServerError(INTERNAL.to_string())
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

/// Parse a path id, answering `Invalid id: <value>` when it is not a UUID
pub fn parse_id(raw: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid id: {}", raw)))
}

// Convert other error types to ApiError
impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        if let Some(state) = err.sql_state() {
            return match state.as_str() {
                // unique_violation
                "23505" => {
                    let value = duplicate_value(&err);
                    match value {
                        Some(v) => ApiError::bad_request(format!(
                            "Duplicate field value: '{}', Please use another value",
                            v
                        )),
                        None => ApiError::bad_request("Duplicate field value entered, Please use another value"),
                    }
                }
                // foreign_key_violation
                "23503" => ApiError::bad_request("Referenced resource does not exist"),
                // not_null_violation, check_violation
                "23502" | "23514" => ApiError::bad_request(format!(
                    "Invalid data{}",
                    err.constraint().map(|c| format!(": {}", c)).unwrap_or_default()
                )),
                // invalid_text_representation, datetime and numeric range errors
                "22P02" | "22007" | "22008" | "22003" => ApiError::bad_request("Invalid input value"),
                _ => ApiError::internal(err),
            };
        }

        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database misconfigured: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Migrate(e) => {
                tracing::error!("Migration error: {}", e);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            DatabaseError::Sqlx(sqlx::Error::RowNotFound) => ApiError::not_found("Resource not found"),
            DatabaseError::Sqlx(
                e @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_)),
            ) => {
                tracing::error!("Database unavailable: {}", e);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            other => ApiError::internal(other),
        }
    }
}

/// `Key (email)=(a@b.c) already exists.` -> `a@b.c`
fn duplicate_value(err: &DatabaseError) -> Option<String> {
    let DatabaseError::Sqlx(sqlx::Error::Database(db)) = err else {
        return None;
    };
    let detail = db.try_downcast_ref::<PgDatabaseError>()?.detail()?;
    let start = detail.find(")=(")? + 3;
    let end = detail.rfind(')')?;
    (end > start).then(|| detail[start..end].to_string())
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken(_) | AuthError::UserNotFound => {
                tracing::warn!("Rejected credentials: {}", err);
                ApiError::not_authorized()
            }
            AuthError::InvalidCredentials => ApiError::unauthorized("Invalid credentials."),
            AuthError::Hashing(_) | AuthError::Signing(_) => ApiError::internal(err),
        }
    }
}

impl From<GeocodeError> for ApiError {
    fn from(err: GeocodeError) -> Self {
        tracing::error!("Geocoder failure: {}", err);
        ApiError::bad_gateway("Geocoding service unavailable")
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        tracing::error!("Mail delivery failure: {}", err);
        ApiError::internal_server_error("Email could not be sent")
    }
}

impl From<PhotoError> for ApiError {
    fn from(err: PhotoError) -> Self {
        match err {
            PhotoError::NotAnImage => ApiError::bad_request("File must be an image"),
            PhotoError::TooLarge { max_bytes } => {
                ApiError::bad_request(format!("File cannot be more than {} KB", max_bytes / 1000))
            }
            PhotoError::Io(e) => {
                tracing::error!("Photo storage error: {}", e);
                ApiError::internal_server_error("Something went wrong with storing the photo")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge(rejection.body_text());
        }
        ApiError::InvalidJson(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
