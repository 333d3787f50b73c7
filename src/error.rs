// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// Fixed message returned when middleware composition itself breaks.
/// Signals a deployment/configuration defect, not a request-specific failure.
pub const NESTED_MIDDLEWARE_FAILURE: &str = "nested middleware failure";

/// Generic message for failures that must never leak internal detail.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal error";

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 429 Too Many Requests
    TooManyRequests(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (upstream issues)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::TooManyRequests(_) => 429,
            ApiError::InternalServerError(_) => 500,
            ApiError::BadGateway(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::TooManyRequests(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::BadGateway(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Convert to the wire envelope: { message, status }
    pub fn to_json(&self) -> Value {
        json!({
            "message": self.message(),
            "status": self.status_code(),
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        ApiError::TooManyRequests(message.into())
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

    /// Coerce any failure crossing an external boundary into an `ApiError`.
    ///
    /// Anything that is not already classified is logged at error level and
    /// replaced by a generic internal error; the original detail is never
    /// forwarded to the caller.
    pub fn coerce<E: std::fmt::Display>(err: E) -> Self {
        tracing::error!("unclassified failure at API boundary: {}", err);
        ApiError::internal_server_error(INTERNAL_ERROR_MESSAGE)
    }
}

// Convert domain error types to ApiError
impl From<crate::store::StoreError> for ApiError {
    fn from(err: crate::store::StoreError) -> Self {
        match err {
            crate::store::StoreError::Unavailable(msg) => {
                tracing::error!("store unavailable: {}", msg);
                ApiError::service_unavailable("storage temporarily unavailable")
            }
            crate::store::StoreError::Backend(msg) => {
                // Never expose backend detail to clients
                tracing::error!("store backend error: {}", msg);
                ApiError::internal_server_error(INTERNAL_ERROR_MESSAGE)
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON serialization error: {}", err);
        ApiError::internal_server_error(INTERNAL_ERROR_MESSAGE)
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
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_message_and_status() {
        let err = ApiError::too_many_requests("rate limit exceeded");
        let body = err.to_json();
        assert_eq!(body["message"], "rate limit exceeded");
        assert_eq!(body["status"], 429);
    }

    #[test]
    fn coerce_hides_original_detail() {
        let err = ApiError::coerce("connection reset by peer at 10.0.0.3");
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.message(), INTERNAL_ERROR_MESSAGE);
    }
}
