use axum::{
    Json,
    extract::multipart::MultipartError,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use neuroscan_model::Error;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportPolicy {
    Ignore,
    Report,
}

/// Error returned by every handler. Rendered as a JSON envelope carrying the
/// original message, mirrored in a top-level `detail` field that existing
/// clients read.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    public_code: &'static str,
    message: String,
    report_policy: ReportPolicy,
}

impl ApiError {
    fn new(
        status: StatusCode,
        public_code: &'static str,
        message: impl Into<String>,
        report_policy: ReportPolicy,
    ) -> Self {
        Self {
            status,
            public_code,
            message: message.into(),
            report_policy,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::error!("Internal error: {}", msg);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            msg,
            ReportPolicy::Report,
        )
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Not found: {}", msg);
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", msg, ReportPolicy::Ignore)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Bad request: {}", msg);
        Self::new(
            StatusCode::BAD_REQUEST,
            "BAD_REQUEST",
            msg,
            ReportPolicy::Ignore,
        )
    }

    fn server(public_code: &'static str, msg: String) -> Self {
        tracing::error!("{}: {}", public_code, msg);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            public_code,
            msg,
            ReportPolicy::Report,
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorEnvelope<'a> {
            detail: &'a str,
            error: ErrorBody<'a>,
        }

        #[derive(Serialize)]
        struct ErrorBody<'a> {
            code: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            id: Option<&'a str>,
            message: &'a str,
        }

        let error_id = (self.report_policy == ReportPolicy::Report)
            .then(|| uuid::Uuid::new_v4().to_string());

        let mut response = (
            self.status,
            Json(ErrorEnvelope {
                detail: &self.message,
                error: ErrorBody {
                    code: self.public_code,
                    id: error_id.as_deref(),
                    message: &self.message,
                },
            }),
        )
            .into_response();

        if let Some(id) = error_id.as_deref() {
            tracing::debug!(error_id = id, status = %self.status, "Reported error");
            if let Ok(v) = HeaderValue::from_str(id) {
                response.headers_mut().insert("x-error-id", v);
            }
        }

        response
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let msg = err.to_string();
        match err {
            Error::InvalidInput(_) => Self::bad_request(msg),
            Error::NotFound(_) => Self::not_found(msg),
            Error::ModelUnavailable | Error::ModelLoad(_) => {
                Self::server("MODEL_UNAVAILABLE", msg)
            }
            Error::Preprocessing(_) => Self::server("PREPROCESSING_ERROR", msg),
            Error::Prediction(_) => Self::server("PREDICTION_ERROR", msg),
            Error::Serialization(_) | Error::Io(_) | Error::Task(_) => Self::internal(msg),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        let status = err.status();
        let msg = format!("Invalid upload: {}", err.body_text());
        tracing::warn!("Multipart error ({}): {}", status, msg);
        let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "PAYLOAD_TOO_LARGE"
        } else {
            "BAD_REQUEST"
        };
        Self::new(status, code, msg, ReportPolicy::Ignore)
    }
}

impl std::error::Error for ApiError {}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.public_code)
    }
}

#[macro_export]
macro_rules! not_found {
    ($($arg:tt)*) => { $crate::error::ApiError::not_found(format!($($arg)*)) };
}

#[macro_export]
macro_rules! bad_request {
    ($($arg:tt)*) => { $crate::error::ApiError::bad_request(format!($($arg)*)) };
}
