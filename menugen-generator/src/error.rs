use axum::{http::StatusCode, response::Json};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("theme not found: {0}")]
    ThemeNotFound(String),
    #[error("page not published: {org_id}/{theme}")]
    PageNotFound { org_id: i32, theme: String },
    #[error("{0}")]
    InvalidRequest(String),
    #[error("theme source unavailable: {0}")]
    ThemeSource(String),
    #[error("failed to render page: {0}")]
    Render(#[from] askama::Error),
    #[error("failed to write page: {0}")]
    Io(#[from] std::io::Error),
}

impl GeneratorError {
    pub fn status(&self) -> StatusCode {
        match self {
            GeneratorError::ThemeNotFound(_) | GeneratorError::PageNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            GeneratorError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GeneratorError::ThemeSource(_) => StatusCode::SERVICE_UNAVAILABLE,
            GeneratorError::Render(_) | GeneratorError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for GeneratorError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let error_message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(cause = %self, "Page generation failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": error_message }))).into_response()
    }
}
