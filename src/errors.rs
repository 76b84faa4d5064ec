use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use thiserror::Error;

use crate::api::pages;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("request not found")]
    NotFound,

    /// Token unknown or its request already actioned. The two cases are
    /// deliberately indistinguishable to the link holder.
    #[error("request not found or already actioned")]
    StaleOrUnknownToken,

    #[error("invalid submission: {0}")]
    Validation(String),

    #[error("admin session required")]
    Unauthorized,

    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, title, msg) = match &self {
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                "Error",
                "This request was not found.".to_string(),
            ),
            AppError::StaleOrUnknownToken => (
                StatusCode::NOT_FOUND,
                "Error",
                "This request was not found or has already been actioned.".to_string(),
            ),
            AppError::Validation(reason) => (
                StatusCode::BAD_REQUEST,
                "Invalid Request",
                reason.clone(),
            ),
            AppError::Unauthorized => {
                return Redirect::to("/login").into_response();
            }
            AppError::Persistence(e) => {
                tracing::error!("Persistence error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error",
                    "Something went wrong. Please try again later.".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error",
                    "Something went wrong. Please try again later.".to_string(),
                )
            }
        };

        (status, pages::message(title, &msg)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_token_is_not_found() {
        let resp = AppError::StaleOrUnknownToken.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unauthorized_redirects_to_login() {
        let resp = AppError::Unauthorized.into_response();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()["location"], "/login");
    }

    #[test]
    fn test_store_failures_hide_details() {
        let err = AppError::from(StoreError::Io(std::io::Error::other("disk on fire")));
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_is_bad_request() {
        let resp = AppError::Validation("name is required".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
