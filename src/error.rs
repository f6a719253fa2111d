use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    planner::form::FormError,
    services::{api::ApiError, session::SessionError},
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Config(_) | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Api(ApiError::NotFound) | AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Api(ApiError::Unauthorized)
            | AppError::Session(SessionError::InvalidCredentials)
            | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Api(_) | AppError::Session(_) => StatusCode::BAD_GATEWAY,
            AppError::Form(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        }

        (status, self.to_string()).into_response()
    }
}
