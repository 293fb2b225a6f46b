use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ApiError,
}

#[derive(Debug, Clone, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Account disabled")]
    AccountDisabled,
    #[error("Email already registered")]
    EmailTaken,
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
    #[error("Insufficient permissions")]
    Forbidden,
    #[error("Not found")]
    NotFound,
    #[error("Too many requests")]
    RateLimited,
    #[error("Service unavailable")]
    Unavailable,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::Validation(_) => StatusCode::BAD_REQUEST,
            ApiErrorCode::InvalidCredentials
            | ApiErrorCode::Unauthenticated
            | ApiErrorCode::TokenExpired
            | ApiErrorCode::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
            ApiErrorCode::AccountDisabled | ApiErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorCode::EmailTaken => StatusCode::CONFLICT,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    if let Some(code) = err.find::<ApiErrorCode>() {
        let body = ErrorBody {
            error: ApiError {
                code: code.clone(),
                message: code.to_string(),
            },
        };
        Ok(warp::reply::with_status(
            warp::reply::json(&body),
            code.status(),
        ))
    } else if err.find::<warp::body::BodyDeserializeError>().is_some()
        || err.find::<reject::InvalidQuery>().is_some()
    {
        let body = ErrorBody {
            error: ApiError {
                code: ApiErrorCode::Validation("malformed request".to_string()),
                message: "malformed request".to_string(),
            },
        };
        Ok(warp::reply::with_status(
            warp::reply::json(&body),
            StatusCode::BAD_REQUEST,
        ))
    } else if err.find::<reject::MissingHeader>().is_some() {
        let body = ErrorBody {
            error: ApiError {
                code: ApiErrorCode::Unauthenticated,
                message: ApiErrorCode::Unauthenticated.to_string(),
            },
        };
        Ok(warp::reply::with_status(
            warp::reply::json(&body),
            StatusCode::UNAUTHORIZED,
        ))
    } else if err.is_not_found() {
        let body = ErrorBody {
            error: ApiError {
                code: ApiErrorCode::NotFound,
                message: "Route not found".to_string(),
            },
        };
        Ok(warp::reply::with_status(
            warp::reply::json(&body),
            StatusCode::NOT_FOUND,
        ))
    } else {
        let body = ErrorBody {
            error: ApiError {
                code: ApiErrorCode::InternalError,
                message: format!("Unhandled error: {err:?}"),
            },
        };
        Ok(warp::reply::with_status(
            warp::reply::json(&body),
            StatusCode::INTERNAL_SERVER_ERROR,
        ))
    }
}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Unauthenticated => ApiErrorCode::Unauthenticated,
            AuthError::Expired => ApiErrorCode::TokenExpired,
            AuthError::Invalid => ApiErrorCode::InvalidRefreshToken,
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::AccountDisabled => ApiErrorCode::AccountDisabled,
            AuthError::EmailTaken => ApiErrorCode::EmailTaken,
            AuthError::Validation(message) => ApiErrorCode::Validation(message),
            AuthError::Unavailable(e) => {
                warn!("auth dependency unavailable: {}", e);
                ApiErrorCode::Unavailable
            }
            AuthError::Internal(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<ListingError> for ApiErrorCode {
    fn from(error: ListingError) -> Self {
        match error {
            ListingError::NotFound => ApiErrorCode::NotFound,
            ListingError::Forbidden => ApiErrorCode::Forbidden,
            ListingError::Unavailable(e) => {
                warn!("listing store unavailable: {}", e);
                ApiErrorCode::Unavailable
            }
            ListingError::Internal(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<ProfileError> for ApiErrorCode {
    fn from(error: ProfileError) -> Self {
        match error {
            ProfileError::NotFound => ApiErrorCode::NotFound,
            ProfileError::Unavailable(e) => {
                warn!("profile store unavailable: {}", e);
                ApiErrorCode::Unavailable
            }
            ProfileError::Internal(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<NotificationError> for ApiErrorCode {
    fn from(error: NotificationError) -> Self {
        match error {
            NotificationError::NotFound => ApiErrorCode::NotFound,
            NotificationError::Unavailable(e) => {
                warn!("notification store unavailable: {}", e);
                ApiErrorCode::Unavailable
            }
            NotificationError::Internal(e) => ApiErrorCode::internal(e),
        }
    }
}
