use super::error::ApiErrorCode;
use crate::application_port::*;
use crate::domain_model::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
}

impl From<LoginResult> for AuthResponse {
    fn from(result: LoginResult) -> Self {
        AuthResponse {
            user: result.user,
            access_token: result.tokens.access_token.0,
            refresh_token: result.tokens.refresh_token.0,
        }
    }
}

pub async fn register(
    body: RegisterRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let role = body.role.unwrap_or(Role::Tenant);
    if role == Role::Admin {
        return Err(reject::custom(ApiErrorCode::Validation(
            "role must be tenant or landlord".to_string(),
        )));
    }

    let input = RegisterInput {
        email: body.email,
        password: body.password,
        first_name: body.first_name,
        last_name: body.last_name,
        phone: body.phone,
        role,
    };
    let result = auth_service
        .register(input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&AuthResponse::from(result)),
        warp::http::StatusCode::CREATED,
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let input = LoginInput {
        email: body.email,
        password: body.password,
    };
    let result = auth_service
        .login(input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&AuthResponse::from(result)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

pub async fn refresh(
    body: RefreshRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let tokens = auth_service
        .rotate(&body.refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&RefreshResponse {
        access_token: tokens.access_token.0,
        refresh_token: tokens.refresh_token.0,
    }))
}

pub async fn logout(
    body: RefreshRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service
        .revoke(&body.refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&MessageResponse {
        message: "Logged out".to_string(),
    }))
}

pub async fn me(
    principal: Principal,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let profile = auth_service
        .me(principal)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&Data { data: profile }))
}

pub async fn search_listings(
    query: SearchQuery,
    listing_service: Arc<dyn ListingService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let page = listing_service
        .search(query)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&page))
}

pub async fn get_listing(
    id: ListingId,
    viewer: Option<Principal>,
    listing_service: Arc<dyn ListingService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let listing = listing_service
        .get(id, viewer.map(|p| p.id))
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&Data { data: listing }))
}

pub async fn create_listing(
    body: ListingDraft,
    principal: Principal,
    listing_service: Arc<dyn ListingService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let listing = listing_service
        .create(principal, body)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&Data { data: listing }),
        warp::http::StatusCode::CREATED,
    ))
}

pub async fn update_listing(
    id: ListingId,
    body: ListingPatch,
    principal: Principal,
    listing_service: Arc<dyn ListingService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let listing = listing_service
        .update(principal, id, body)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&Data { data: listing }))
}

pub async fn delete_listing(
    id: ListingId,
    principal: Principal,
    listing_service: Arc<dyn ListingService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    listing_service
        .delete(principal, id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&MessageResponse {
        message: "Listing deleted".to_string(),
    }))
}

pub async fn upsert_profile(
    body: ProfileDraft,
    principal: Principal,
    roommate_service: Arc<dyn RoommateService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let profile = roommate_service
        .upsert_profile(principal.id, body)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&Data { data: profile }))
}

pub async fn my_profile(
    principal: Principal,
    roommate_service: Arc<dyn RoommateService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let profile = roommate_service
        .get_profile(principal.id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&Data { data: profile }))
}

pub async fn list_notifications(
    principal: Principal,
    notification_service: Arc<dyn NotificationService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let notifications = notification_service
        .list_for_user(principal.id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&Data {
        data: notifications,
    }))
}

pub async fn mark_notification_read(
    id: NotificationId,
    principal: Principal,
    notification_service: Arc<dyn NotificationService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    notification_service
        .mark_read(principal.id, id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&MessageResponse {
        message: "Marked as read".to_string(),
    }))
}
