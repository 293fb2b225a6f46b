use super::error::*;
use super::handler;
use super::ratelimit::RateLimiter;
use crate::application_port::AuthService;
use crate::domain_model::{ListingId, NotificationId, Principal, Role, SearchQuery};
use crate::server::Server;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::{Filter, Rejection, http, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let global_limit = with_rate_limit(server.global_limiter.clone());
    let auth_limit = with_rate_limit(server.auth_limiter.clone());

    let register = warp::post()
        .and(warp::path!("auth" / "register"))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::register);

    let login = warp::post()
        .and(warp::path!("auth" / "login"))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let refresh = warp::post()
        .and(warp::path!("auth" / "refresh"))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::post()
        .and(warp::path!("auth" / "logout"))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let me = warp::get()
        .and(warp::path!("auth" / "me"))
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(handler::me);

    let auth_routes = auth_limit.and(register.or(login).or(refresh).or(logout).or(me));

    let search_listings = warp::get()
        .and(warp::path!("listings"))
        .and(warp::query::<SearchQuery>())
        .and(with(server.listing_service.clone()))
        .and_then(handler::search_listings);

    let get_listing = warp::get()
        .and(warp::path!("listings" / ListingId))
        .and(with_optional_verification(server.auth_service.clone()))
        .and(with(server.listing_service.clone()))
        .and_then(handler::get_listing);

    let create_listing = warp::post()
        .and(warp::path!("listings"))
        .and(warp::body::json())
        .and(with_role(
            server.auth_service.clone(),
            &[Role::Landlord, Role::Admin],
        ))
        .and(with(server.listing_service.clone()))
        .and_then(handler::create_listing);

    let update_listing = warp::put()
        .and(warp::path!("listings" / ListingId))
        .and(warp::body::json())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.listing_service.clone()))
        .and_then(handler::update_listing);

    let delete_listing = warp::delete()
        .and(warp::path!("listings" / ListingId))
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.listing_service.clone()))
        .and_then(handler::delete_listing);

    let listing_routes = search_listings
        .or(get_listing)
        .or(create_listing)
        .or(update_listing)
        .or(delete_listing);

    let upsert_profile = warp::put()
        .and(warp::path!("roommates" / "profile"))
        .and(warp::body::json())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.roommate_service.clone()))
        .and_then(handler::upsert_profile);

    let my_profile = warp::get()
        .and(warp::path!("roommates" / "profile"))
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.roommate_service.clone()))
        .and_then(handler::my_profile);

    let list_notifications = warp::get()
        .and(warp::path!("notifications"))
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.notification_service.clone()))
        .and_then(handler::list_notifications);

    let mark_read = warp::post()
        .and(warp::path!("notifications" / NotificationId / "read"))
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.notification_service.clone()))
        .and_then(handler::mark_notification_read);

    global_limit.and(
        auth_routes
            .or(listing_routes)
            .or(upsert_profile)
            .or(my_profile)
            .or(list_notifications)
            .or(mark_read),
    )
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_rate_limit(
    limiter: Arc<RateLimiter>,
) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::addr::remote()
        .and_then(move |addr: Option<SocketAddr>| {
            let limiter = limiter.clone();
            async move {
                let key = addr
                    .map(|a| a.ip().to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                if limiter.check(&key) {
                    Ok(())
                } else {
                    Err(reject::custom(ApiErrorCode::RateLimited))
                }
            }
        })
        .untuple_one()
}

fn with_verification(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (Principal,), Error = warp::Rejection> + Clone {
    warp::header::<String>(http::header::AUTHORIZATION.as_ref()).and_then(move |token: String| {
        let auth_service = auth_service.clone();
        async move {
            if let Some(token) = token.strip_prefix("Bearer ") {
                let principal = auth_service
                    .verify_access(token)
                    .await
                    .map_err(ApiErrorCode::from)
                    .map_err(reject::custom)?;
                Ok(principal)
            } else {
                Err(reject::custom(ApiErrorCode::Unauthenticated))
            }
        }
    })
}

/// Anonymous access allowed; a bad token only loses the viewer attribution.
fn with_optional_verification(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (Option<Principal>,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>(http::header::AUTHORIZATION.as_ref()).and_then(
        move |header: Option<String>| {
            let auth_service = auth_service.clone();
            async move {
                let token = header.and_then(|h| h.strip_prefix("Bearer ").map(str::to_string));
                match token {
                    Some(token) => match auth_service.verify_access(&token).await {
                        Ok(principal) => Ok::<_, Rejection>(Some(principal)),
                        Err(_) => Ok(None),
                    },
                    None => Ok(None),
                }
            }
        },
    )
}

fn with_role(
    auth_service: Arc<dyn AuthService>,
    allowed: &'static [Role],
) -> impl Filter<Extract = (Principal,), Error = warp::Rejection> + Clone {
    with_verification(auth_service).and_then(move |principal: Principal| async move {
        if allowed.contains(&principal.role) {
            Ok(principal)
        } else {
            Err(reject::custom(ApiErrorCode::Forbidden))
        }
    })
}
