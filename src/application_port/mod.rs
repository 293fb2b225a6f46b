mod auth_service;
mod listing_service;
mod notification_service;
mod roommate_service;

pub use auth_service::*;
pub use listing_service::*;
pub use notification_service::*;
pub use roommate_service::*;
