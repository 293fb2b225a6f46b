mod auth_service_impl;
mod credential_hasher;
mod listing_service_impl;
mod notification_service_impl;
mod roommate_service_impl;
mod token_codec;

pub use auth_service_impl::*;
pub use credential_hasher::*;
pub use listing_service_impl::*;
pub use notification_service_impl::*;
pub use roommate_service_impl::*;
pub use token_codec::*;
