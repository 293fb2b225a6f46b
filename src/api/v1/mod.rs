mod error;
mod handler;
mod ratelimit;
mod router;

pub use error::*;
pub use handler::*;
pub use ratelimit::*;
pub use router::*;
