//! Tracing setup with a reloadable filter: boot at `info`, then apply the
//! filter from settings once they are parsed.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
