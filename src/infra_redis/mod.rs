mod read_cache_redis;
mod session_store_redis;

pub use read_cache_redis::*;
pub use session_store_redis::*;
