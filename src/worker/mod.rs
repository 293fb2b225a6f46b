mod listing_events;
mod mailer;
mod welcome;

pub use listing_events::*;
pub use mailer::*;
pub use welcome::*;
