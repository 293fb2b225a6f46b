mod amqp;
mod backoff;
mod dispatch;
mod kafka;
mod port;

pub use amqp::*;
pub use backoff::*;
pub use dispatch::*;
pub use kafka::*;
pub use port::*;
