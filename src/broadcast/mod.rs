//! Broadcast engine: targeting state machine, payload capture, PIN gate and
//! the rate-limited fan-out dispatcher.

pub mod capture;
pub mod dispatcher;
pub mod outbound;
pub mod state;
pub mod traits;
pub mod types;
