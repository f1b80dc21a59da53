//! Authentication ports
//!
//! Persistence of the token pair and notification of session teardown.

pub mod ports;

pub use ports::{SessionEndReason, SessionObserver, TokenStorage};
