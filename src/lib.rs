//! Host reminder lists and reminders behind a synchronous, typed API.
//!
//! [`ReminderStore`] is the entry point. It is generic over the host
//! subsystem ([`calendar::native::NativeStore`]): EventKit on macOS, or the
//! in-memory backend in tests and elsewhere.

pub mod access;
pub mod calendar;
pub mod config;
pub mod error;

pub use calendar::ReminderStore;
pub use error::{Error, Result};
