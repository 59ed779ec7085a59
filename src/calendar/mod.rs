pub mod authorization;
pub mod bridge;
pub mod calendar;
pub mod color;
pub mod date;
#[cfg(target_os = "macos")]
pub mod eventkit;
pub mod mapper;
pub mod memory;
pub mod native;
pub mod reminder;
pub mod store;

pub use authorization::{Access, AuthorizationGate, AuthorizationStatus, EntityType};
pub use calendar::{
    CalendarType, Identified, ReminderList, ReminderListCreate, ReminderListUpdate, Source,
    SourceType,
};
pub use color::Rgba;
pub use date::{DateComponentCodec, DateComponents, DateInput, PartialDate};
pub use reminder::{Reminder, ReminderCreate, ReminderUpdate, Unsupported};
pub use store::ReminderStore;
