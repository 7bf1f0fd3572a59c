//! Collaborator traits defined in `wot-core` and implemented by other crates.

pub mod clock;
pub mod notifier;
pub mod password;

pub use clock::{Clock, ManualClock, SystemClock};
pub use notifier::{NotificationKind, NotificationParams, Notifier};
pub use password::PasswordHasher;
