//! Lifecycle email dispatch.

pub mod dispatcher;
pub mod log;

pub use dispatcher::NotificationDispatcher;
pub use log::LogNotifier;
