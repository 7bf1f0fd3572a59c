//! Scheduled maintenance for the credential lifecycle.
//!
//! This crate provides:
//! - A cron scheduler owning the periodic tasks
//! - The expired token sweep job

pub mod jobs;
pub mod scheduler;

pub use jobs::TokenSweepJob;
pub use scheduler::CronScheduler;
