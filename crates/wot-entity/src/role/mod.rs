//! Role and permission reference data.

pub mod names;

pub use names::{PermissionName, RoleName};
