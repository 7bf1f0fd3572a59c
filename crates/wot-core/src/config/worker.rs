//! Background worker configuration.

use serde::{Deserialize, Serialize};

use crate::types::Ttl;

/// Expired-token sweeper configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the sweeper is scheduled at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Six-field cron expression (with seconds) for the sweep.
    #[serde(default = "default_sweep_schedule")]
    pub sweep_schedule: String,
    /// How long past `expires_at` a token row is kept before deletion.
    #[serde(default = "default_sweep_retention")]
    pub sweep_retention: Ttl,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_schedule: default_sweep_schedule(),
            sweep_retention: default_sweep_retention(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sweep_schedule() -> String {
    "0 0 * * * *".to_string()
}

fn default_sweep_retention() -> Ttl {
    Ttl::days(1)
}
