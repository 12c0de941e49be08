use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

/// Reservation policy, injected as static configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    pub max_tickets_per_purchase: usize,
    pub purchase_deadline_minutes: i64,
    pub default_hold_ttl_seconds: u64,
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    #[serde(default = "default_store_lock_timeout_ms")]
    pub store_lock_timeout_ms: u64,
}

// Sweep well below the shortest TTL we allow so expired holds come back
// quickly; lock acquisition is bounded so a stuck caller fails retryable.
fn default_sweep_interval_ms() -> u64 {
    1_000
}

fn default_store_lock_timeout_ms() -> u64 {
    500
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Layer the environment-specific file on top (optional)
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Env overrides, e.g. MARQUEE_SERVER__PORT=9090
            .add_source(config::Environment::with_prefix("MARQUEE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
