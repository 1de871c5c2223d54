//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Configuration can be loaded from environment variables and config files.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    pub payment: PaymentConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Comma-separated origins allowed by CORS
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_timeout() -> u64 {
    30
}

fn default_cors_origins() -> String {
    "http://localhost:3000,http://127.0.0.1:3000".to_string()
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Idle connection timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Apply pending migrations at startup
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_true() -> bool {
    true
}

/// Redis configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Disable to run without catalog caching and event publishing
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// TTL for cached catalog reads in seconds
    #[serde(default = "default_catalog_ttl")]
    pub catalog_ttl_secs: u64,

    /// Prefix of the pub/sub channels events are published on
    #[serde(default = "default_events_prefix")]
    pub events_channel_prefix: String,
}

fn default_catalog_ttl() -> u64 {
    300
}

fn default_events_prefix() -> String {
    "innkeep:events".to_string()
}

/// Booking engine configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BookingConfig {
    /// Prefix of generated booking numbers
    #[serde(default = "default_booking_prefix")]
    pub booking_number_prefix: String,

    /// Let guests check in before the booked check-in date
    #[serde(default)]
    pub allow_early_check_in: bool,

    /// Inventory hold attempts before giving up on a concurrency conflict
    #[serde(default = "default_inventory_attempts")]
    pub inventory_retry_attempts: u32,
}

fn default_booking_prefix() -> String {
    "BK".to_string()
}

fn default_inventory_attempts() -> u32 {
    2
}

/// Payment gateway configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    /// Gateway API base URL
    pub base_url: String,

    /// Gateway request timeout in seconds
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,

    /// Where the gateway sends the guest after paying
    #[serde(default)]
    pub return_url: Option<String>,
}

fn default_gateway_timeout() -> u64 {
    15
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("server.timeout_secs", 30)?
            .set_default("server.cors_origins", default_cors_origins())?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.run_migrations", true)?
            .set_default("redis.enabled", true)?
            .set_default("redis.catalog_ttl_secs", 300)?
            .set_default("redis.events_channel_prefix", "innkeep:events")?
            .set_default("booking.booking_number_prefix", "BK")?
            .set_default("booking.allow_early_check_in", false)?
            .set_default("booking.inventory_retry_attempts", 2)?
            .set_default("payment.timeout_secs", 15)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with INNKEEP_ prefix
            .add_source(
                Environment::with_prefix("INNKEEP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("INNKEEP").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            booking_number_prefix: default_booking_prefix(),
            allow_early_check_in: false,
            inventory_retry_attempts: default_inventory_attempts(),
        }
    }
}
