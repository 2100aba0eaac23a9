//! NetCare+ emergency response engine
//!
//! Opens emergency cases, runs the telecom-backed intake sequence and keeps
//! per-case monitors and the network telemetry collector running until the
//! cases close.

pub mod api;
pub mod core;
pub mod db;
pub mod error;
pub mod models;
pub mod telecom;
pub mod utils;

pub use crate::core::NetCareSystem;
pub use error::NetcareError;

/// Application configuration
pub mod config {
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(default)]
    pub struct Config {
        pub server: ServerConfig,
        pub telecom: TelecomConfig,
        pub monitoring: MonitoringConfig,
        pub logging: LoggingConfig,
        pub simulation: SimulationConfig,
        pub doctors: DoctorRoster,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct ServerConfig {
        pub host: String,
        pub port: u16,
    }

    impl Default for ServerConfig {
        fn default() -> Self {
            Self {
                host: "127.0.0.1".into(),
                port: 8080,
            }
        }
    }

    /// Remote capability provider.
    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct TelecomConfig {
        pub base_url: String,
        /// Bearer token sent with every live call.
        pub api_key: Option<String>,
        pub probe_timeout_ms: u64,
        pub request_timeout_ms: u64,
        /// Number used by the connectivity probe.
        pub probe_phone: String,
    }

    impl Default for TelecomConfig {
        fn default() -> Self {
            Self {
                base_url: "https://network-as-code.example.com".into(),
                api_key: None,
                probe_timeout_ms: 10_000,
                request_timeout_ms: 15_000,
                probe_phone: "+1234567890".into(),
            }
        }
    }

    impl TelecomConfig {
        pub fn probe_timeout(&self) -> Duration {
            Duration::from_millis(self.probe_timeout_ms)
        }

        pub fn request_timeout(&self) -> Duration {
            Duration::from_millis(self.request_timeout_ms)
        }
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct MonitoringConfig {
        pub case_tick_ms: u64,
        pub collector_tick_ms: u64,
        /// Entries per realtime log returned in a case snapshot.
        pub snapshot_tail: usize,
        /// Pause between intake steps, for operator-facing progress displays.
        pub intake_step_pause_ms: u64,
    }

    impl Default for MonitoringConfig {
        fn default() -> Self {
            Self {
                case_tick_ms: 5_000,
                collector_tick_ms: 5_000,
                snapshot_tail: 10,
                intake_step_pause_ms: 0,
            }
        }
    }

    impl MonitoringConfig {
        pub fn case_tick(&self) -> Duration {
            Duration::from_millis(self.case_tick_ms.max(1))
        }

        pub fn collector_tick(&self) -> Duration {
            Duration::from_millis(self.collector_tick_ms.max(1))
        }

        pub fn intake_step_pause(&self) -> Duration {
            Duration::from_millis(self.intake_step_pause_ms)
        }
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(default)]
    pub struct LoggingConfig {
        pub json: bool,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(default)]
    pub struct SimulationConfig {
        pub seed: Option<u64>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct DoctorConfig {
        pub name: String,
        pub specialty: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(transparent)]
    pub struct DoctorRoster(pub Vec<DoctorConfig>);

    impl Default for DoctorRoster {
        fn default() -> Self {
            let doctor = |name: &str, specialty: &str| DoctorConfig {
                name: name.into(),
                specialty: specialty.into(),
            };
            DoctorRoster(vec![
                doctor("Dr. Sarah Chen", "Emergency Medicine"),
                doctor("Dr. Raj Patel", "General Practice"),
                doctor("Dr. Maria Gonzalez", "Cardiology"),
            ])
        }
    }

    /// Load configuration from file
    pub fn load_config() -> Result<Config, config::ConfigError> {
        let env = std::env::var("NETCARE_ENV").unwrap_or_else(|_| "development".into());

        config::Config::builder()
            // Start with default settings
            .add_source(config::File::with_name("config/default").required(false))
            // Override with environment-specific settings
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            // Override with environment variables
            .add_source(
                config::Environment::with_prefix("NETCARE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}
