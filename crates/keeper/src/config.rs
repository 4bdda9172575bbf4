use std::fs;

use serde::{Deserialize, Serialize};

use crate::error::{KeeperError, KeeperResult};

/// Keeper configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeeperConfig {
    /// Path to the protocol state snapshot the keeper drives
    pub snapshot_path: String,

    /// Default tick interval in seconds
    pub tick_interval_secs: u64,

    /// Emit a health summary every this many iterations
    pub health_log_every: u64,

    /// Per-job configuration
    pub jobs: JobsConfig,

    /// Retry configuration
    pub retry: RetryConfig,
}

/// The jobs the keeper drives each tick
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JobsConfig {
    pub rebase: JobConfig,
    pub allocate: JobConfig,
    pub harvest: JobConfig,
}

/// Configuration for an individual job
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobConfig {
    /// Whether this job runs at all
    pub enabled: bool,

    /// Minimum seconds between runs of this job
    pub min_interval_secs: i64,
}

/// Retry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Maximum number of retries for failed operations
    pub max_retries: u32,

    /// Base delay between retries in milliseconds
    pub base_delay_ms: u64,

    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,

    /// Exponential backoff multiplier
    pub backoff_multiplier: f64,
}

impl KeeperConfig {
    /// Load configuration from TOML file
    pub fn load(path: &str) -> KeeperResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            KeeperError::InvalidConfig(format!("Failed to read config file {}: {}", path, e))
        })?;

        let config: KeeperConfig = toml::from_str(&content).map_err(|e| {
            KeeperError::InvalidConfig(format!("Failed to parse config file {}: {}", path, e))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &str) -> KeeperResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| KeeperError::SerializationError(e.to_string()))?;
        fs::write(path, content).map_err(|e| {
            KeeperError::InvalidConfig(format!("Failed to write config file {}: {}", path, e))
        })?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> KeeperResult<()> {
        if self.snapshot_path.is_empty() {
            return Err(KeeperError::InvalidConfig(
                "snapshot_path must not be empty".to_string(),
            ));
        }

        if self.tick_interval_secs == 0 {
            return Err(KeeperError::InvalidConfig(
                "tick_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.health_log_every == 0 {
            return Err(KeeperError::InvalidConfig(
                "health_log_every must be greater than 0".to_string(),
            ));
        }

        for (name, job) in [
            ("rebase", &self.jobs.rebase),
            ("allocate", &self.jobs.allocate),
            ("harvest", &self.jobs.harvest),
        ] {
            job.validate(name)?;
        }

        self.retry.validate()?;

        Ok(())
    }

    /// Names of the jobs enabled in this configuration
    pub fn enabled_jobs(&self) -> Vec<&'static str> {
        let mut jobs = Vec::new();
        if self.jobs.rebase.enabled {
            jobs.push("rebase");
        }
        if self.jobs.allocate.enabled {
            jobs.push("allocate");
        }
        if self.jobs.harvest.enabled {
            jobs.push("harvest");
        }
        jobs
    }

    pub fn job(&self, name: &str) -> Option<&JobConfig> {
        match name {
            "rebase" => Some(&self.jobs.rebase),
            "allocate" => Some(&self.jobs.allocate),
            "harvest" => Some(&self.jobs.harvest),
            _ => None,
        }
    }
}

impl JobConfig {
    fn validate(&self, name: &str) -> KeeperResult<()> {
        if self.min_interval_secs < 0 {
            return Err(KeeperError::InvalidConfig(format!(
                "{}.min_interval_secs must not be negative",
                name
            )));
        }
        Ok(())
    }
}

impl RetryConfig {
    /// Validate retry configuration
    fn validate(&self) -> KeeperResult<()> {
        if self.max_retries == 0 {
            return Err(KeeperError::InvalidConfig(
                "max_retries must be greater than 0".to_string(),
            ));
        }

        if self.base_delay_ms == 0 {
            return Err(KeeperError::InvalidConfig(
                "base_delay_ms must be greater than 0".to_string(),
            ));
        }

        if self.max_delay_ms < self.base_delay_ms {
            return Err(KeeperError::InvalidConfig(format!(
                "max_delay_ms must be at least base_delay_ms ({})",
                self.base_delay_ms
            )));
        }

        if self.backoff_multiplier <= 1.0 {
            return Err(KeeperError::InvalidConfig(
                "backoff_multiplier must be greater than 1.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Calculate delay for retry attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        if attempt == 0 {
            return self.base_delay_ms;
        }

        let exponential_delay =
            self.base_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        (exponential_delay as u64).min(self.max_delay_ms)
    }
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            snapshot_path: "iusd-protocol.json".to_string(),
            tick_interval_secs: 60,
            health_log_every: 100,
            jobs: JobsConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_interval_secs: 0,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Create example configuration file
pub fn create_example_config(path: &str) -> KeeperResult<()> {
    let example_config = KeeperConfig {
        snapshot_path: "iusd-protocol.json".to_string(),
        tick_interval_secs: 30,
        health_log_every: 100,
        jobs: JobsConfig {
            rebase: JobConfig {
                enabled: true,
                min_interval_secs: 300,
            },
            allocate: JobConfig {
                enabled: true,
                min_interval_secs: 600,
            },
            harvest: JobConfig {
                enabled: false,
                min_interval_secs: 86_400,
            },
        },
        retry: RetryConfig::default(),
    };

    example_config.save(path)?;
    Ok(())
}
