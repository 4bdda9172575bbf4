use std::collections::HashMap;
use std::fs;
use std::path::Path;

use iusd_core::{Address, GenesisConfig, Protocol, Snapshot};

use crate::config::KeeperConfig;
use crate::error::{KeeperError, KeeperResult};

/// Main keeper service driving periodic protocol maintenance: rebase,
/// allocation and harvest against a snapshot-backed protocol state.
pub struct Keeper {
    /// Keeper configuration
    config: KeeperConfig,

    /// The protocol state this keeper maintains
    protocol: Protocol,

    /// Identity the keeper acts as (the vault strategist)
    caller: Address,

    /// Last run timestamps per job
    last_runs: HashMap<&'static str, i64>,

    /// Dry run mode flag
    dry_run: bool,
}

impl Keeper {
    /// Create a new keeper instance, loading the protocol snapshot or
    /// deploying a fresh genesis state when none exists yet.
    pub fn new(config: KeeperConfig, dry_run: bool) -> KeeperResult<Self> {
        let protocol = if Path::new(&config.snapshot_path).exists() {
            let content = fs::read_to_string(&config.snapshot_path)?;
            let snapshot: Snapshot = serde_json::from_str(&content)?;
            snapshot
                .into_protocol()
                .map_err(|e| KeeperError::Snapshot(e.to_string()))?
        } else {
            log::warn!(
                "No snapshot at {}, deploying genesis state",
                config.snapshot_path
            );
            Protocol::new(GenesisConfig::default())?
        };

        let caller = protocol.vault.strategist();
        Ok(Self {
            config,
            protocol,
            caller,
            last_runs: HashMap::new(),
            dry_run,
        })
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    /// Run every enabled job that is due, persisting the snapshot
    /// afterwards. Individual job failures are logged and retried per
    /// the retry policy without killing the loop.
    pub async fn run_all_jobs(&mut self) -> KeeperResult<usize> {
        let mut succeeded = 0;

        for job in self.config.enabled_jobs() {
            match self.run_job_with_retry(job).await {
                Ok(true) => succeeded += 1,
                Ok(false) => {
                    log::debug!("Job {} not due, skipping", job);
                }
                Err(e) => {
                    log::error!("Job {} failed after retries: {}", job, e);
                    // Continue with other jobs
                }
            }
        }

        if succeeded > 0 && !self.dry_run {
            self.persist()?;
        }

        Ok(succeeded)
    }

    /// Run one job if due, retrying with exponential backoff.
    async fn run_job_with_retry(&mut self, job: &'static str) -> KeeperResult<bool> {
        let now = chrono::Utc::now().timestamp();
        if let Some(job_config) = self.config.job(job) {
            if let Some(&last_run) = self.last_runs.get(job) {
                if now - last_run < job_config.min_interval_secs {
                    return Ok(false);
                }
            }
        }

        let mut attempt = 0;
        loop {
            match self.run_job(job) {
                Ok(()) => {
                    self.last_runs.insert(job, now);
                    return Ok(true);
                }
                Err(e) if attempt < self.config.retry.max_retries => {
                    let delay = self.config.retry.delay_for_attempt(attempt);
                    log::warn!(
                        "Job {} attempt {} failed ({}), retrying in {}ms",
                        job,
                        attempt,
                        e,
                        delay
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn run_job(&mut self, job: &str) -> KeeperResult<()> {
        match job {
            "rebase" => self.protocol.rebase()?,
            "allocate" => self.protocol.allocate()?,
            "harvest" => self.protocol.harvest(self.caller)?,
            other => {
                return Err(KeeperError::InvalidConfig(format!("Unknown job: {}", other)));
            }
        }
        Ok(())
    }

    /// Persist the protocol snapshot atomically: write to a temporary
    /// file, then rename over the target.
    pub fn persist(&self) -> KeeperResult<()> {
        let snapshot = self.protocol.snapshot();
        let content = serde_json::to_string_pretty(&snapshot)?;
        let tmp_path = format!("{}.tmp", self.config.snapshot_path);
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &self.config.snapshot_path)?;
        log::debug!("Persisted snapshot to {}", self.config.snapshot_path);
        Ok(())
    }

    /// Log a health summary of the protocol state.
    pub fn health_check(&self) -> KeeperResult<()> {
        let supply = self.protocol.total_supply();
        let value = self.protocol.total_value()?;
        log::info!(
            "Health: supply={} backing_value={} assets={} strategies={} events={}",
            supply,
            value,
            self.protocol.vault.asset_count(),
            self.protocol.vault.strategy_count(),
            self.protocol.events().len()
        );
        Ok(())
    }
}
