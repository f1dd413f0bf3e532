//! Waiting for remote mutations to become visible.
//!
//! The service may acknowledge a mutation before dependent reads observe it.
//! [`Settler`] sits between a mutation and the reads that depend on it,
//! either sleeping for a fixed interval or polling the index until its
//! presence matches what the caller expects.

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::client::IndexService;
use crate::config::{ScenarioConfig, SettleMode};
use crate::error::{ClientError, Result};
use crate::types::IndexId;

/// State of an index that the next dependent read relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Present(IndexId),
    Absent(IndexId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleOutcome {
    /// Number of probes issued. Always zero for fixed sleeps.
    pub probes: u32,
    /// Whether a probe observed the expected state.
    pub confirmed: bool,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct Settler {
    mode: SettleMode,
    interval: Duration,
    max_attempts: u32,
}

impl Settler {
    pub fn fixed(interval: Duration) -> Self {
        Self {
            mode: SettleMode::Fixed,
            interval,
            max_attempts: 0,
        }
    }

    pub fn poll(interval: Duration, max_attempts: u32) -> Self {
        Self {
            mode: SettleMode::Poll,
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_config(config: &ScenarioConfig) -> Self {
        match config.settle_mode {
            SettleMode::Fixed => Self::fixed(config.settle_interval()),
            SettleMode::Poll => Self::poll(config.settle_interval(), config.poll_max_attempts),
        }
    }

    pub fn mode(&self) -> SettleMode {
        self.mode
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until `expect` should hold for subsequent reads.
    ///
    /// In poll mode, running out of attempts is not an error: the caller
    /// proceeds and its next read decides. Transport errors from probes
    /// propagate.
    pub async fn settle(
        &self,
        service: &dyn IndexService,
        expect: Expectation,
    ) -> Result<SettleOutcome> {
        let started = Instant::now();
        match self.mode {
            SettleMode::Fixed => {
                tokio::time::sleep(self.interval).await;
                Ok(SettleOutcome {
                    probes: 0,
                    confirmed: false,
                    elapsed: started.elapsed(),
                })
            }
            SettleMode::Poll => {
                for attempt in 1..=self.max_attempts {
                    if probe(service, expect).await? {
                        debug!(?expect, attempt, "settled");
                        return Ok(SettleOutcome {
                            probes: attempt,
                            confirmed: true,
                            elapsed: started.elapsed(),
                        });
                    }
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.interval).await;
                    }
                }
                warn!(?expect, attempts = self.max_attempts, "index did not settle");
                Ok(SettleOutcome {
                    probes: self.max_attempts,
                    confirmed: false,
                    elapsed: started.elapsed(),
                })
            }
        }
    }

    /// Poll the health endpoint until it answers 200.
    pub async fn wait_ready(&self, service: &dyn IndexService) -> Result<bool> {
        let attempts = self.max_attempts.max(1);
        for attempt in 1..=attempts {
            match service.check_health().await {
                Ok(_) => return Ok(true),
                Err(e) if e.is_transport() || e.is_contract_violation() => {
                    debug!(attempt, error = %e, "service not ready");
                }
                Err(e) => return Err(e),
            }
            if attempt < attempts {
                tokio::time::sleep(self.interval).await;
            }
        }
        Ok(false)
    }
}

/// One `get_index_info` read. 200 means present and 404 means absent. Any
/// other status leaves the state unknown, so this attempt does not settle.
async fn probe(service: &dyn IndexService, expect: Expectation) -> Result<bool> {
    let id = match expect {
        Expectation::Present(id) | Expectation::Absent(id) => id,
    };
    let present = match service.get_index_info(id).await {
        Ok(_) => true,
        Err(ClientError::ContractViolation { status, .. }) if status == StatusCode::NOT_FOUND => {
            false
        }
        Err(ClientError::ContractViolation { status, .. }) => {
            debug!(?expect, %status, "index state unknown");
            return Ok(false);
        }
        Err(e) => return Err(e),
    };
    Ok(match expect {
        Expectation::Present(_) => present,
        Expectation::Absent(_) => !present,
    })
}
