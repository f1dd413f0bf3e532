//! Sequenced runs of service operations.
//!
//! A [`Scenario`] is an ordered list of [`Step`]s executed one at a time.
//! The run stops at the first failing step and records it in the
//! [`ScenarioReport`]. Settle steps separate mutations from the reads that
//! depend on them.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::client::IndexService;
use crate::error::{ClientError, Result};
use crate::settle::{Expectation, Settler};
use crate::types::{IndexId, UserId};

/// Vectors inserted by the reference run, keyed by user id.
pub const REFERENCE_VECTORS: [(UserId, [f64; 3]); 3] = [
    (0, [2.0, 8.2, 2.3]),
    (1, [2.0, 8.2, 3.3]),
    (2, [2.0, 8.2, 4.3]),
];

/// Query used when the reference run includes a search.
pub const REFERENCE_QUERY: [f64; 3] = [2.0, 8.2, 3.3];

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    CreateIndex {
        id: IndexId,
        k: usize,
        dimension: usize,
    },
    ListIndices,
    GetIndexInfo(IndexId),
    InsertVector {
        index_id: IndexId,
        id_user: UserId,
        vector: Vec<f64>,
    },
    Search {
        index_id: IndexId,
        vector: Vec<f64>,
    },
    DeleteIndex(IndexId),
    Settle(Expectation),
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::CreateIndex { .. } => "create_index",
            Step::ListIndices => "list_indices",
            Step::GetIndexInfo(_) => "get_index_info",
            Step::InsertVector { .. } => "insert_vector",
            Step::Search { .. } => "search",
            Step::DeleteIndex(_) => "delete_index",
            Step::Settle(_) => "settle",
        }
    }

    async fn execute(&self, service: &dyn IndexService, settler: &Settler) -> Result<StepOutcome> {
        let resp = match self {
            Step::Settle(expect) => {
                let settled = settler.settle(service, *expect).await?;
                return Ok(StepOutcome {
                    status: None,
                    body: None,
                    probes: Some(settled.probes),
                });
            }
            Step::CreateIndex { id, k, dimension } => {
                service.create_index(*id, *k, *dimension).await?
            }
            Step::ListIndices => service.list_indices().await?,
            Step::GetIndexInfo(id) => service.get_index_info(*id).await?,
            Step::InsertVector {
                index_id,
                id_user,
                vector,
            } => service.insert_vector(*index_id, *id_user, vector).await?,
            Step::Search { index_id, vector } => service.search(*index_id, vector).await?,
            Step::DeleteIndex(id) => service.delete_index(*id).await?,
        };
        Ok(StepOutcome {
            status: Some(resp.status.as_u16()),
            body: Some(resp.body),
            probes: None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scenario {
    steps: Vec<Step>,
}

impl Scenario {
    pub fn new() -> Self {
        Self::default()
    }

    /// create, list, inspect, insert three vectors, inspect twice, delete,
    /// then inspect the deleted index. The last read is expected to fail.
    pub fn reference(id: IndexId, k: usize, dimension: usize) -> Self {
        Self::reference_with(id, k, dimension, false)
    }

    /// The reference run, optionally searching once the inserts settle.
    pub fn reference_with(id: IndexId, k: usize, dimension: usize, with_search: bool) -> Self {
        let mut scenario = Scenario::new()
            .create_index(id, k, dimension)
            .settle(Expectation::Present(id))
            .list_indices()
            .settle(Expectation::Present(id))
            .get_index_info(id)
            .settle(Expectation::Present(id));
        for (user_id, vector) in REFERENCE_VECTORS {
            scenario = scenario.insert_vector(id, user_id, &vector);
        }
        scenario = scenario.settle(Expectation::Present(id));
        if with_search {
            scenario = scenario.search(id, &REFERENCE_QUERY);
        }
        scenario
            .get_index_info(id)
            .settle(Expectation::Present(id))
            .get_index_info(id)
            .settle(Expectation::Present(id))
            .delete_index(id)
            .settle(Expectation::Absent(id))
            .get_index_info(id)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn push(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn create_index(self, id: IndexId, k: usize, dimension: usize) -> Self {
        self.push(Step::CreateIndex { id, k, dimension })
    }

    pub fn list_indices(self) -> Self {
        self.push(Step::ListIndices)
    }

    pub fn get_index_info(self, id: IndexId) -> Self {
        self.push(Step::GetIndexInfo(id))
    }

    pub fn insert_vector(self, index_id: IndexId, id_user: UserId, vector: &[f64]) -> Self {
        self.push(Step::InsertVector {
            index_id,
            id_user,
            vector: vector.to_vec(),
        })
    }

    pub fn search(self, index_id: IndexId, vector: &[f64]) -> Self {
        self.push(Step::Search {
            index_id,
            vector: vector.to_vec(),
        })
    }

    pub fn delete_index(self, id: IndexId) -> Self {
        self.push(Step::DeleteIndex(id))
    }

    pub fn settle(self, expect: Expectation) -> Self {
        self.push(Step::Settle(expect))
    }

    /// Execute the steps in order, halting at the first error.
    #[instrument(skip_all, fields(steps = self.steps.len()))]
    pub async fn run(&self, service: &dyn IndexService, settler: &Settler) -> ScenarioReport {
        let mut report = ScenarioReport::new(self.steps.len());

        for (index, step) in self.steps.iter().enumerate() {
            let started = Instant::now();
            let outcome = step.execute(service, settler).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match outcome {
                Ok(outcome) => {
                    info!(step = index, name = step.name(), elapsed_ms, "step ok");
                    report.steps.push(StepReport {
                        index,
                        name: step.name(),
                        status: outcome.status,
                        body: outcome.body,
                        probes: outcome.probes,
                        elapsed_ms,
                    });
                }
                Err(e) => {
                    error!(step = index, name = step.name(), error = %e, "step failed, halting");
                    report.halted = Some(Halt {
                        step: index,
                        name: step.name(),
                        status: e.status_code(),
                        message: e.to_string(),
                        error: e,
                    });
                    break;
                }
            }
        }

        report.finished_at = Utc::now();
        report
    }
}

struct StepOutcome {
    status: Option<u16>,
    body: Option<String>,
    probes: Option<u32>,
}

/// Result of one completed step.
#[derive(Debug, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probes: Option<u32>,
    pub elapsed_ms: u64,
}

/// The step that stopped the run.
#[derive(Debug, Serialize)]
pub struct Halt {
    pub step: usize,
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
    #[serde(skip)]
    pub error: ClientError,
}

#[derive(Debug, Serialize)]
pub struct ScenarioReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_steps: usize,
    pub steps: Vec<StepReport>,
    pub halted: Option<Halt>,
}

impl ScenarioReport {
    fn new(total_steps: usize) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            total_steps,
            steps: Vec::with_capacity(total_steps),
            halted: None,
        }
    }

    pub fn completed(&self) -> bool {
        self.halted.is_none()
    }

    /// Convert into the error that halted the run, if any.
    pub fn into_result(self) -> Result<Vec<StepReport>> {
        match self.halted {
            Some(halt) => Err(halt.error),
            None => Ok(self.steps),
        }
    }
}
