//! # Scenarios
//!
//! A scenario is a JSON script replayed against a fresh chain with a
//! manual clock:
//!
//! ```json
//! {
//!   "steps": [
//!     {"op": "create_campaign", "from": "creator", "country": "Japan", "goal": "5", "duration": 604800},
//!     {"op": "contribute", "from": "contributor", "campaign": 0, "value": "1"},
//!     {"op": "finalize", "from": "creator", "campaign": 0, "expect_error": "still open"},
//!     {"op": "advance_time", "seconds": 604801},
//!     {"op": "finalize", "from": "creator", "campaign": 0}
//!   ]
//! }
//! ```
//!
//! A step with `expect_error` must fail with a message containing that
//! text (an empty string accepts any failure). Any other failure aborts
//! the run.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use visa_contracts::{Chain, Event};
use visa_protocol::config::GenesisConfig;
use visa_protocol::{Clock, ManualClock, Timestamp};

use crate::metrics::LedgerMetrics;
use crate::operation::{execute, Operation, Outcome};
use crate::query::{campaigns, CampaignView};
use crate::state::NodeClock;

/// A scripted sequence of operations.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Genesis for the fresh chain. Defaults to the standard accounts.
    #[serde(default)]
    pub genesis: Option<GenesisConfig>,
    pub steps: Vec<Step>,
}

/// One operation plus its expected result.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub op: Operation,
    #[serde(default)]
    pub expect_error: Option<String>,
}

impl Scenario {
    /// Reads a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse scenario {}", path.display()))
    }
}

/// What happened at one step.
#[derive(Debug, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<Event>,
}

/// Result of a completed run.
#[derive(Debug, Serialize)]
pub struct ScenarioReport<'a> {
    pub now: Timestamp,
    pub steps: Vec<StepReport>,
    pub campaigns: Vec<CampaignView<'a>>,
}

/// Deploys a fresh chain for `scenario` and replays its steps.
pub fn run(scenario: &Scenario, metrics: Option<&LedgerMetrics>) -> Result<(Chain<NodeClock>, Vec<StepReport>)> {
    let genesis = scenario.genesis.clone().unwrap_or_default();
    let clock = match genesis.genesis_time {
        Some(start) => ManualClock::new(start),
        None => ManualClock::starting_now(),
    };
    let start = clock.now();
    let mut chain = Chain::deploy(&genesis, NodeClock::Manual(clock))
        .context("failed to deploy scenario chain")?;

    tracing::info!(steps = scenario.steps.len(), start, "running scenario");

    let mut reports = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        let receipts_before = chain.receipts().len();
        let result = execute(&mut chain, &step.op, metrics);
        let events: Vec<Event> = chain.receipts()[receipts_before..]
            .iter()
            .flat_map(|r| r.events.iter().cloned())
            .collect();

        let report = match (result, &step.expect_error) {
            (Ok(outcome), None) => StepReport {
                index,
                op: step.op.name(),
                outcome: Some(outcome),
                error: None,
                events,
            },
            (Err(err), Some(expected)) => {
                let message = format!("{err:#}");
                if !message.contains(expected.as_str()) {
                    bail!(
                        "step {index} ({}) failed with \"{message}\", expected \"{expected}\"",
                        step.op.name()
                    );
                }
                StepReport {
                    index,
                    op: step.op.name(),
                    outcome: None,
                    error: Some(message),
                    events,
                }
            }
            (Ok(_), Some(expected)) => {
                bail!(
                    "step {index} ({}) succeeded, expected an error containing \"{expected}\"",
                    step.op.name()
                );
            }
            (Err(err), None) => {
                return Err(err.context(format!("step {index} ({}) failed", step.op.name())));
            }
        };
        reports.push(report);
    }

    Ok((chain, reports))
}

/// Bundles step results with the final campaign table.
pub fn report<C: Clock>(chain: &Chain<C>, steps: Vec<StepReport>) -> ScenarioReport<'_> {
    ScenarioReport {
        now: chain.now(),
        steps,
        campaigns: campaigns(chain),
    }
}
