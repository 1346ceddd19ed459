//! # State File
//!
//! The node is not a daemon. Each invocation loads the chain from a JSON
//! file, runs one command, and writes the file back. The file carries the
//! chain snapshot plus the clock mode, so a chain initialized with a manual
//! clock keeps its frozen time between invocations.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use visa_contracts::{Chain, ChainSnapshot};
use visa_protocol::config::{GenesisConfig, PROTOCOL_VERSION};
use visa_protocol::{Address, Clock, ManualClock, SystemClock, Timestamp};

/// How the chain reads time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ClockMode {
    /// Wall-clock time.
    System,
    /// Frozen time that only `time advance` and scenarios move.
    Manual { now: Timestamp },
}

/// The clock handed to the chain.
#[derive(Debug, Clone)]
pub enum NodeClock {
    System(SystemClock),
    Manual(ManualClock),
}

impl NodeClock {
    fn from_mode(mode: ClockMode) -> Self {
        match mode {
            ClockMode::System => NodeClock::System(SystemClock),
            ClockMode::Manual { now } => NodeClock::Manual(ManualClock::new(now)),
        }
    }

    fn mode(&self) -> ClockMode {
        match self {
            NodeClock::System(_) => ClockMode::System,
            NodeClock::Manual(clock) => ClockMode::Manual { now: clock.now() },
        }
    }

    /// Fast-forwards a manual clock. Wall-clock time cannot be moved.
    pub fn advance(&self, seconds: u64) -> Result<Timestamp> {
        match self {
            NodeClock::Manual(clock) => Ok(clock.advance(seconds)),
            NodeClock::System(_) => {
                bail!("cannot advance a system clock; initialize with --manual-clock")
            }
        }
    }
}

impl Clock for NodeClock {
    fn now(&self) -> Timestamp {
        match self {
            NodeClock::System(clock) => clock.now(),
            NodeClock::Manual(clock) => clock.now(),
        }
    }
}

/// On-disk layout of the state file.
#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    version: String,
    clock: ClockMode,
    chain: ChainSnapshot,
}

/// A chain bound to the file it was loaded from.
pub struct NodeState {
    path: PathBuf,
    pub chain: Chain<NodeClock>,
}

impl NodeState {
    /// Deploys a fresh chain from `genesis` and writes it to `path`.
    ///
    /// A manual clock is used when `manual_clock` is set or the genesis
    /// pins a start time. Refuses to overwrite an existing file unless
    /// `force` is set.
    pub fn init(path: &Path, genesis: &GenesisConfig, manual_clock: bool, force: bool) -> Result<Self> {
        if path.exists() && !force {
            bail!(
                "state file {} already exists (use --force to overwrite)",
                path.display()
            );
        }

        let mode = match (genesis.genesis_time, manual_clock) {
            (Some(now), _) => ClockMode::Manual { now },
            (None, true) => ClockMode::Manual {
                now: SystemClock.now(),
            },
            (None, false) => ClockMode::System,
        };

        let chain = Chain::deploy(genesis, NodeClock::from_mode(mode))
            .context("failed to deploy contracts")?;
        let state = Self {
            path: path.to_path_buf(),
            chain,
        };
        state.save()?;

        tracing::info!(
            path = %path.display(),
            clock = ?mode,
            token = %state.chain.token().address(),
            ledger = %state.chain.ledger().address(),
            "state initialized"
        );
        Ok(state)
    }

    /// Binds an existing chain to `path` without writing anything yet.
    pub fn from_chain(path: &Path, chain: Chain<NodeClock>) -> Self {
        Self {
            path: path.to_path_buf(),
            chain,
        }
    }

    /// Loads the chain stored at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read state file {} (run `visa-node init` first)", path.display()))?;
        let file: StateFile = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse state file {}", path.display()))?;

        if file.version != PROTOCOL_VERSION {
            tracing::warn!(
                found = %file.version,
                expected = PROTOCOL_VERSION,
                "state file was written by a different version"
            );
        }

        Ok(Self {
            path: path.to_path_buf(),
            chain: Chain::restore(file.chain, NodeClock::from_mode(file.clock)),
        })
    }

    /// Writes the chain back to its file.
    pub fn save(&self) -> Result<()> {
        let file = StateFile {
            version: PROTOCOL_VERSION.to_string(),
            clock: self.chain.clock().mode(),
            chain: self.chain.snapshot(),
        };
        let json = serde_json::to_string_pretty(&file).context("failed to serialize state")?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write state file {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "state saved");
        Ok(())
    }
}

/// Resolves an account argument: a `0x` address, or a label hashed with
/// [`Address::from_label`].
pub fn resolve_account(input: &str) -> Result<Address> {
    let input = input.trim();
    if input.is_empty() {
        bail!("account must not be empty");
    }
    if input.starts_with("0x") || input.starts_with("0X") {
        return input
            .parse()
            .with_context(|| format!("invalid address {input}"));
    }
    Ok(Address::from_label(input))
}
