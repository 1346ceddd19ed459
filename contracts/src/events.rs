//! # Contract Events
//!
//! Events are the observable side effects of a committed operation: what
//! happened, with which fields. Each contract buffers the events it emits
//! in its own [`EventLog`]; the host drains the buffers when the operation
//! commits and discards them when it rolls back. An event therefore never
//! announces something that did not happen.

use serde::{Deserialize, Serialize};

use visa_protocol::amount::serde_decimal;
use visa_protocol::{Address, Amount, Timestamp};

use crate::campaign_ledger::CampaignId;

/// Everything the contracts can announce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Event {
    /// VISAT moved between two holders.
    Transfer {
        from: Address,
        to: Address,
        #[serde(with = "serde_decimal")]
        amount: Amount,
    },

    /// A holder set a spender's allowance.
    Approval {
        owner: Address,
        spender: Address,
        #[serde(with = "serde_decimal")]
        amount: Amount,
    },

    /// A new campaign was opened.
    CampaignCreated {
        id: CampaignId,
        country: String,
        #[serde(with = "serde_decimal")]
        goal: Amount,
        deadline: Timestamp,
        creator: Address,
    },

    /// A contribution was accepted and rewarded.
    VisaPurchased {
        id: CampaignId,
        contributor: Address,
        #[serde(with = "serde_decimal")]
        eth_amount: Amount,
        #[serde(with = "serde_decimal")]
        reward: Amount,
    },

    /// A campaign was closed and its funds paid to the creator.
    CampaignFinalized { id: CampaignId },
}

impl Event {
    /// The event's name as it appears in logs and receipts.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Transfer { .. } => "Transfer",
            Event::Approval { .. } => "Approval",
            Event::CampaignCreated { .. } => "CampaignCreated",
            Event::VisaPurchased { .. } => "VisaPurchased",
            Event::CampaignFinalized { .. } => "CampaignFinalized",
        }
    }
}

/// Per-contract buffer of events emitted by the operation in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    pending: Vec<Event>,
}

impl EventLog {
    /// Records an event.
    pub fn emit(&mut self, event: Event) {
        tracing::debug!(event = event.name(), "event emitted");
        self.pending.push(event);
    }

    /// Removes and returns everything emitted since the last drain.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending)
    }

    /// Events emitted since the last drain.
    pub fn pending(&self) -> &[Event] {
        &self.pending
    }
}
