//! # VISA Crowdfunding Contracts
//!
//! Ledger logic for visa crowdfunding campaigns and the VISAT reward token:
//!
//! - **Reward Token** — a capped fungible token whose only minter is the
//!   campaign ledger, registered exactly once at wiring time.
//! - **Campaign Ledger** — campaign creation, contribution intake with
//!   proportional VISAT rewards, and the one-time creator payout.
//! - **Chain** — the host environment: caller identity, attached value,
//!   the clock, and all-or-nothing execution of every operation.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow — we use `checked_add` and
//!    `checked_mul` everywhere, because wrapping arithmetic and money do not
//!    mix.
//! 2. Validate everything, then mutate. A rejected call returns before the
//!    first write; the host's snapshot rollback is the second line.
//! 3. Authorization is address equality. Who the caller is gets decided by
//!    the host, not argued about here.
//! 4. Every public type is serializable (serde) so the whole chain can be
//!    written to disk and read back.

pub mod campaign_ledger;
pub mod chain;
pub mod events;
pub mod reward_token;

pub use campaign_ledger::{Campaign, CampaignId, CampaignLedger, CampaignStatus, LedgerError};
pub use chain::{Chain, ChainError, ChainSnapshot, ChainState, Receipt};
pub use events::Event;
pub use reward_token::{RewardToken, TokenError};
