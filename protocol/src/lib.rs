// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # VISA Protocol — Shared Primitives
//!
//! The vocabulary every VISA component speaks. Nothing in here knows what a
//! campaign is; it only knows who is calling, how much money is moving, and
//! what time it is.
//!
//! ## Modules
//!
//! - **address** — 20-byte account addresses with `0x`-hex encoding.
//! - **amount** — 18-decimal fixed-point amounts and unit conversion.
//! - **clock** — Where "now" comes from. System time in production, a
//!   hand-cranked clock in tests.
//! - **native** — Base-currency (ETH) balances held by the host environment.
//! - **config** — Protocol constants and genesis parameters.
//!
//! ## Design Philosophy
//!
//! 1. Money is `u128` wei and every operation on it is checked.
//! 2. Addresses are values, not strings. Parse once at the boundary.
//! 3. Time is injected. Nothing below the binary calls the system clock
//!    directly.

pub mod address;
pub mod amount;
pub mod clock;
pub mod config;
pub mod native;

pub use address::{Address, AddressError};
pub use amount::{Amount, AmountError};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use native::{NativeError, NativeLedger};
