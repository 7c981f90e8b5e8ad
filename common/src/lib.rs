//! Shared types used by both binaries of the payments engine.
//!
//! Kept deliberately small: money representation is the one piece of
//! vocabulary that the HTTP layer, the domain layer, and persistence all
//! need to agree on bit-for-bit.

pub mod money;

pub use money::{cents_to_dollars, dollars_to_cents, Currency, CurrencyError};
