//! Core case workflow logic
//!
//! Pure transition functions over the `Case` aggregate: the status state
//! machine, the phased disbursement ledger with victim verification, the
//! officer/victim query channel, and human-facing identifier generation.
//! Everything here is synchronous and storage-free so the invariants can be
//! unit-tested without a database; the service layer wires these into
//! read-modify-write cycles.

pub mod case_id;
pub mod channel;
pub mod ledger;
pub mod status;

pub use ledger::{PHASE_PERCENTAGES, SaveOutcome, VerifyOutcome};
