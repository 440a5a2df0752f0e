//! Service layer: orchestration, authorization, and persistence cycles
//!
//! Services load the aggregate, apply domain transitions, and persist
//! through the versioned save, retrying a bounded number of times when a
//! concurrent writer wins the race. All role and ownership checks live
//! here; the HTTP layer only extracts identity and shapes the envelope.

pub mod cases;
pub mod documents;
pub mod tickets;

pub use cases::{CaseService, NewCase, SaveDisbursementRequest, TrackView};
pub use documents::{DocumentService, DocumentUpload};
pub use tickets::{NewTicket, TicketService};

/// How many times a read-modify-write cycle is retried after losing an
/// optimistic-concurrency race
pub(crate) const MAX_VERSION_RETRIES: u32 = 3;
