//! Human-facing identifier formats
//!
//! Case ids: `DBT-<year>-<DISTRICTCODE>-<seq>`, sequence per
//! (year, district) and zero-padded to 3 digits. Ticket ids:
//! `GRV-<year>-<seq>` with a global 4-digit-padded sequence. Case sequences
//! are derived by scanning the latest existing id under the prefix; the
//! storage unique index is the backstop for concurrent collisions.

/// Prefix for relief-case identifiers (Direct Benefit Transfer)
pub const CASE_ID_PREFIX: &str = "DBT";

/// Prefix for grievance-ticket identifiers
pub const TICKET_ID_PREFIX: &str = "GRV";

/// District code: upper-cased with all whitespace removed,
/// e.g. "South Delhi" -> "SOUTHDELHI"
pub fn district_code(district: &str) -> String {
    district
        .split_whitespace()
        .collect::<String>()
        .to_uppercase()
}

/// `DBT-<year>-<DISTRICTCODE>` prefix shared by all cases of one district
/// in one year
pub fn case_id_prefix(district: &str, year: i32) -> String {
    format!("{}-{}-{}", CASE_ID_PREFIX, year, district_code(district))
}

/// Render a full case id; the sequence grows past 3 digits without
/// truncation
pub fn format_case_id(prefix: &str, sequence: u32) -> String {
    format!("{}-{:03}", prefix, sequence)
}

/// Parse the trailing sequence number out of an existing case id
pub fn sequence_of(case_id: &str) -> Option<u32> {
    case_id.rsplit('-').next()?.parse().ok()
}

/// Next case id under a prefix given the most recently issued id, if any
pub fn next_case_id(prefix: &str, last_issued: Option<&str>) -> String {
    let next = last_issued
        .and_then(sequence_of)
        .map(|n| n + 1)
        .unwrap_or(1);
    format_case_id(prefix, next)
}

/// Render a ticket id from the atomically incremented global counter
pub fn format_ticket_id(year: i32, sequence: i64) -> String {
    format!("{}-{}-{:04}", TICKET_ID_PREFIX, year, sequence)
}
