//! UUID utilities

use crate::{Error, Result};
use uuid::Uuid;

/// Length of the canonical hyphenated form (8-4-4-4-12)
const CANONICAL_LEN: usize = 36;

/// Parse a UUID that must be in canonical hyphenated form
///
/// `Uuid::parse_str` also accepts the simple, braced and URN forms. Identifiers
/// coming back from the database are always hyphenated, so anything else means
/// the value was not produced by the database.
pub fn parse_canonical(s: &str) -> Result<Uuid> {
    if s.len() != CANONICAL_LEN {
        return Err(Error::InvalidInput(format!(
            "not a canonical UUID (expected {} characters, got {}): {:?}",
            CANONICAL_LEN,
            s.len(),
            s
        )));
    }
    Uuid::parse_str(s).map_err(|e| Error::InvalidInput(format!("invalid UUID {:?}: {}", s, e)))
}
