//! External project identifiers: `proj_<unix seconds>_<8 lowercase alnum>`.

use rand::distr::Alphanumeric;
use rand::Rng;

use crate::error::CoreError;
use crate::types::Timestamp;

pub const PROJECT_ID_PREFIX: &str = "proj_";
const SUFFIX_LEN: usize = 8;
const MAX_EXTERNAL_ID_LEN: usize = 64;

/// Generate a fresh external id for a project created at `now`.
pub fn generate_external_id(now: Timestamp) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    format!("{PROJECT_ID_PREFIX}{}_{suffix}", now.timestamp())
}

/// Reject ids that could never have been issued.
///
/// Only the character set and length are checked so older ids without the
/// timestamp segment still resolve.
pub fn validate_external_id(id: &str) -> Result<(), CoreError> {
    if id.is_empty() || id.len() > MAX_EXTERNAL_ID_LEN {
        return Err(CoreError::Validation(
            "Project id must be 1-64 characters".to_string(),
        ));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(CoreError::Validation(
            "Project id may only contain letters, digits, '_' and '-'".to_string(),
        ));
    }
    Ok(())
}
