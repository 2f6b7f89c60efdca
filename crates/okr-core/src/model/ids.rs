//! ID generation for objectives, key results, and log entries.
//!
//! Uses short prefixed slugs: obj-xxxxxxxxxx, kr-xxxxxxxxxx, log-xxxxxxxxxx

use anyhow::{anyhow, Result};

/// Prefix for objective IDs
const OBJECTIVE_PREFIX: &str = "obj";
/// Prefix for key result IDs
const KEY_RESULT_PREFIX: &str = "kr";
/// Prefix for log entry IDs
const LOG_PREFIX: &str = "log";

/// Length of the random suffix (in base36 chars)
const SUFFIX_LEN: usize = 10;

const CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a base36 suffix from OS randomness.
fn base36_suffix(len: usize) -> Result<String> {
    let mut bytes = [0u8; 8];
    getrandom::fill(&mut bytes)
        .map_err(|e| anyhow!("Failed to read OS randomness for id: {e}"))?;

    let mut n = u64::from_le_bytes(bytes);
    let mut result = String::with_capacity(len);
    while result.len() < len {
        result.push(char::from(CHARS[usize::try_from(n % 36).unwrap_or(0)]));
        n /= 36;
    }

    Ok(result)
}

/// Generate a new objective ID (e.g., "obj-4k2d9a0zq1")
pub fn new_objective_id() -> Result<String> {
    Ok(format!("{OBJECTIVE_PREFIX}-{}", base36_suffix(SUFFIX_LEN)?))
}

/// Generate a new key result ID (e.g., "kr-0b81mzz3ka")
pub fn new_key_result_id() -> Result<String> {
    Ok(format!("{KEY_RESULT_PREFIX}-{}", base36_suffix(SUFFIX_LEN)?))
}

/// Generate a new log entry ID (e.g., "log-x9q2m41ab0")
pub fn new_log_id() -> Result<String> {
    Ok(format!("{LOG_PREFIX}-{}", base36_suffix(SUFFIX_LEN)?))
}

/// Check if a string looks like a generated objective ID
#[must_use]
pub fn is_objective_id(s: &str) -> bool {
    has_shape(s, OBJECTIVE_PREFIX)
}

/// Check if a string looks like a generated key result ID
#[must_use]
pub fn is_key_result_id(s: &str) -> bool {
    has_shape(s, KEY_RESULT_PREFIX)
}

fn has_shape(s: &str, prefix: &str) -> bool {
    s.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|suffix| {
            suffix.len() == SUFFIX_LEN && suffix.bytes().all(|b| CHARS.contains(&b))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_objective_id_format() {
        let id = new_objective_id().unwrap();
        assert!(id.starts_with("obj-"), "ID should start with 'obj-': {id}");
        assert_eq!(id.len(), 14, "ID should be 14 chars: {id}");
        assert!(is_objective_id(&id));
    }

    #[test]
    fn test_key_result_id_format() {
        let id = new_key_result_id().unwrap();
        assert!(id.starts_with("kr-"), "ID should start with 'kr-': {id}");
        assert!(is_key_result_id(&id));
        assert!(!is_objective_id(&id));
    }

    #[test]
    fn test_log_id_format() {
        let id = new_log_id().unwrap();
        assert!(id.starts_with("log-"));
        assert_eq!(id.len(), 14);
    }

    #[test]
    fn test_uniqueness() {
        let mut ids: HashSet<String> = HashSet::new();
        for _ in 0..500 {
            let id = new_key_result_id().unwrap();
            assert!(ids.insert(id.clone()), "Generated duplicate ID: {id}");
        }
    }

    #[test]
    fn test_validators() {
        assert!(is_objective_id("obj-abcd012345"));
        assert!(!is_objective_id("obj-abcd"));
        assert!(!is_objective_id("kr-abcd012345"));
        assert!(!is_key_result_id("kr-ABCD012345"));
    }
}
