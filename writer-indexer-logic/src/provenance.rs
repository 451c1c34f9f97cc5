//! Correlation ids the relay appends to the call data of the transactions it submits.
//!
//! The token is the last 35 bytes of call data: the ascii prefix `syn` followed by the
//! 32 characters of a uuid without hyphens.

use std::fmt;

const TOKEN_LENGTH: usize = 35;
const TOKEN_PREFIX: &str = "syn";
const UUID_GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

/// Relay transaction id in canonical 8-4-4-4-12 form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Accepts either the canonical form or the 32 characters without hyphens.
    pub fn parse(value: &str) -> Option<Self> {
        let compact: String = value.chars().filter(|c| *c != '-').collect();
        if value.len() != compact.len() && value.len() != 36 {
            return None;
        }
        from_compact(&compact)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extracts the correlation id from raw call data. Returns `None` for every
/// transaction that was not submitted through the relay.
pub fn decode_correlation_id(call_data: &[u8]) -> Option<CorrelationId> {
    let start = call_data.len().checked_sub(TOKEN_LENGTH)?;
    let token = std::str::from_utf8(&call_data[start..]).ok()?;
    let compact = token.strip_prefix(TOKEN_PREFIX)?;
    from_compact(compact)
}

fn from_compact(compact: &str) -> Option<CorrelationId> {
    if compact.len() != 32 || !compact.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    let mut canonical = String::with_capacity(36);
    let mut offset = 0;
    for (i, len) in UUID_GROUPS.into_iter().enumerate() {
        if i > 0 {
            canonical.push('-');
        }
        canonical.push_str(&compact[offset..offset + len]);
        offset += len;
    }
    Some(CorrelationId(canonical.to_ascii_lowercase()))
}
