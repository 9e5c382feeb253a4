use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::{MigrateError, Result};

/// A schema version parsed from its directory-name form.
///
/// Versions are non-negative decimal numbers (`0.01`, `1`, `2.10`). Ordering
/// is numeric, so `0.02 > 0.01` and `2.9 > 2.10`. The textual form is
/// preserved for display and for insertion into the bookkeeping tables, but
/// equality and ordering ignore it: `0`, `0.0` and `0.00` are the same
/// version. Zero is the sentinel for "schema absent".
#[derive(Debug, Clone)]
pub struct Version {
    text: String,
    whole: u64,
    // Fractional digits with trailing zeros stripped, e.g. "01" for 0.01.
    frac: String,
}

impl Version {
    /// Parse a version from its canonical textual form.
    pub fn parse(text: &str) -> Result<Self> {
        let bad = || MigrateError::BadVersionSyntax(text.to_string());

        let (whole_part, frac_part) = match text.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (text, ""),
        };
        if whole_part.is_empty() || !whole_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        if text.contains('.') && (frac_part.is_empty() || !frac_part.bytes().all(|b| b.is_ascii_digit())) {
            return Err(bad());
        }
        let whole: u64 = whole_part.parse().map_err(|_| bad())?;
        let frac = frac_part.trim_end_matches('0').to_string();

        Ok(Version {
            text: text.to_string(),
            whole,
            frac,
        })
    }

    /// The sentinel version denoting "schema absent".
    pub fn zero() -> Self {
        Version {
            text: "0".to_string(),
            whole: 0,
            frac: String::new(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.whole == 0 && self.frac.is_empty()
    }

    /// The textual form this version was parsed from.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

// Fractional digit strings compare as decimals: pad the shorter with
// trailing zeros, then compare digit by digit.
fn cmp_frac(a: &str, b: &str) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let da = a.as_bytes().get(i).copied().unwrap_or(b'0');
        let db = b.as_bytes().get(i).copied().unwrap_or(b'0');
        match da.cmp(&db) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.whole == other.whole && self.frac == other.frac
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.whole
            .cmp(&other.whole)
            .then_with(|| cmp_frac(&self.frac, &other.frac))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.whole.hash(state);
        self.frac.hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Version {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}
