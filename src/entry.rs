//! Ranked entry types produced by the sparse adapters and consumed by the
//! placers.

use rand::distributions::Alphanumeric;
use rand::rngs::SmallRng;
use rand::Rng;

use crate::error::{AggregateError, Result};

/// A ranked 1-D interval in global genome coordinates.
///
/// `chrom_offset = start - local_start` lets a consumer recover the
/// per-chromosome coordinates without the assembly at hand.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalEntry {
    pub uid: String,
    pub start: i64,
    pub end: i64,
    pub chrom_offset: i64,
    pub importance: f64,
    /// The raw record fields, tab-joined.
    pub fields: String,
}

/// A ranked rectangle over the 2-D genome x genome space.
#[derive(Debug, Clone, PartialEq)]
pub struct PairEntry {
    pub uid: String,
    /// Footprint along the first axis: `[gx0, gx1)`.
    pub xs: [i64; 2],
    /// Footprint along the second axis: `[gy0, gy1)`.
    pub ys: [i64; 2],
    pub chrom_offset: i64,
    pub importance: f64,
    pub fields: String,
}

/// How an adapter derives the importance of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportanceRule {
    /// The span of the feature (for pairs, the larger of the two spans).
    Span,
    /// A uniform draw in `[0, 1)`, effectively random sampling.
    Random,
    /// A fixed field, stored as a 0-based index.
    Column(usize),
}

impl ImportanceRule {
    /// Parse the CLI form: absent means span, the literal `random` means a
    /// uniform draw, anything else is a 1-based column index.
    pub fn parse(arg: Option<&str>) -> Result<Self> {
        match arg {
            None => Ok(ImportanceRule::Span),
            Some("random") => Ok(ImportanceRule::Random),
            Some(s) => {
                let col: usize = s.parse().map_err(|_| {
                    AggregateError::Unsupported(format!(
                        "importance column must be 'random' or a 1-based column index, got '{}'",
                        s
                    ))
                })?;
                if col == 0 {
                    return Err(AggregateError::Unsupported(
                        "importance column indices are 1-based".to_string(),
                    ));
                }
                Ok(ImportanceRule::Column(col - 1))
            }
        }
    }
}

/// Generate an opaque unique identifier for an entry.
pub fn new_uid(rng: &mut SmallRng) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_importance_rule_parse() {
        assert_eq!(ImportanceRule::parse(None).unwrap(), ImportanceRule::Span);
        assert_eq!(
            ImportanceRule::parse(Some("random")).unwrap(),
            ImportanceRule::Random
        );
        assert_eq!(
            ImportanceRule::parse(Some("5")).unwrap(),
            ImportanceRule::Column(4)
        );
        assert!(ImportanceRule::parse(Some("0")).is_err());
        assert!(ImportanceRule::parse(Some("score")).is_err());
    }

    #[test]
    fn test_uid_unique() {
        let mut rng = SmallRng::seed_from_u64(7);
        let a = new_uid(&mut rng);
        let b = new_uid(&mut rng);
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }
}
