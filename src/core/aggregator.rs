//! Score aggregation and sub-score range policy.
//!
//! The oracle is asked for integers in [1,5] but nothing guarantees it
//! complies. `RangePolicy` decides what happens to values outside that range
//! before they are summed.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::{Dimension, RubricScore};

/// Lowest valid sub-score
pub const MIN_SUB_SCORE: i64 = 1;

/// Highest valid sub-score
pub const MAX_SUB_SCORE: i64 = 5;

/// What to do with a sub-score outside [1,5]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangePolicy {
    /// Pull the value to the nearest bound
    #[default]
    Clamp,

    /// Treat the whole response as a grading failure
    Reject,
}

impl std::str::FromStr for RangePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clamp" => Ok(RangePolicy::Clamp),
            "reject" => Ok(RangePolicy::Reject),
            other => Err(format!("unknown range policy: {} (expected clamp or reject)", other)),
        }
    }
}

/// A sub-score rejected under `RangePolicy::Reject`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{dimension} score {value} is outside {MIN_SUB_SCORE}..={MAX_SUB_SCORE}")]
pub struct OutOfRange {
    pub dimension: Dimension,
    pub value: i64,
}

/// Sum of the five sub-scores
pub fn total(sub_scores: &[u8; 5]) -> u8 {
    sub_scores
        .iter()
        .fold(0u8, |acc, score| acc.saturating_add(*score))
}

/// Apply the range policy to raw oracle sub-scores (rubric order)
pub fn normalize(raw: [i64; 5], policy: RangePolicy) -> Result<[u8; 5], OutOfRange> {
    let mut normalized = [0u8; 5];

    for ((slot, value), dimension) in normalized.iter_mut().zip(raw).zip(Dimension::ALL) {
        let in_range = (MIN_SUB_SCORE..=MAX_SUB_SCORE).contains(&value);
        let value = match (in_range, policy) {
            (true, _) => value,
            (false, RangePolicy::Clamp) => {
                let clamped = value.clamp(MIN_SUB_SCORE, MAX_SUB_SCORE);
                debug!(%dimension, value, clamped, "Clamped out-of-range sub-score");
                clamped
            }
            (false, RangePolicy::Reject) => return Err(OutOfRange { dimension, value }),
        };
        // Bounded to 1..=5 above
        *slot = value as u8;
    }

    Ok(normalized)
}

/// Normalize raw sub-scores and build a graded score with a recomputed total
pub fn aggregate(
    raw: [i64; 5],
    overall_comment: Option<String>,
    policy: RangePolicy,
) -> Result<RubricScore, OutOfRange> {
    let sub_scores = normalize(raw, policy)?;
    Ok(RubricScore::graded(sub_scores, overall_comment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_is_plain_sum() {
        assert_eq!(total(&[1, 1, 1, 1, 1]), 5);
        assert_eq!(total(&[5, 5, 5, 5, 5]), 25);
        assert_eq!(total(&[0, 0, 0, 0, 0]), 0);
    }

    #[test]
    fn test_clamp_policy() {
        let normalized = normalize([0, 7, 3, -2, 5], RangePolicy::Clamp).unwrap();
        assert_eq!(normalized, [1, 5, 3, 1, 5]);
    }

    #[test]
    fn test_reject_policy_names_dimension() {
        let err = normalize([3, 3, 9, 3, 3], RangePolicy::Reject).unwrap_err();
        assert_eq!(err.dimension, Dimension::Logic);
        assert_eq!(err.value, 9);
        assert_eq!(err.to_string(), "logic score 9 is outside 1..=5");
    }

    #[test]
    fn test_aggregate_recomputes_total() {
        let score = aggregate([4, 4, 4, 4, 4], Some("fine".to_string()), RangePolicy::Clamp).unwrap();
        assert_eq!(score.total_score, 20);
        assert_eq!(score.overall_comment.as_deref(), Some("fine"));
    }

    #[test]
    fn test_total_always_in_valid_range_after_clamp() {
        for raw in [[-100, 0, 1, 2, 3], [6, 60, 600, 5, 4], [1, 1, 1, 1, 1]] {
            let score = aggregate(raw, None, RangePolicy::Clamp).unwrap();
            assert!((5..=25).contains(&score.total_score));
            assert_eq!(score.total_score, total(&score.sub_scores()));
        }
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("clamp".parse::<RangePolicy>().unwrap(), RangePolicy::Clamp);
        assert_eq!("REJECT".parse::<RangePolicy>().unwrap(), RangePolicy::Reject);
        assert!("ignore".parse::<RangePolicy>().is_err());
    }
}
