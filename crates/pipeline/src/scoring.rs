//! Deterministic scoring math.
//!
//! Weight normalization and weighted aggregation are pure functions with no
//! I/O; everything the model contributes (raw weights, raw scores) passes
//! through here before entering a typed domain value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Criterion, CriteriaSet, OptionScore, Score, Weight, WEIGHT_SUM_TOLERANCE};

/// A criterion as produced by the model, before weight normalization.
///
/// Raw weights are accepted when finite and non-negative; values above 1.0
/// are legal here and scaled down by [`normalize_weights`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCriterion {
    /// Criterion name.
    pub name: String,
    /// Unnormalized weight (finite, non-negative).
    pub weight: f64,
    /// Why this criterion matters for the decision.
    pub rationale: String,
}

/// A failure while normalizing or aggregating criteria weights.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    /// The criteria list was empty; normalization never silently returns.
    #[error("cannot normalize weights: criteria list is empty")]
    EmptyCriteria,

    /// A raw weight was negative, infinite, or NaN.
    #[error("criterion '{name}' has invalid weight {weight}")]
    InvalidWeight {
        /// Offending criterion name.
        name: String,
        /// Offending raw weight value.
        weight: f64,
    },

    /// A criterion name was empty.
    #[error("criterion at index {index} has an empty name")]
    EmptyCriterionName {
        /// Zero-based index of the offending criterion.
        index: usize,
    },

    /// The normalized weights did not sum to 1.0 within tolerance.
    #[error("weights do not sum to 1.0 after normalization: {sum}")]
    UnnormalizedSum {
        /// Observed post-normalization sum.
        sum: f64,
    },
}

/// Normalizes raw criterion weights to sum to 1.0.
///
/// If every weight is exactly zero, each criterion receives equal weight
/// `1/n`; otherwise each weight is scaled by `1/total`, preserving relative
/// proportions. The post-condition (sum within ±1e-3 of 1.0) is re-checked
/// and violations fail rather than returning a malformed set.
pub fn normalize_weights(raw: Vec<RawCriterion>) -> Result<CriteriaSet, ScoringError> {
    if raw.is_empty() {
        return Err(ScoringError::EmptyCriteria);
    }
    for (index, criterion) in raw.iter().enumerate() {
        if criterion.name.is_empty() {
            return Err(ScoringError::EmptyCriterionName { index });
        }
        if !criterion.weight.is_finite() || criterion.weight < 0.0 {
            return Err(ScoringError::InvalidWeight {
                name: criterion.name.clone(),
                weight: criterion.weight,
            });
        }
    }

    let total: f64 = raw.iter().map(|c| c.weight).sum();
    let count = raw.len();

    let mut criteria = Vec::with_capacity(count);
    for (index, c) in raw.into_iter().enumerate() {
        let normalized = if total == 0.0 {
            1.0 / count as f64
        } else {
            c.weight / total
        };
        let weight = Weight::new(normalized).ok_or(ScoringError::UnnormalizedSum { sum: normalized })?;
        let criterion =
            Criterion::new(c.name, weight, c.rationale).ok_or(ScoringError::EmptyCriterionName { index })?;
        criteria.push(criterion);
    }

    let sum: f64 = criteria.iter().map(|c| c.weight.as_f64()).sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(ScoringError::UnnormalizedSum { sum });
    }

    CriteriaSet::new(criteria).ok_or(ScoringError::EmptyCriteria)
}

/// Computes the weighted total `Σ score_i × weight_i` over matching criteria.
///
/// Breakdown entries whose `criterion_name` has no matching criterion
/// contribute nothing. With weights summing to 1 and scores in `[0, 1]` the
/// result is in `[0, 1]` by construction; the final clamp only absorbs
/// floating-point drift.
pub fn weighted_total(breakdown: &[OptionScore], criteria: &CriteriaSet) -> Score {
    let total: f64 = breakdown
        .iter()
        .filter_map(|entry| {
            criteria
                .weight_for(&entry.criterion_name)
                .map(|weight| entry.score.as_f64() * weight.as_f64())
        })
        .sum();
    Score::clamped(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, weight: f64) -> RawCriterion {
        RawCriterion {
            name: name.to_string(),
            weight,
            rationale: format!("{name} matters"),
        }
    }

    #[test]
    fn normalization_scales_to_sum_one() {
        let set = normalize_weights(vec![raw("cost", 2.0), raw("time", 6.0)]).unwrap();
        let sum: f64 = set.iter().map(|c| c.weight.as_f64()).sum();
        assert!((sum - 1.0).abs() < 1e-3);
        assert!((set.weight_for("cost").unwrap().as_f64() - 0.25).abs() < 1e-9);
        assert!((set.weight_for("time").unwrap().as_f64() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn normalization_preserves_proportions() {
        let set = normalize_weights(vec![raw("a", 0.3), raw("b", 0.6), raw("c", 0.9)]).unwrap();
        let a = set.weight_for("a").unwrap().as_f64();
        let b = set.weight_for("b").unwrap().as_f64();
        // a/b was 0.5 before scaling and must remain 0.5 after.
        assert!((a / b - 0.5).abs() < 1e-9);
    }

    #[test]
    fn all_zero_weights_distribute_equally() {
        let set = normalize_weights(vec![raw("a", 0.0), raw("b", 0.0), raw("c", 0.0), raw("d", 0.0)])
            .unwrap();
        for criterion in set.iter() {
            assert!((criterion.weight.as_f64() - 0.25).abs() < 1e-9);
        }
    }

    #[test]
    fn empty_criteria_list_fails() {
        assert_eq!(normalize_weights(Vec::new()), Err(ScoringError::EmptyCriteria));
    }

    #[test]
    fn negative_weight_fails() {
        let err = normalize_weights(vec![raw("a", -0.5), raw("b", 0.5)]).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidWeight { .. }));
    }

    #[test]
    fn weighted_total_matches_hand_computation() {
        let set = normalize_weights(vec![raw("cost", 0.6), raw("time", 0.4)]).unwrap();
        let breakdown = vec![
            OptionScore {
                criterion_name: "cost".to_string(),
                score: Score::clamped(0.8),
                justification: "cheap".to_string(),
            },
            OptionScore {
                criterion_name: "time".to_string(),
                score: Score::clamped(0.6),
                justification: "quick".to_string(),
            },
        ];
        let total = weighted_total(&breakdown, &set);
        assert!((total.as_f64() - 0.72).abs() < 1e-3);
    }

    #[test]
    fn weighted_total_ignores_unknown_criteria() {
        let set = normalize_weights(vec![raw("cost", 1.0)]).unwrap();
        let breakdown = vec![OptionScore {
            criterion_name: "nonexistent".to_string(),
            score: Score::clamped(0.9),
            justification: "n/a".to_string(),
        }];
        assert_eq!(weighted_total(&breakdown, &set).as_f64(), 0.0);
    }

    #[test]
    fn weighted_total_stays_in_unit_interval() {
        let set = normalize_weights(vec![raw("a", 1.0), raw("b", 3.0)]).unwrap();
        let breakdown: Vec<OptionScore> = set
            .iter()
            .map(|c| OptionScore {
                criterion_name: c.name.clone(),
                score: Score::clamped(1.0),
                justification: "max".to_string(),
            })
            .collect();
        let total = weighted_total(&breakdown, &set);
        assert!(total.as_f64() <= 1.0);
        assert!(total.as_f64() >= 0.0);
    }
}
