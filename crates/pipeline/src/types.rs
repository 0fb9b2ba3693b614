//! Shared value types for the DecisionFlow domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types
//! carry meaningful values with invariants (weights and scores are in
//! `[0.0, 1.0]`, criteria sets sum to one) and participate in domain
//! computations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ApiVersion, LogicVersion, SchemaVersion};

/// Tolerance applied when checking that a criteria set's weights sum to 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-3;

// ---------------------------------------------------------------------------
// Bounded-float newtypes
// ---------------------------------------------------------------------------

/// A criterion weight in the range `[0.0, 1.0]`.
///
/// Weights within one [`CriteriaSet`] sum to 1.0; see
/// [`crate::scoring::normalize_weights`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Weight(f64);

impl Weight {
    /// Creates a [`Weight`], returning `None` if `value` is outside the
    /// valid range `[0.0, 1.0]` or not finite.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Returns the weight as an `f64` in `[0.0, 1.0]`.
    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for Weight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

// ---------------------------------------------------------------------------

/// A per-criterion or aggregate option score in the range `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Score(f64);

impl Score {
    /// Creates a [`Score`], returning `None` if `value` is outside the
    /// valid range `[0.0, 1.0]` or not finite.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Creates a [`Score`] by saturating `value` into `[0.0, 1.0]`.
    ///
    /// Values below 0 become 0, values above 1 become 1, and non-finite
    /// values become 0. Model-produced scores are clamped silently; clamping
    /// is not an error.
    pub fn clamped(value: f64) -> Self {
        if !value.is_finite() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// Returns the score as an `f64` in `[0.0, 1.0]`.
    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

// ---------------------------------------------------------------------------

/// A confidence value in the range `[0.0, 1.0]`.
///
/// Used for the synthesizer's overall confidence and each factor of the
/// [`ConfidenceBreakdown`]. Unlike [`Score`], confidence is never clamped:
/// an out-of-range value from the model is a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Confidence(f64);

impl Confidence {
    /// Creates a [`Confidence`], returning `None` if `value` is outside the
    /// valid range `[0.0, 1.0]` or not finite.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Returns the confidence as an `f64` in `[0.0, 1.0]`.
    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

/// An evaluation criterion with its normalized weight and rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    /// Criterion name (non-empty; the join key for per-option score breakdowns).
    pub name: String,
    /// Normalized weight in `[0.0, 1.0]`.
    pub weight: Weight,
    /// Why this criterion matters for the decision.
    pub rationale: String,
}

impl Criterion {
    /// Creates a [`Criterion`], returning `None` if `name` is empty.
    pub fn new(name: impl Into<String>, weight: Weight, rationale: impl Into<String>) -> Option<Self> {
        let name = name.into();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name,
            weight,
            rationale: rationale.into(),
        })
    }
}

// ---------------------------------------------------------------------------

/// A non-empty set of criteria whose weights sum to 1.0 within
/// [`WEIGHT_SUM_TOLERANCE`].
///
/// Produced by [`crate::scoring::normalize_weights`]; the constructor
/// re-checks the invariant so a `CriteriaSet` in hand is always usable for
/// weighted aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CriteriaSet(Vec<Criterion>);

impl CriteriaSet {
    /// Creates a [`CriteriaSet`], returning `None` if `criteria` is empty or
    /// the weights do not sum to 1.0 within tolerance.
    #[must_use]
    pub fn new(criteria: Vec<Criterion>) -> Option<Self> {
        if criteria.is_empty() {
            return None;
        }
        let sum: f64 = criteria.iter().map(|c| c.weight.as_f64()).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return None;
        }
        Some(Self(criteria))
    }

    /// Returns the criteria as a slice.
    pub fn as_slice(&self) -> &[Criterion] {
        &self.0
    }

    /// Returns the number of criteria.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set holds no criteria. Always `false` for a
    /// constructed set; present for API completeness.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the criteria.
    pub fn iter(&self) -> std::slice::Iter<'_, Criterion> {
        self.0.iter()
    }

    /// Returns the weight of the criterion named `name`, if present.
    pub fn weight_for(&self, name: &str) -> Option<Weight> {
        self.0.iter().find(|c| c.name == name).map(|c| c.weight)
    }
}

// ---------------------------------------------------------------------------
// Bias findings
// ---------------------------------------------------------------------------

/// The closed set of cognitive bias categories the Bias Checker may report.
///
/// Ingestion is case-insensitive ([`BiasType::parse`]); the canonical form
/// is lowercase snake_case. An unrecognized category is a validation
/// failure, never silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasType {
    /// Continuing because of already-spent resources.
    SunkCost,
    /// Favouring evidence that supports a pre-existing preference.
    Confirmation,
    /// Systematically underestimating cost, time, or risk.
    Optimism,
    /// Deferring to a source's status rather than its evidence.
    Authority,
}

/// Canonical names of every allowed bias type, for error messages.
pub const ALLOWED_BIAS_TYPES: [&str; 4] = ["sunk_cost", "confirmation", "optimism", "authority"];

impl BiasType {
    /// Parses a bias type case-insensitively, returning `None` for values
    /// outside the closed set.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "sunk_cost" => Some(Self::SunkCost),
            "confirmation" => Some(Self::Confirmation),
            "optimism" => Some(Self::Optimism),
            "authority" => Some(Self::Authority),
            _ => None,
        }
    }

    /// Returns the canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SunkCost => "sunk_cost",
            Self::Confirmation => "confirmation",
            Self::Optimism => "optimism",
            Self::Authority => "authority",
        }
    }
}

impl std::fmt::Display for BiasType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------

/// One detected cognitive bias with its supporting evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasFinding {
    /// Canonicalized bias category.
    pub bias_type: BiasType,
    /// Description of how the bias manifests in this decision.
    pub description: String,
    /// Evidence or context supporting the finding.
    pub evidence: String,
}

// ---------------------------------------------------------------------------
// Option scores
// ---------------------------------------------------------------------------

/// One option's score against a single criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionScore {
    /// Name of the criterion being scored (matches a [`Criterion::name`]).
    pub criterion_name: String,
    /// Score in `[0.0, 1.0]` (clamped at ingestion).
    pub score: Score,
    /// Justification for this score.
    pub justification: String,
}

/// One option's scores across all criteria plus the weighted aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionScores {
    /// Weighted total `Σ score_i × weight_i`, in `[0.0, 1.0]` by construction.
    pub total_score: Score,
    /// Per-criterion scores.
    pub breakdown: Vec<OptionScore>,
}

// ---------------------------------------------------------------------------
// Confidence breakdown
// ---------------------------------------------------------------------------

/// The four independent factors justifying the scalar confidence value.
///
/// All four are mandatory on the synthesizer's output and each is
/// independently bounds-checked at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    /// How complete the caller's input was.
    pub input_completeness: Confidence,
    /// How strongly the agents' outputs agree with each other.
    pub agent_agreement: Confidence,
    /// How strong the scoring evidence is.
    pub evidence_strength: Confidence,
    /// How little detected bias affects the recommendation (lower = more bias).
    pub bias_impact: Confidence,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly; the underlying representation can change without affecting the
/// domain API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// Milliseconds elapsed between this timestamp and now.
    pub fn elapsed_ms(self) -> i64 {
        (Utc::now() - self.0).num_milliseconds()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Versioning
// ---------------------------------------------------------------------------

/// Version information echoed in every response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMetadata {
    /// API contract version (e.g. `"v1"`).
    pub api_version: ApiVersion,
    /// Prompt bundle / agent pipeline version (e.g. `"v1.0.0"`).
    pub logic_version: LogicVersion,
    /// JSON schema version (e.g. `"v1.0.0"`).
    pub schema_version: SchemaVersion,
}
