use super::{DataLayout, DataShape, HardwareCatalog, HardwareSpec};
use crate::input::RawData;
use serde::Serialize;

// Confidence weights, out of 100
const LAYOUT_WEIGHT: f64 = 40.0;
const DEFAULT_LAYOUT_WEIGHT: f64 = 20.0;
const GRID_WEIGHT: f64 = 30.0;
const FILENAME_WEIGHT: f64 = 20.0;
const PRIORITY_1_BONUS: f64 = 10.0;
const PRIORITY_2_BONUS: f64 = 5.0;

const EXACT_MATCH_CONFIDENCE: f64 = 90.0;
const PARTIAL_MATCH_CONFIDENCE: f64 = 60.0;
const FALLBACK_CONFIDENCE: f64 = 50.0;

/// Filename keywords per category, and the spec-id fragments they point at
const FILENAME_HINTS: &[(&[&str], &[&str])] = &[
    (&["gait", "walk", "步态"], &["walkway", "gait"]),
    (&["foot", "足"], &["foot"]),
    (&["hip", "臀"], &["hip"]),
];

/// Confidence tier of a hardware match, best first
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    ExactMatch,
    PartialMatch,
    Fallback,
    ErrorRecovery,
}

/// Outcome of hardware classification; always carries a usable spec
#[derive(Clone, Debug, Serialize)]
pub struct MatchResult {
    pub tier: MatchTier,
    pub spec: HardwareSpec,
    pub confidence: f64, // 0-100
    pub message: String,
}

impl MatchResult {
    /// Tiers below a partial match run on the generic spec
    pub fn is_degraded(&self) -> bool {
        matches!(self.tier, MatchTier::Fallback | MatchTier::ErrorRecovery)
    }
}

/// Classifies raw input against the hardware catalog
///
/// # Scoring
/// - Layout tag equal to the detected layout: +40 (+20 for the default
///   layout when the input shape is unknown)
/// - Grid compatible with the detected shape: +30
/// - Filename hint pointing at the spec id: +20
/// - Priority 1: +10, priority 2: +5
///
/// Specs are scored in ascending priority order and the first one reaching
/// 60 is returned: an exact match at 90 or above, a partial match below.
/// A later spec never overrides it, even with a higher score. Without any
/// spec reaching 60 the generic fallback spec is used.
///
/// # Usage
/// ```no_run
/// use pressure_gait_rs::hardware::{HardwareCatalog, HardwareMatcher};
/// use pressure_gait_rs::input::RawData;
///
/// let matcher = HardwareMatcher::new(HardwareCatalog::global());
/// let result = matcher.match_input(&RawData::Text("..."), Some("gait_test.csv"));
/// println!("{} ({:.0}%)", result.spec.name(), result.confidence);
/// ```
pub struct HardwareMatcher<'c> {
    catalog: &'c HardwareCatalog,
}

impl<'c> HardwareMatcher<'c> {
    pub fn new(catalog: &'c HardwareCatalog) -> Self {
        HardwareMatcher { catalog }
    }

    /// Match raw input to known hardware; never fails
    pub fn match_input(&self, raw: &RawData, filename: Option<&str>) -> MatchResult {
        let filename = filename.unwrap_or("").to_lowercase();

        let shape = match DataShape::introspect(raw) {
            Ok(shape) => shape,
            Err(e) => {
                log::warn!("Hardware introspection failed, using error recovery: {}", e);
                return MatchResult {
                    tier: MatchTier::ErrorRecovery,
                    spec: self.catalog.fallback().clone(),
                    confidence: 0.0,
                    message: format!("Error recovery mode: {}", e),
                };
            }
        };
        log::debug!(
            "Input shape: {}x{} ({})",
            shape.row_count,
            shape.col_count,
            shape.layout.tag()
        );

        // Priority order decides: the first spec clearing the partial bar wins
        for spec in self.catalog.by_priority() {
            let confidence = Self::compute_confidence(spec, &shape, &filename);
            let (tier, label) = if confidence >= EXACT_MATCH_CONFIDENCE {
                (MatchTier::ExactMatch, "Exact")
            } else if confidence >= PARTIAL_MATCH_CONFIDENCE {
                (MatchTier::PartialMatch, "Partial")
            } else {
                continue;
            };
            log::info!("{} hardware match: {} ({:.0}%)", label, spec.name(), confidence);
            return MatchResult {
                tier,
                spec: spec.clone(),
                confidence,
                message: format!("{} hardware match: {}", label, spec.name()),
            };
        }

        log::info!("No known hardware matched, using generic algorithm");
        MatchResult {
            tier: MatchTier::Fallback,
            spec: self.catalog.fallback().clone(),
            confidence: FALLBACK_CONFIDENCE,
            message: "Generic algorithm mode".to_string(),
        }
    }

    /// Weighted confidence that `spec` produced data of this shape
    fn compute_confidence(spec: &HardwareSpec, shape: &DataShape, filename: &str) -> f64 {
        let mut confidence = 0.0;

        if spec.layout() == shape.layout {
            confidence += LAYOUT_WEIGHT;
        } else if shape.is_unknown() && spec.layout() == DataLayout::default_layout() {
            confidence += DEFAULT_LAYOUT_WEIGHT;
        }

        if Self::grid_compatible(spec.layout(), shape) {
            confidence += GRID_WEIGHT;
        }

        if Self::filename_hint(spec.id(), filename) {
            confidence += FILENAME_WEIGHT;
        }

        confidence += match spec.priority() {
            1 => PRIORITY_1_BONUS,
            2 => PRIORITY_2_BONUS,
            _ => 0.0,
        };

        confidence.min(100.0)
    }

    fn grid_compatible(layout: DataLayout, shape: &DataShape) -> bool {
        match layout {
            // The dual pad is written either as 64-column rows or 2048-value records
            DataLayout::DualPad2048 => matches!(
                shape.layout,
                DataLayout::DualPad2048 | DataLayout::Packed2048
            ),
            DataLayout::Columns32 => shape.col_count >= 32,
            DataLayout::Packed1024 => shape.layout == DataLayout::Packed1024,
            _ => false,
        }
    }

    /// Only the first keyword category found in the filename counts
    fn filename_hint(spec_id: &str, filename: &str) -> bool {
        FILENAME_HINTS
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| filename.contains(k)))
            .map(|(_, fragments)| fragments.iter().any(|f| spec_id.contains(f)))
            .unwrap_or(false)
    }
}
