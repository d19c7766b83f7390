//! End-to-end analysis: classify, parse, COP, gait and balance
//!
//! Every entry point returns a report. Failures along the way lower the
//! match tier, the parse recovery level, or the outcome status; they never
//! surface as errors or panics to the caller.

use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;

use crate::balance::{BalanceAnalyzer, BalanceMetrics};
use crate::config::PipelineConfig;
use crate::cop;
use crate::error::PipelineError;
use crate::gait::{GaitEventDetector, GaitMetrics};
use crate::hardware::{HardwareCatalog, HardwareMatcher, MatchResult, MatchTier};
use crate::input::RawData;
use crate::parser::{FrameParser, ParseRecovery, ParsedInput};
use crate::types::{GaitSample, Outcome};

/// One named input for batch analysis
#[derive(Clone, Debug)]
pub struct BatchInput {
    /// File name, also used as the hardware hint
    pub name: String,
    pub bytes: Vec<u8>,
}

impl BatchInput {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        BatchInput {
            name: name.into(),
            bytes,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AnalysisReport {
    pub source: Option<String>,
    pub hardware: MatchResult,
    /// Spec the frames were interpreted with; differs from the matched spec
    /// after parse escalation
    pub analyzed_with: String,
    pub recovery: ParseRecovery,
    pub frame_count: usize,
    pub trajectory_len: usize,
    pub gait: Outcome<GaitMetrics>,
    pub balance: Outcome<BalanceMetrics>,
}

impl AnalysisReport {
    /// Whether any stage had to fall back
    pub fn is_degraded(&self) -> bool {
        self.hardware.is_degraded() || self.recovery != ParseRecovery::Native
    }
}

pub struct Pipeline<'c> {
    catalog: &'c HardwareCatalog,
    config: PipelineConfig,
    detector: GaitEventDetector,
}

impl Pipeline<'static> {
    /// Pipeline over the built-in hardware catalog
    pub fn new(config: PipelineConfig) -> Self {
        Pipeline::with_catalog(HardwareCatalog::global(), config)
    }
}

impl Default for Pipeline<'static> {
    fn default() -> Self {
        Pipeline::new(PipelineConfig::default())
    }
}

impl<'c> Pipeline<'c> {
    pub fn with_catalog(catalog: &'c HardwareCatalog, config: PipelineConfig) -> Self {
        let detector = GaitEventDetector::new(config.gait.clone());
        Pipeline {
            catalog,
            config,
            detector,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn analyze(&self, raw: &RawData, filename: Option<&str>) -> AnalysisReport {
        let matched = HardwareMatcher::new(self.catalog).match_input(raw, filename);
        let parsed = FrameParser::parse_with_escalation(raw, &matched.spec, self.catalog.fallback());

        let trajectory = cop::trajectory(&parsed.frames, &parsed.spec);
        let rate = self.config.gait.sample_rate_hz;
        let samples: Vec<GaitSample> = trajectory
            .iter()
            .map(|point| GaitSample::from_cop(point, rate))
            .collect();
        log::info!(
            "{}: {} frames, {} COP points on {}",
            filename.unwrap_or("<input>"),
            parsed.frames.len(),
            trajectory.len(),
            parsed.spec.id()
        );

        let mut gait = self.detector.analyze(&samples);
        let mut balance =
            BalanceAnalyzer::new(&parsed.spec, &self.config.balance).compute(&trajectory);

        if let Some(reason) = degradation_reason(&matched, &parsed) {
            gait = gait.degrade(reason.clone());
            balance = balance.degrade(reason);
        }

        AnalysisReport {
            source: filename.map(str::to_string),
            hardware: matched,
            analyzed_with: parsed.spec.id().to_string(),
            recovery: parsed.recovery,
            frame_count: parsed.frames.len(),
            trajectory_len: trajectory.len(),
            gait,
            balance,
        }
    }

    /// Analyze many inputs on scoped worker threads
    ///
    /// Reports come back in input order. A panic while analyzing one input
    /// turns into an error-recovery report for that input alone.
    pub fn analyze_batch(&self, inputs: &[BatchInput]) -> Vec<AnalysisReport> {
        if inputs.is_empty() {
            return Vec::new();
        }
        let workers = self.worker_count().min(inputs.len());
        let chunk_size = inputs.len().div_ceil(workers);
        log::info!("Batch of {} inputs on {} workers", inputs.len(), workers);

        let scoped = crossbeam::scope(|scope| {
            let handles: Vec<_> = inputs
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move |_| {
                        chunk
                            .iter()
                            .map(|input| self.analyze_isolated(input))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .zip(inputs.chunks(chunk_size))
                .flat_map(|(handle, chunk)| match handle.join() {
                    Ok(reports) => reports,
                    Err(_) => {
                        let error = PipelineError::Worker("worker thread died".into());
                        chunk
                            .iter()
                            .map(|input| self.error_report(Some(input.name.as_str()), &error))
                            .collect()
                    }
                })
                .collect::<Vec<_>>()
        });

        match scoped {
            Ok(reports) => reports,
            Err(_) => {
                let error = PipelineError::Worker("batch scope failed".into());
                inputs
                    .iter()
                    .map(|input| self.error_report(Some(input.name.as_str()), &error))
                    .collect()
            }
        }
    }

    fn analyze_isolated(&self, input: &BatchInput) -> AnalysisReport {
        let raw = RawData::Bytes(&input.bytes);
        let name = Some(input.name.as_str());
        match panic::catch_unwind(AssertUnwindSafe(|| self.analyze(&raw, name))) {
            Ok(report) => report,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                log::warn!("Analysis of {} panicked: {}", input.name, reason);
                self.error_report(name, &PipelineError::Worker(reason))
            }
        }
    }

    /// Self-contained report for an input that could not be analyzed at all
    pub fn error_report(&self, source: Option<&str>, error: &PipelineError) -> AnalysisReport {
        let fallback = self.catalog.fallback();
        let reason = error.to_string();
        AnalysisReport {
            source: source.map(str::to_string),
            hardware: MatchResult {
                tier: MatchTier::ErrorRecovery,
                spec: fallback.clone(),
                confidence: 0.0,
                message: format!("Error recovery mode: {}", reason),
            },
            analyzed_with: fallback.id().to_string(),
            recovery: ParseRecovery::DefaultFrame,
            frame_count: 0,
            trajectory_len: 0,
            gait: Outcome::insufficient(reason.clone()),
            balance: Outcome::insufficient(reason),
        }
    }

    fn worker_count(&self) -> usize {
        match self.config.batch_workers {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }
}

fn degradation_reason(matched: &MatchResult, parsed: &ParsedInput) -> Option<String> {
    match parsed.recovery {
        ParseRecovery::Native if matched.is_degraded() => Some(matched.message.clone()),
        ParseRecovery::Native => None,
        ParseRecovery::Lenient => Some(format!(
            "frames recovered leniently with the {} spec",
            parsed.spec.id()
        )),
        ParseRecovery::DefaultFrame => Some("no frames parsed, analyzed an empty frame".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 32-column CSV: 32 rows per frame, a 2x2 load block moving along the rows
    fn walking_csv(frames: usize) -> String {
        let mut lines = Vec::new();
        for f in 0..frames {
            let block_row = 4 + (f % 20);
            for r in 0..32 {
                let row: Vec<String> = (0..32)
                    .map(|c| {
                        let loaded = (block_row..block_row + 2).contains(&r) && (3..5).contains(&c);
                        if loaded { "90" } else { "0" }.to_string()
                    })
                    .collect();
                lines.push(row.join(","));
            }
        }
        lines.join("\n")
    }

    #[test]
    fn test_native_parse_is_not_degraded() {
        let csv = walking_csv(12);
        let report = Pipeline::default().analyze(&RawData::Text(&csv), Some("foot_trial.csv"));
        assert_eq!(report.hardware.tier, MatchTier::ExactMatch);
        assert_eq!(report.analyzed_with, "foot_pad_1100x650");
        assert_eq!(report.recovery, ParseRecovery::Native);
        assert_eq!(report.frame_count, 12);
        assert_eq!(report.trajectory_len, 12);
        assert!(!report.is_degraded());
        assert!(matches!(report.balance, Outcome::Ok { .. }));
    }

    #[test]
    fn test_bracketed_header_keeps_matched_mat() {
        let csv = format!("p0[kPa],p1[kPa]\n{}", walking_csv(12));
        let report = Pipeline::default().analyze(&RawData::Text(&csv), Some("foot_trial.csv"));
        assert_eq!(report.hardware.tier, MatchTier::ExactMatch);
        assert_eq!(report.analyzed_with, "foot_pad_1100x650");
        assert_eq!(report.recovery, ParseRecovery::Native);
        assert_eq!(report.frame_count, 12);
    }

    #[test]
    fn test_lenient_reason_names_the_generic_spec() {
        let catalog = HardwareCatalog::global();
        let matched = MatchResult {
            tier: MatchTier::PartialMatch,
            spec: catalog.get("foot_pad_1100x650").unwrap().clone(),
            confidence: 80.0,
            message: "Partial hardware match".into(),
        };
        let parsed = ParsedInput {
            frames: Vec::new(),
            spec: catalog.fallback().clone(),
            recovery: ParseRecovery::Lenient,
        };
        let reason = degradation_reason(&matched, &parsed).unwrap();
        assert!(reason.contains("fallback"));
        assert!(!reason.contains("foot_pad"));
    }

    #[test]
    fn test_invalid_bytes_report_error_recovery() {
        let bytes = [0xff, 0xfe, 0x00, 0x41];
        let report = Pipeline::default().analyze(&RawData::Bytes(&bytes), None);
        assert_eq!(report.hardware.tier, MatchTier::ErrorRecovery);
        assert_eq!(report.recovery, ParseRecovery::DefaultFrame);
        assert_eq!(report.frame_count, 1);
        assert!(report.gait.is_insufficient());
        assert!(report.balance.is_insufficient());
    }

    #[test]
    fn test_unknown_layout_degrades_outcomes() {
        // Six-value rows fall back and are parsed leniently under the generic spec
        let text = "1,2,3,4,5,6\n7,8,9,10,11,12";
        let report = Pipeline::default().analyze(&RawData::Text(text), None);
        assert!(report.is_degraded());
        assert_eq!(report.analyzed_with, "fallback");
    }

    #[test]
    fn test_batch_keeps_input_order() {
        let config = PipelineConfig {
            batch_workers: 3,
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(config);
        let inputs: Vec<BatchInput> = (0..7)
            .map(|i| {
                let bytes = if i % 2 == 0 {
                    walking_csv(3).into_bytes()
                } else {
                    vec![0xc3, 0x28]
                };
                BatchInput::new(format!("trial_{}.csv", i), bytes)
            })
            .collect();

        let reports = pipeline.analyze_batch(&inputs);
        assert_eq!(reports.len(), 7);
        for (i, report) in reports.iter().enumerate() {
            assert_eq!(report.source.as_deref(), Some(format!("trial_{}.csv", i).as_str()));
            let recovered = report.hardware.tier == MatchTier::ErrorRecovery;
            assert_eq!(recovered, i % 2 == 1);
        }
        assert!(pipeline.analyze_batch(&[]).is_empty());
    }

    #[test]
    fn test_error_report_is_self_contained() {
        let pipeline = Pipeline::default();
        let report = pipeline.error_report(Some("x.csv"), &PipelineError::Worker("boom".into()));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["hardware"]["tier"], "error_recovery");
        assert_eq!(json["gait"]["status"], "insufficient_data");
        assert_eq!(json["recovery"], "default_frame");
    }
}
