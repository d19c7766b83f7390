//! Raw records -> pressure frames
//!
//! Two layout families exist. Wide-row data carries one sensor row per line,
//! `grid_height` consecutive lines forming a frame. Compressed-flat data packs a
//! whole frame, row-major, into one record. Which family to try is decided by
//! the spec's layout through [`STRATEGY_TABLE`].

use crate::error::{PResult, PipelineError};
use crate::hardware::{DataLayout, HardwareSpec};
use crate::input::{RawData, Record};
use crate::types::PressureFrame;
use ndarray::Array2;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseStrategy {
    WideRow,
    CompressedFlat,
}

const ALL_STRATEGIES: &[ParseStrategy] = &[ParseStrategy::WideRow, ParseStrategy::CompressedFlat];

/// Parse strategies bound to each layout, tried in order
const STRATEGY_TABLE: &[(DataLayout, &[ParseStrategy])] = &[
    (DataLayout::Columns32, &[ParseStrategy::WideRow]),
    (DataLayout::Columns64, &[ParseStrategy::WideRow]),
    (DataLayout::DualPad2048, &[ParseStrategy::WideRow, ParseStrategy::CompressedFlat]),
    (DataLayout::Packed1024, &[ParseStrategy::CompressedFlat]),
    (DataLayout::Packed2048, &[ParseStrategy::CompressedFlat]),
    (DataLayout::Unknown, ALL_STRATEGIES),
];

pub fn strategies_for(layout: DataLayout) -> &'static [ParseStrategy] {
    STRATEGY_TABLE
        .iter()
        .find(|(l, _)| *l == layout)
        .map(|(_, strategies)| *strategies)
        .unwrap_or(ALL_STRATEGIES)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    /// Exact row widths / record lengths, layout strategies only
    Strict,
    /// Oversized rows and records are truncated, every strategy is tried
    Lenient,
}

/// Which escalation level produced the frames
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseRecovery {
    Native,
    Lenient,
    DefaultFrame,
}

/// Frames plus the spec they must be interpreted with
#[derive(Clone, Debug)]
pub struct ParsedInput {
    pub frames: Vec<PressureFrame>,
    pub spec: HardwareSpec,
    pub recovery: ParseRecovery,
}

pub struct FrameParser {
    mode: ParseMode,
}

impl FrameParser {
    pub fn new(mode: ParseMode) -> Self {
        FrameParser { mode }
    }

    pub fn strict() -> Self {
        Self::new(ParseMode::Strict)
    }

    pub fn lenient() -> Self {
        Self::new(ParseMode::Lenient)
    }

    /// Parse raw input into frames sized by `spec`; bad records are skipped
    pub fn parse(&self, raw: &RawData, spec: &HardwareSpec) -> PResult<Vec<PressureFrame>> {
        let records = raw.records()?;
        Ok(self.parse_records(&records, spec))
    }

    pub fn parse_records(&self, records: &[Record], spec: &HardwareSpec) -> Vec<PressureFrame> {
        let strategies = match self.mode {
            ParseMode::Strict => strategies_for(spec.layout()),
            ParseMode::Lenient => ALL_STRATEGIES,
        };

        for strategy in strategies {
            let frames = match strategy {
                ParseStrategy::WideRow => self.parse_wide_rows(records, spec),
                ParseStrategy::CompressedFlat => self.parse_compressed(records, spec),
            };
            if !frames.is_empty() {
                log::debug!(
                    "{:?} parse ({:?}) produced {} frames for {}",
                    strategy,
                    self.mode,
                    frames.len(),
                    spec.id()
                );
                return frames;
            }
        }
        Vec::new()
    }

    /// Group `grid_height` accepted rows into each frame
    fn parse_wide_rows(&self, records: &[Record], spec: &HardwareSpec) -> Vec<PressureFrame> {
        let (gw, gh) = (spec.grid_width(), spec.grid_height());
        let mut rows: Vec<Vec<f64>> = Vec::new();
        let mut skipped = 0usize;

        for record in records {
            match self.accept_row(record, gw) {
                Some(row) => rows.push(row),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            log::debug!("Skipped {} rows not matching {} columns", skipped, gw);
        }

        rows.chunks_exact(gh)
            .enumerate()
            .filter_map(|(index, block)| {
                let values: Vec<f64> = block.iter().flatten().copied().collect();
                build_frame(index, gh, gw, values)
            })
            .collect()
    }

    fn accept_row(&self, record: &Record, width: usize) -> Option<Vec<f64>> {
        let cells = match record {
            Record::Row(cells) => cells,
            _ => return None,
        };
        match self.mode {
            ParseMode::Strict => {
                if cells.len() != width {
                    return None;
                }
                cells.iter().copied().collect()
            }
            ParseMode::Lenient => {
                if cells.len() < width || cells[..width].iter().all(Option::is_none) {
                    return None;
                }
                Some(cells[..width].iter().map(|c| c.unwrap_or(0.0)).collect())
            }
        }
    }

    /// One frame per record holding `grid_width * grid_height` values
    fn parse_compressed(&self, records: &[Record], spec: &HardwareSpec) -> Vec<PressureFrame> {
        let (gw, gh) = (spec.grid_width(), spec.grid_height());
        let expected = spec.total_sensors();

        records
            .iter()
            .filter_map(|record| record.numbers())
            .filter_map(|mut values| match self.mode {
                ParseMode::Strict if values.len() == expected => Some(values),
                ParseMode::Lenient if values.len() >= expected => {
                    values.truncate(expected);
                    Some(values)
                }
                _ => None,
            })
            .enumerate()
            .filter_map(|(index, values)| build_frame(index, gh, gw, values))
            .collect()
    }

    /// Strict parse under the matched spec, then lenient under the generic spec,
    /// then a single all-zero frame. Never fails.
    pub fn parse_with_escalation(
        raw: &RawData,
        matched: &HardwareSpec,
        generic: &HardwareSpec,
    ) -> ParsedInput {
        let records = match raw.records() {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Input unreadable, using default frame: {}", e);
                return Self::default_frame(generic);
            }
        };

        let frames = Self::strict().parse_records(&records, matched);
        if !frames.is_empty() {
            return ParsedInput {
                frames,
                spec: matched.clone(),
                recovery: ParseRecovery::Native,
            };
        }

        log::warn!(
            "No frames parsed as {} ({}), retrying leniently",
            matched.id(),
            matched.layout().tag()
        );
        let frames = Self::lenient().parse_records(&records, generic);
        if !frames.is_empty() {
            return ParsedInput {
                frames,
                spec: generic.clone(),
                recovery: ParseRecovery::Lenient,
            };
        }

        log::warn!("{}", PipelineError::NoFrames(format!("{} records", records.len())));
        Self::default_frame(generic)
    }

    fn default_frame(spec: &HardwareSpec) -> ParsedInput {
        ParsedInput {
            frames: vec![PressureFrame::zeros(0, spec.grid_height(), spec.grid_width())],
            spec: spec.clone(),
            recovery: ParseRecovery::DefaultFrame,
        }
    }
}

/// Row-major values -> frame; negative and non-finite readings become 0
fn build_frame(index: usize, rows: usize, cols: usize, values: Vec<f64>) -> Option<PressureFrame> {
    let sanitized = values
        .into_iter()
        .map(|v| if v.is_finite() && v > 0.0 { v } else { 0.0 })
        .collect();
    match Array2::from_shape_vec((rows, cols), sanitized) {
        Ok(matrix) => Some(PressureFrame::new(index, matrix)),
        Err(e) => {
            log::debug!("Dropping frame {}: {}", index, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::HardwareCatalog;

    fn spec(id: &str) -> HardwareSpec {
        HardwareCatalog::global().get(id).unwrap().clone()
    }

    fn wide_text(rows: usize, cols: usize, value: f64) -> String {
        (0..rows)
            .map(|_| vec![value.to_string(); cols].join(","))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn packed_line(values: &[f64]) -> String {
        let joined = values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",");
        format!("0.0,0,0,0,0,\"[{}]\"", joined)
    }

    #[test]
    fn test_strategy_table_covers_every_layout() {
        assert_eq!(strategies_for(DataLayout::Columns32), &[ParseStrategy::WideRow]);
        assert_eq!(
            strategies_for(DataLayout::DualPad2048),
            &[ParseStrategy::WideRow, ParseStrategy::CompressedFlat]
        );
        assert_eq!(strategies_for(DataLayout::Packed1024), &[ParseStrategy::CompressedFlat]);
        assert_eq!(strategies_for(DataLayout::Unknown).len(), 2);
    }

    #[test]
    fn test_wide_rows_group_into_frames() {
        // 70 rows: two complete 32-row frames, remainder dropped
        let text = wide_text(70, 32, 5.0);
        let frames = FrameParser::strict()
            .parse(&RawData::Text(&text), &spec("foot_pad_1100x650"))
            .unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].index, 1);
        assert_eq!(frames[0].values.dim(), (32, 32));
        assert_eq!(frames[0].total(), 5.0 * 1024.0);
    }

    #[test]
    fn test_short_rows_are_skipped_not_fatal() {
        let mut text = wide_text(32, 32, 1.0);
        text.push_str("\n1,2,3\n");
        text.push_str(&wide_text(32, 32, 2.0));
        let frames = FrameParser::strict()
            .parse(&RawData::Text(&text), &spec("foot_pad_1100x650"))
            .unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].total(), 2048.0);
    }

    #[test]
    fn test_packed_records_reshape_row_major() {
        let values: Vec<f64> = (0..2048).map(|v| v as f64).collect();
        let text = format!("{}\n{}", packed_line(&values), packed_line(&values[..100]));
        let frames = FrameParser::strict()
            .parse(&RawData::Text(&text), &spec("dual_walkway_pads"))
            .unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].values.dim(), (32, 64));
        assert_eq!(frames[0].values[[1, 0]], 64.0);
        assert_eq!(frames[0].values[[0, 63]], 63.0);
    }

    #[test]
    fn test_negative_and_nan_readings_are_zeroed() {
        let mut values = vec![1.0; 1024];
        values[0] = -5.0;
        let mut rows = vec![values.clone()];
        rows[0][1] = f64::NAN;
        let generic = HardwareSpec::fallback();
        let frames = FrameParser::lenient().parse(&RawData::Rows(&rows), &generic).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].values[[0, 0]], 0.0);
        assert_eq!(frames[0].values[[0, 1]], 0.0);
    }

    #[test]
    fn test_escalation_to_lenient() {
        // 1024-value records never match the strict 32-column layout
        let values = vec![30.0; 1024];
        let text = format!("{}\n{}", packed_line(&values), packed_line(&values));
        let parsed = FrameParser::parse_with_escalation(
            &RawData::Text(&text),
            &spec("foot_pad_1100x650"),
            &HardwareSpec::fallback(),
        );
        assert_eq!(parsed.recovery, ParseRecovery::Lenient);
        assert_eq!(parsed.frames.len(), 2);
        assert_eq!(parsed.spec.id(), "fallback");
    }

    #[test]
    fn test_lenient_truncates_wide_rows() {
        let text = wide_text(32, 40, 3.0);
        let frames = FrameParser::lenient()
            .parse(&RawData::Text(&text), &HardwareSpec::fallback())
            .unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].values.dim(), (32, 32));
    }

    #[test]
    fn test_escalation_to_default_frame() {
        let generic = HardwareSpec::fallback();
        let parsed = FrameParser::parse_with_escalation(&RawData::Text("a,b\n1,2"), &generic, &generic);
        assert_eq!(parsed.recovery, ParseRecovery::DefaultFrame);
        assert_eq!(parsed.frames.len(), 1);
        assert_eq!(parsed.frames[0].total(), 0.0);

        let parsed = FrameParser::parse_with_escalation(&RawData::Bytes(&[0xff]), &generic, &generic);
        assert_eq!(parsed.recovery, ParseRecovery::DefaultFrame);
    }
}
