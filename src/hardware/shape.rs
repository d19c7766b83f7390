use super::DataLayout;
use crate::error::{PResult, PipelineError};
use crate::input::{RawData, Record};
use serde::Serialize;

/// Values per packed record for a single 32x32 pad
pub const PACKED_SINGLE_LEN: usize = 1024;
/// Values per packed record for two 32x32 pads
pub const PACKED_DUAL_LEN: usize = 2048;
/// Field count of the six-column export (five metadata fields + data)
const SIX_COLUMN_EXPORT: usize = 6;

/// Lightweight description of what the raw input looks like
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DataShape {
    pub row_count: usize,
    pub col_count: usize,
    pub layout: DataLayout,
    pub total_points: usize,
}

impl DataShape {
    pub fn unknown() -> Self {
        DataShape {
            row_count: 0,
            col_count: 0,
            layout: DataLayout::Unknown,
            total_points: 0,
        }
    }

    /// Describe the input from its first readable data record
    ///
    /// Fails only when every record is malformed.
    pub fn introspect(raw: &RawData) -> PResult<Self> {
        let records = raw.records()?;
        let first = match records.iter().find(|r| !matches!(r, Record::Malformed(_))) {
            Some(record) => record,
            None => match records.first() {
                Some(Record::Malformed(reason)) => {
                    return Err(PipelineError::Introspection(reason.clone()))
                }
                _ => return Ok(Self::unknown()),
            },
        };

        let (layout, col_count) = match first {
            Record::Packed(values) => {
                let layout = match values.len() {
                    PACKED_DUAL_LEN => DataLayout::Packed2048,
                    PACKED_SINGLE_LEN => DataLayout::Packed1024,
                    _ => DataLayout::Unknown,
                };
                (layout, SIX_COLUMN_EXPORT)
            }
            Record::Row(cells) => (Self::row_layout(cells.len()), cells.len()),
            Record::Malformed(_) => (DataLayout::Unknown, 0),
        };

        Ok(DataShape {
            row_count: records.len(),
            col_count,
            layout,
            total_points: records.len(),
        })
    }

    fn row_layout(cols: usize) -> DataLayout {
        match cols {
            // A whole frame flattened onto one line without metadata
            PACKED_DUAL_LEN => DataLayout::Packed2048,
            PACKED_SINGLE_LEN => DataLayout::Packed1024,
            c if c >= 64 => DataLayout::DualPad2048,
            c if c >= 32 => DataLayout::Columns32,
            // Six-column export whose data field was not recognised
            SIX_COLUMN_EXPORT => DataLayout::Packed1024,
            _ => DataLayout::Unknown,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.layout == DataLayout::Unknown
    }
}
