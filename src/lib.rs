//! Pressure-mat gait and balance analysis
//!
//! Raw mat recordings are classified against a catalog of known hardware,
//! parsed into pressure frames, reduced to a center-of-pressure trajectory,
//! and analyzed for gait (steps, cadence, phases) and postural sway.
//!
//! ```no_run
//! use pressure_gait_rs::{Pipeline, RawData};
//!
//! let csv = std::fs::read_to_string("gait_trial.csv").unwrap();
//! let report = Pipeline::default().analyze(&RawData::Text(&csv), Some("gait_trial.csv"));
//! println!("{}", serde_json::to_string_pretty(&report).unwrap());
//! ```

pub mod balance;
pub mod config;
pub mod cop;
pub mod error;
pub mod gait;
pub mod hardware;
pub mod input;
pub mod parser;
pub mod pipeline;
pub mod smoothing;
pub mod types;

pub use balance::{BalanceAnalyzer, BalanceMetrics, ReferenceRanges};
pub use config::{BalanceConfig, GaitConfig, PipelineConfig};
pub use error::{PResult, PipelineError};
pub use gait::{GaitEventDetector, GaitMetrics};
pub use hardware::{HardwareCatalog, HardwareMatcher, HardwareSpec, MatchResult, MatchTier};
pub use input::RawData;
pub use parser::{FrameParser, ParseRecovery};
pub use pipeline::{AnalysisReport, BatchInput, Pipeline};
pub use types::{CopPoint, GaitSample, Outcome, PressureFrame};
