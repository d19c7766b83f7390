use crate::error::{PResult, PipelineError};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// Default above-noise pressure threshold for every known mat
pub const DEFAULT_PRESSURE_THRESHOLD: f64 = 20.0;

/// Raw data layouts seen in the field
///
/// Serialized with the wire tags the acquisition software writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataLayout {
    #[serde(rename = "32col")]
    Columns32,
    #[serde(rename = "64col")]
    Columns64,
    /// Two 32x32 pads side by side: 64-column rows or 2048-value records
    #[serde(rename = "64col_2048")]
    DualPad2048,
    /// Six-field records whose last field packs a 32x32 frame
    #[serde(rename = "6col_1024")]
    Packed1024,
    /// Six-field records whose last field packs a 64x32 frame
    #[serde(rename = "6col_2048")]
    Packed2048,
    #[serde(rename = "unknown")]
    Unknown,
}

impl DataLayout {
    pub fn tag(&self) -> &'static str {
        match self {
            DataLayout::Columns32 => "32col",
            DataLayout::Columns64 => "64col",
            DataLayout::DualPad2048 => "64col_2048",
            DataLayout::Packed1024 => "6col_1024",
            DataLayout::Packed2048 => "6col_2048",
            DataLayout::Unknown => "unknown",
        }
    }

    /// Layout assumed when nothing better is known
    pub fn default_layout() -> Self {
        DataLayout::Columns32
    }
}

/// Hardware family, used for reference ranges
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareCategory {
    HipPad,
    FootPad,
    Generic,
}

impl HardwareCategory {
    fn from_id(id: &str) -> Self {
        if id.contains("hip") {
            HardwareCategory::HipPad
        } else if id.contains("foot") {
            HardwareCategory::FootPad
        } else {
            HardwareCategory::Generic
        }
    }
}

/// Static description of a pressure mat
///
/// Grid scales are computed once in [`HardwareSpec::new`]; the fields are
/// private so they can never drift from the physical size afterwards.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HardwareSpec {
    id: String,
    name: String,
    width: f64,  // m
    height: f64, // m
    grid_width: usize,
    grid_height: usize,
    layout: DataLayout,
    priority: u32,
    threshold: f64,
    grid_scale_x: f64, // m per column
    grid_scale_y: f64, // m per row
    total_sensors: usize,
}

impl HardwareSpec {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: &str,
        name: &str,
        width: f64,
        height: f64,
        grid_width: usize,
        grid_height: usize,
        layout: DataLayout,
        priority: u32,
        threshold: f64,
    ) -> PResult<Self> {
        let invalid = |reason: &str| PipelineError::InvalidSpec {
            id: id.to_string(),
            reason: reason.to_string(),
        };
        if grid_width == 0 || grid_height == 0 {
            return Err(invalid("grid dimensions must be positive"));
        }
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(invalid("physical size must be positive"));
        }
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(invalid("pressure threshold must be non-negative"));
        }

        Ok(HardwareSpec {
            id: id.to_string(),
            name: name.to_string(),
            width,
            height,
            grid_width,
            grid_height,
            layout,
            priority,
            threshold,
            grid_scale_x: width / grid_width as f64,
            grid_scale_y: height / grid_height as f64,
            total_sensors: grid_width * grid_height,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn grid_width(&self) -> usize {
        self.grid_width
    }

    pub fn grid_height(&self) -> usize {
        self.grid_height
    }

    pub fn layout(&self) -> DataLayout {
        self.layout
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn grid_scale_x(&self) -> f64 {
        self.grid_scale_x
    }

    pub fn grid_scale_y(&self) -> f64 {
        self.grid_scale_y
    }

    pub fn total_sensors(&self) -> usize {
        self.total_sensors
    }

    pub fn category(&self) -> HardwareCategory {
        HardwareCategory::from_id(&self.id)
    }

    /// Normalisation factor for size-dependent thresholds, sqrt(width * height)
    pub fn size_factor(&self) -> f64 {
        (self.width * self.height).sqrt()
    }

    /// Generic spec used when no known hardware fits the input
    pub fn fallback() -> Self {
        HardwareSpec {
            id: "fallback".to_string(),
            name: "Generic pressure mat".to_string(),
            width: 1.565,
            height: 0.90,
            grid_width: 32,
            grid_height: 32,
            layout: DataLayout::default_layout(),
            priority: 999,
            threshold: DEFAULT_PRESSURE_THRESHOLD,
            grid_scale_x: 1.565 / 32.0,
            grid_scale_y: 0.90 / 32.0,
            total_sensors: 32 * 32,
        }
    }
}

// (id, name, width m, height m, grid width, grid height, layout, priority)
type SpecRow = (&'static str, &'static str, f64, f64, usize, usize, DataLayout, u32);

const BUILTIN_SPECS: &[SpecRow] = &[
    ("dual_walkway_pads", "Dual-pad walkway 3130x900mm", 3.13, 0.90, 64, 32, DataLayout::DualPad2048, 1),
    ("gait_walkway_main", "Main gait walkway 1565x900mm", 1.565, 0.90, 32, 32, DataLayout::Columns32, 2),
    ("foot_pad_1100x650", "Foot pressure pad 1100x650mm", 1.10, 0.65, 32, 32, DataLayout::Columns32, 1),
    ("hip_pad_550x530", "Hip pressure pad 550x530mm", 0.55, 0.53, 32, 32, DataLayout::Columns32, 1),
    ("standard_foot_pad", "Standard foot pad 1000x600mm", 1.00, 0.60, 32, 32, DataLayout::Columns32, 2),
    ("large_walkway", "Large walkway 2000x1000mm", 2.00, 1.00, 32, 32, DataLayout::Columns32, 2),
    ("multi_sensor_platform", "Multi-sensor platform 2000x2000mm", 2.00, 2.00, 64, 64, DataLayout::Columns64, 3),
];

lazy_static! {
    static ref BUILTIN: HardwareCatalog = HardwareCatalog::builtin();
}

/// Read-only registry of known mats
#[derive(Clone, Debug)]
pub struct HardwareCatalog {
    specs: Vec<HardwareSpec>,
    fallback: HardwareSpec,
}

impl HardwareCatalog {
    /// Process-wide catalog of the builtin mats
    pub fn global() -> &'static HardwareCatalog {
        &*BUILTIN
    }

    fn builtin() -> Self {
        let specs = BUILTIN_SPECS
            .iter()
            .filter_map(|&(id, name, width, height, gw, gh, layout, priority)| {
                HardwareSpec::new(id, name, width, height, gw, gh, layout, priority, DEFAULT_PRESSURE_THRESHOLD)
                    .map_err(|e| log::error!("Skipping builtin hardware spec: {}", e))
                    .ok()
            })
            .collect::<Vec<_>>();
        log::debug!("Loaded {} hardware specs", specs.len());
        Self::from_specs(specs)
    }

    /// Catalog over an explicit spec list, with the generic fallback
    pub fn from_specs(specs: Vec<HardwareSpec>) -> Self {
        HardwareCatalog {
            specs,
            fallback: HardwareSpec::fallback(),
        }
    }

    /// Specs in declaration order
    pub fn list(&self) -> &[HardwareSpec] {
        &self.specs
    }

    /// Specs by ascending priority; ties keep declaration order
    pub fn by_priority(&self) -> Vec<&HardwareSpec> {
        let mut sorted: Vec<&HardwareSpec> = self.specs.iter().collect();
        sorted.sort_by_key(|spec| spec.priority());
        sorted
    }

    pub fn get(&self, id: &str) -> Option<&HardwareSpec> {
        self.specs.iter().find(|spec| spec.id() == id)
    }

    pub fn fallback(&self) -> &HardwareSpec {
        &self.fallback
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
