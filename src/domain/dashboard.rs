// Dashboard aggregate domain model
use chrono::NaiveDate;
use serde::Serialize;

pub const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub const PREVIEW_ROWS: usize = 10;

/// One bar/slice in a grouped series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupPoint {
    pub key: String,
    pub value: f64,
}

impl GroupPoint {
    pub fn new(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// One point in a date-bucketed series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// An entry-vs-exit style two-value comparison.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ComparisonPair {
    pub entry: f64,
    pub exit: f64,
}

/// Per-client share of production. `single_client` lets the consumer swap a
/// degenerate one-slice pie for a different chart shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ClientDistribution {
    pub slices: Vec<GroupPoint>,
    pub single_client: bool,
}

/// Day-of-week x hour-of-day pivot of summed pieces. Rows follow `DAY_NAMES`
/// (Monday first), columns are hours 0-23.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
    pub days: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl Default for Heatmap {
    fn default() -> Self {
        Self {
            days: DAY_NAMES.iter().map(|d| d.to_string()).collect(),
            values: vec![vec![0.0; 24]; 7],
        }
    }
}

/// Row-limited preview of the filtered frame, original column order preserved.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DataPreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub message: Option<String>,
}

/// Everything one dashboard refresh needs, computed from a single filtered
/// frame so no widget can disagree with another about which rows were in play.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub has_data: bool,
    /// KPI "total pieces": sum of pieces_in over the filtered frame. The
    /// in+out variant was rejected; see DESIGN.md.
    pub total_pieces: f64,
    pub total_pieces_in: f64,
    pub total_pieces_out: f64,
    pub distinct_days: u32,
    /// total_pieces / max(distinct_days, 1), kept fractional.
    pub daily_average: f64,
    pub machine_production: Vec<GroupPoint>,
    pub production_trend: Vec<DatePoint>,
    pub client_distribution: ClientDistribution,
    pub entry_exit: ComparisonPair,
    pub efficiency_comparison: ComparisonPair,
    pub machine_utilization: Vec<GroupPoint>,
    pub production_heatmap: Heatmap,
    pub machine_efficiency: Vec<GroupPoint>,
    pub utilization_trend: Vec<DatePoint>,
    pub client_performance: Vec<GroupPoint>,
    pub preview: DataPreview,
}

impl Dashboard {
    /// Total substitute for the zero-row case: every field carries its empty
    /// representation so the chart layer never sees a missing value.
    pub fn empty() -> Self {
        Self {
            has_data: false,
            total_pieces: 0.0,
            total_pieces_in: 0.0,
            total_pieces_out: 0.0,
            distinct_days: 0,
            daily_average: 0.0,
            machine_production: Vec::new(),
            production_trend: Vec::new(),
            client_distribution: ClientDistribution::default(),
            entry_exit: ComparisonPair::default(),
            efficiency_comparison: ComparisonPair::default(),
            machine_utilization: Vec::new(),
            production_heatmap: Heatmap::default(),
            machine_efficiency: Vec::new(),
            utilization_trend: Vec::new(),
            client_performance: Vec::new(),
            preview: DataPreview {
                columns: Vec::new(),
                rows: Vec::new(),
                message: Some("No data found for the selected filters".to_string()),
            },
        }
    }
}
