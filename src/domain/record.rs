// Laundry operation record domain model
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

/// One observation for a machine/line at a point in time, as stored in the
/// snapshot. `efficiency_in`/`efficiency_out` are vendor-reported samples and
/// may be absent for a row.
#[derive(Debug, Clone, PartialEq)]
pub struct LaundryRecord {
    pub timestamp: NaiveDateTime,
    pub machine_id: i64,
    pub line_id: String,
    pub pieces_in: f64,
    pub pieces_out: f64,
    pub efficiency_in: Option<f64>,
    pub efficiency_out: Option<f64>,
    pub operating_time: f64,
    pub idle_time: f64,
}

impl LaundryRecord {
    /// Share of the period the machine was running, as a percentage.
    /// Defined as 0 when the total duration is not positive, so malformed
    /// upstream rows never yield NaN or out-of-range values.
    pub fn utilization(&self) -> f64 {
        let total = self.operating_time + self.idle_time;
        if total <= 0.0 {
            return 0.0;
        }
        (self.operating_time / total * 100.0).clamp(0.0, 100.0)
    }

    /// Mean of the entry and exit efficiency samples. Missing samples count
    /// as 0 before averaging.
    pub fn efficiency(&self) -> f64 {
        let ein = self.efficiency_in.unwrap_or(0.0);
        let eout = self.efficiency_out.unwrap_or(0.0);
        ((ein + eout) / 2.0).clamp(0.0, 100.0)
    }
}

/// Band bucketing for the derived efficiency/utilization metrics. Evaluated
/// against the derived columns, never against stored data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandFilter {
    #[default]
    All,
    High,
    Medium,
    Low,
}

impl BandFilter {
    pub fn matches(&self, value: f64) -> bool {
        match self {
            BandFilter::All => true,
            BandFilter::High => value > 80.0,
            BandFilter::Medium => (50.0..=80.0).contains(&value),
            BandFilter::Low => value < 50.0,
        }
    }
}

/// Filter set for one dashboard query. `None` for machine/client means "all".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub machine: Option<i64>,
    pub client: Option<String>,
    pub efficiency_band: BandFilter,
    pub utilization_band: BandFilter,
}

impl RecordFilter {
    /// Band predicates applied after derivation, intersected with the
    /// categorical filters already pushed into the scan.
    pub fn bands_match(&self, record: &LaundryRecord) -> bool {
        self.efficiency_band.matches(record.efficiency())
            && self.utilization_band.matches(record.utilization())
    }
}
