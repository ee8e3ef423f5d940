// Dashboard service - Single-pass aggregation over the filtered frame
use crate::application::snapshot_repository::SnapshotRepository;
use crate::domain::dashboard::{
    ClientDistribution, ComparisonPair, Dashboard, DataPreview, DatePoint, GroupPoint, Heatmap,
    PREVIEW_ROWS,
};
use crate::domain::record::{LaundryRecord, RecordFilter};
use chrono::{Datelike, NaiveDate, Timelike};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Clone)]
pub struct DashboardService {
    repository: Arc<dyn SnapshotRepository>,
}

impl DashboardService {
    pub fn new(repository: Arc<dyn SnapshotRepository>) -> Self {
        Self { repository }
    }

    /// Load, derive, aggregate. Every aggregate in the returned structure is
    /// computed from the same frame. Repository failures degrade to the empty
    /// dashboard with a logged diagnostic; they never reach the HTTP layer.
    pub async fn get_dashboard(&self, filter: &RecordFilter) -> Dashboard {
        let rows = match self.repository.load_records(filter).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "dashboard query failed, serving empty result");
                return Dashboard::empty();
            }
        };
        build_dashboard(rows, filter, self.repository.preview_columns())
    }
}

fn build_dashboard(
    rows: Vec<LaundryRecord>,
    filter: &RecordFilter,
    preview_columns: Vec<String>,
) -> Dashboard {
    // Band filters run over the derived metrics and intersect with whatever
    // the scan already applied.
    let rows: Vec<LaundryRecord> = rows
        .into_iter()
        .filter(|r| filter.bands_match(r))
        .collect();
    if rows.is_empty() {
        return Dashboard::empty();
    }

    let total_pieces_in: f64 = rows.iter().map(|r| r.pieces_in).sum();
    let total_pieces_out: f64 = rows.iter().map(|r| r.pieces_out).sum();
    let total_pieces = total_pieces_in;

    let distinct_dates: BTreeSet<NaiveDate> = rows.iter().map(|r| r.timestamp.date()).collect();
    let distinct_days = distinct_dates.len() as u32;
    let daily_average = total_pieces / distinct_days.max(1) as f64;

    let machine_production = group_sum(&rows, |r| r.machine_id, |r| r.pieces_in);
    let machine_utilization = group_mean(&rows, |r| r.machine_id, |r| r.utilization());
    // Efficiency means run over present samples only; a missing vendor sample
    // is absent from the mean, not a zero dragging it down.
    let machine_efficiency = group_mean_present(&rows, |r| r.machine_id, |r| r.efficiency_in);

    let production_trend = date_series(&rows, |values| values.iter().sum());
    let utilization_trend = {
        let by_date = rows.iter().fold(
            BTreeMap::<NaiveDate, Vec<f64>>::new(),
            |mut acc, r| {
                acc.entry(r.timestamp.date()).or_default().push(r.utilization());
                acc
            },
        );
        by_date
            .into_iter()
            .map(|(date, values)| DatePoint {
                date,
                value: mean(&values),
            })
            .collect()
    };

    let client_slices = group_sum(&rows, |r| r.line_id.clone(), |r| r.pieces_in);
    let client_distribution = ClientDistribution {
        single_client: client_slices.len() == 1,
        slices: client_slices.clone(),
    };

    let mean_efficiency_in = mean(&rows
        .iter()
        .filter_map(|r| r.efficiency_in)
        .collect::<Vec<_>>());
    let mean_efficiency_out = mean(&rows
        .iter()
        .filter_map(|r| r.efficiency_out)
        .collect::<Vec<_>>());

    let mut heatmap = Heatmap::default();
    for r in &rows {
        let day = r.timestamp.weekday().num_days_from_monday() as usize;
        let hour = r.timestamp.hour() as usize;
        heatmap.values[day][hour] += r.pieces_in;
    }

    let preview = DataPreview {
        columns: preview_columns,
        rows: rows.iter().take(PREVIEW_ROWS).map(preview_row).collect(),
        message: None,
    };

    Dashboard {
        has_data: true,
        total_pieces,
        total_pieces_in,
        total_pieces_out,
        distinct_days,
        daily_average,
        machine_production,
        production_trend,
        client_distribution,
        entry_exit: ComparisonPair {
            entry: total_pieces_in,
            exit: total_pieces_out,
        },
        efficiency_comparison: ComparisonPair {
            entry: mean_efficiency_in,
            exit: mean_efficiency_out,
        },
        machine_utilization,
        production_heatmap: heatmap,
        machine_efficiency,
        utilization_trend,
        client_performance: client_slices,
        preview,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

// Group keys stay in their native type until the end so numeric machine ids
// sort numerically, not lexically.
fn group_sum<K, KF, V>(rows: &[LaundryRecord], key: KF, value: V) -> Vec<GroupPoint>
where
    K: Ord + ToString,
    KF: Fn(&LaundryRecord) -> K,
    V: Fn(&LaundryRecord) -> f64,
{
    let grouped = rows.iter().fold(BTreeMap::<K, f64>::new(), |mut acc, r| {
        *acc.entry(key(r)).or_insert(0.0) += value(r);
        acc
    });
    grouped
        .into_iter()
        .map(|(k, v)| GroupPoint::new(k.to_string(), v))
        .collect()
}

fn group_mean<K, KF, V>(rows: &[LaundryRecord], key: KF, value: V) -> Vec<GroupPoint>
where
    K: Ord + ToString,
    KF: Fn(&LaundryRecord) -> K,
    V: Fn(&LaundryRecord) -> f64,
{
    let grouped = rows
        .iter()
        .fold(BTreeMap::<K, Vec<f64>>::new(), |mut acc, r| {
            acc.entry(key(r)).or_default().push(value(r));
            acc
        });
    grouped
        .into_iter()
        .map(|(k, values)| GroupPoint::new(k.to_string(), mean(&values)))
        .collect()
}

/// Like `group_mean`, but over an optional sample: absent values do not join
/// the mean. A group with no samples at all reports 0.
fn group_mean_present<K, KF, V>(rows: &[LaundryRecord], key: KF, value: V) -> Vec<GroupPoint>
where
    K: Ord + ToString,
    KF: Fn(&LaundryRecord) -> K,
    V: Fn(&LaundryRecord) -> Option<f64>,
{
    let grouped = rows
        .iter()
        .fold(BTreeMap::<K, Vec<f64>>::new(), |mut acc, r| {
            let samples = acc.entry(key(r)).or_default();
            if let Some(v) = value(r) {
                samples.push(v);
            }
            acc
        });
    grouped
        .into_iter()
        .map(|(k, values)| GroupPoint::new(k.to_string(), mean(&values)))
        .collect()
}

fn date_series<F>(rows: &[LaundryRecord], reduce: F) -> Vec<DatePoint>
where
    F: Fn(&[f64]) -> f64,
{
    let by_date = rows
        .iter()
        .fold(BTreeMap::<NaiveDate, Vec<f64>>::new(), |mut acc, r| {
            acc.entry(r.timestamp.date()).or_default().push(r.pieces_in);
            acc
        });
    by_date
        .into_iter()
        .map(|(date, values)| DatePoint {
            date,
            value: reduce(&values),
        })
        .collect()
}

/// Render one record in the canonical column order the repository promises
/// for `preview_columns`: timestamp, machine, client, pieces in/out,
/// efficiency in/out, operating/idle time. Missing samples render blank.
fn preview_row(r: &LaundryRecord) -> Vec<String> {
    let opt = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
    vec![
        r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        r.machine_id.to_string(),
        r.line_id.clone(),
        r.pieces_in.to_string(),
        r.pieces_out.to_string(),
        opt(r.efficiency_in),
        opt(r.efficiency_out),
        r.operating_time.to_string(),
        r.idle_time.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::snapshot_repository::SnapshotRepository;
    use crate::domain::record::BandFilter;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    struct FixedRepository {
        rows: Vec<LaundryRecord>,
    }

    #[async_trait]
    impl SnapshotRepository for FixedRepository {
        async fn load_records(&self, filter: &RecordFilter) -> anyhow::Result<Vec<LaundryRecord>> {
            // Mirror the scan-level filters the real repository pushes into SQL.
            Ok(self
                .rows
                .iter()
                .filter(|r| {
                    filter.machine.map_or(true, |m| r.machine_id == m)
                        && filter.client.as_ref().map_or(true, |c| &r.line_id == c)
                        && filter.start_date.map_or(true, |d| r.timestamp.date() >= d)
                        && filter.end_date.map_or(true, |d| r.timestamp.date() <= d)
                })
                .cloned()
                .collect())
        }

        fn preview_columns(&self) -> Vec<String> {
            vec!["DATA".into(), "MAQUINA".into(), "LINHA".into()]
        }
    }

    struct FailingRepository;

    #[async_trait]
    impl SnapshotRepository for FailingRepository {
        async fn load_records(&self, _: &RecordFilter) -> anyhow::Result<Vec<LaundryRecord>> {
            anyhow::bail!("disk on fire")
        }

        fn preview_columns(&self) -> Vec<String> {
            Vec::new()
        }
    }

    fn row(date: (i32, u32, u32), hour: u32, machine: i64, pieces_in: f64) -> LaundryRecord {
        LaundryRecord {
            timestamp: NaiveDate::from_ymd_opt(date.0, date.1, date.2)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            machine_id: machine,
            line_id: machine.to_string(),
            pieces_in,
            pieces_out: pieces_in - 1.0,
            efficiency_in: Some(90.0),
            efficiency_out: Some(70.0),
            operating_time: 60.0,
            idle_time: 40.0,
        }
    }

    fn fixture() -> Vec<LaundryRecord> {
        vec![
            row((2024, 1, 1), 8, 1, 10.0),
            row((2024, 1, 1), 9, 1, 20.0),
            row((2024, 1, 1), 10, 1, 30.0),
            row((2024, 1, 2), 8, 2, 5.0),
        ]
    }

    fn service(rows: Vec<LaundryRecord>) -> DashboardService {
        DashboardService::new(Arc::new(FixedRepository { rows }))
    }

    #[tokio::test]
    async fn test_unfiltered_aggregates() {
        let dashboard = service(fixture())
            .get_dashboard(&RecordFilter::default())
            .await;

        assert!(dashboard.has_data);
        assert_eq!(dashboard.total_pieces_in, 65.0);
        assert_eq!(dashboard.total_pieces, 65.0);
        assert_eq!(dashboard.distinct_days, 2);
        assert_eq!(dashboard.daily_average, 32.5);
        assert_eq!(
            dashboard.machine_production,
            vec![GroupPoint::new("1", 60.0), GroupPoint::new("2", 5.0)]
        );
    }

    #[tokio::test]
    async fn test_machine_filter_single_row_frame() {
        let filter = RecordFilter {
            machine: Some(2),
            ..Default::default()
        };
        let dashboard = service(fixture()).get_dashboard(&filter).await;

        assert_eq!(dashboard.total_pieces_in, 5.0);
        assert_eq!(dashboard.distinct_days, 1);
        assert_eq!(dashboard.daily_average, 5.0);
        assert_eq!(dashboard.machine_production, vec![GroupPoint::new("2", 5.0)]);
        assert_eq!(dashboard.preview.rows.len(), 1);
        assert!(dashboard.client_distribution.single_client);
    }

    #[tokio::test]
    async fn test_date_range_outside_snapshot_is_total_empty() {
        let filter = RecordFilter {
            start_date: NaiveDate::from_ymd_opt(2030, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2030, 1, 31),
            ..Default::default()
        };
        let dashboard = service(fixture()).get_dashboard(&filter).await;
        assert_eq!(dashboard, Dashboard::empty());
    }

    #[tokio::test]
    async fn test_zero_duration_row_contributes_zero_utilization() {
        let mut rows = fixture();
        let mut dead = row((2024, 1, 1), 11, 1, 0.0);
        dead.operating_time = 0.0;
        dead.idle_time = 0.0;
        rows.push(dead);

        let dashboard = service(rows).get_dashboard(&RecordFilter::default()).await;
        // machine 1: three rows at 60% plus one at 0% -> 45% mean
        let m1 = dashboard
            .machine_utilization
            .iter()
            .find(|p| p.key == "1")
            .unwrap();
        assert_eq!(m1.value, 45.0);
    }

    #[tokio::test]
    async fn test_machine_all_is_identity() {
        let explicit_all = RecordFilter::default();
        let a = service(fixture()).get_dashboard(&explicit_all).await;
        let b = service(fixture())
            .get_dashboard(&RecordFilter {
                machine: None,
                ..Default::default()
            })
            .await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_band_filter_evaluates_derived_metric() {
        // Fixture rows: efficiency = (90+70)/2 = 80 -> Medium, utilization 60 -> Medium
        let filter = RecordFilter {
            efficiency_band: BandFilter::High,
            ..Default::default()
        };
        let dashboard = service(fixture()).get_dashboard(&filter).await;
        assert!(!dashboard.has_data);

        let filter = RecordFilter {
            efficiency_band: BandFilter::Medium,
            utilization_band: BandFilter::Medium,
            ..Default::default()
        };
        let dashboard = service(fixture()).get_dashboard(&filter).await;
        assert_eq!(dashboard.total_pieces_in, 65.0);
    }

    #[tokio::test]
    async fn test_trend_is_chronological() {
        let dashboard = service(fixture())
            .get_dashboard(&RecordFilter::default())
            .await;
        let dates: Vec<NaiveDate> = dashboard.production_trend.iter().map(|p| p.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
        assert_eq!(dashboard.production_trend[0].value, 60.0);
        assert_eq!(dashboard.production_trend[1].value, 5.0);
    }

    #[tokio::test]
    async fn test_heatmap_buckets_by_weekday_and_hour() {
        let dashboard = service(fixture())
            .get_dashboard(&RecordFilter::default())
            .await;
        // 2024-01-01 was a Monday; 2024-01-02 a Tuesday.
        assert_eq!(dashboard.production_heatmap.values[0][8], 10.0);
        assert_eq!(dashboard.production_heatmap.values[0][9], 20.0);
        assert_eq!(dashboard.production_heatmap.values[1][8], 5.0);
    }

    #[tokio::test]
    async fn test_efficiency_comparison_means() {
        let dashboard = service(fixture())
            .get_dashboard(&RecordFilter::default())
            .await;
        assert_eq!(dashboard.efficiency_comparison.entry, 90.0);
        assert_eq!(dashboard.efficiency_comparison.exit, 70.0);
        assert_eq!(dashboard.entry_exit.entry, 65.0);
        assert_eq!(dashboard.entry_exit.exit, 61.0);
    }

    #[tokio::test]
    async fn test_efficiency_means_skip_missing_samples() {
        let mut rows = vec![row((2024, 1, 1), 8, 1, 10.0), row((2024, 1, 1), 9, 1, 20.0)];
        rows[0].efficiency_in = Some(85.5);
        rows[0].efficiency_out = None;
        rows[1].efficiency_in = None;
        rows[1].efficiency_out = Some(70.0);

        let dashboard = service(rows).get_dashboard(&RecordFilter::default()).await;
        // One present sample on each side; the missing ones stay out of the mean.
        assert_eq!(dashboard.efficiency_comparison.entry, 85.5);
        assert_eq!(dashboard.efficiency_comparison.exit, 70.0);
        assert_eq!(
            dashboard.machine_efficiency,
            vec![GroupPoint::new("1", 85.5)]
        );
    }

    #[tokio::test]
    async fn test_efficiency_means_with_no_samples_are_zero() {
        let mut rows = vec![row((2024, 1, 1), 8, 1, 10.0)];
        rows[0].efficiency_in = None;
        rows[0].efficiency_out = None;

        let dashboard = service(rows).get_dashboard(&RecordFilter::default()).await;
        assert_eq!(dashboard.efficiency_comparison.entry, 0.0);
        assert_eq!(dashboard.efficiency_comparison.exit, 0.0);
        assert_eq!(dashboard.machine_efficiency, vec![GroupPoint::new("1", 0.0)]);
    }

    #[tokio::test]
    async fn test_machine_groups_sort_numerically() {
        let rows = vec![
            row((2024, 1, 1), 8, 10, 1.0),
            row((2024, 1, 1), 9, 2, 2.0),
        ];
        let dashboard = service(rows).get_dashboard(&RecordFilter::default()).await;
        let keys: Vec<&str> = dashboard
            .machine_production
            .iter()
            .map(|p| p.key.as_str())
            .collect();
        assert_eq!(keys, vec!["2", "10"]);
    }

    #[tokio::test]
    async fn test_repository_failure_degrades_to_empty() {
        let service = DashboardService::new(Arc::new(FailingRepository));
        let dashboard = service.get_dashboard(&RecordFilter::default()).await;
        assert_eq!(dashboard, Dashboard::empty());
    }

    #[tokio::test]
    async fn test_preview_is_row_limited() {
        let rows: Vec<LaundryRecord> = (0..25)
            .map(|i| row((2024, 1, 1), 8, 1, i as f64))
            .collect();
        let dashboard = service(rows).get_dashboard(&RecordFilter::default()).await;
        assert_eq!(dashboard.preview.rows.len(), PREVIEW_ROWS);
        assert!(dashboard.preview.message.is_none());
    }
}
