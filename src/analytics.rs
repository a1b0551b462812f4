use std::collections::HashSet;

use chrono::{Datelike, Local, TimeZone, Weekday};
use serde::Serialize;

use crate::model::{PredictionRecord, WEEKDAYS};

pub const CONFIDENCE_RANGES: [&str; 5] = ["50-60", "60-70", "70-80", "80-90", "90-100"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub patients: usize,
    pub total_predictions: usize,
    pub attendance_rate: u8,
    pub no_show_rate: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutcomeSplit {
    pub attend_count: usize,
    pub no_show_count: usize,
    pub attend_pct: u8,
    pub no_show_pct: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub label: String,
    pub count: usize,
    /// Height relative to the tallest bucket, in percent.
    pub height_pct: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Histogram {
    pub buckets: Vec<Bucket>,
}

impl Histogram {
    fn from_counts(labels: &[&str], counts: &[usize]) -> Self {
        let heights = relative_heights(counts);
        let buckets = labels
            .iter()
            .zip(counts)
            .zip(heights)
            .map(|((label, &count), height_pct)| Bucket {
                label: label.to_string(),
                count,
                height_pct,
            })
            .collect();
        Histogram { buckets }
    }

    pub fn get(&self, label: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|b| b.label == label)
    }
}

fn percent(part: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u8
}

/// Scales counts so the tallest becomes 100. An all-zero input stays at 0.
pub fn relative_heights(counts: &[usize]) -> Vec<u8> {
    let max = counts.iter().copied().max().unwrap_or(0).max(1);
    counts.iter().map(|&count| percent(count, max)).collect()
}

pub fn outcome_split(records: &[PredictionRecord]) -> OutcomeSplit {
    let attend_count = records.iter().filter(|r| r.will_attend()).count();
    let attend_pct = percent(attend_count, records.len());
    OutcomeSplit {
        attend_count,
        no_show_count: records.len() - attend_count,
        attend_pct,
        no_show_pct: 100 - attend_pct,
    }
}

pub fn dashboard_summary(records: &[PredictionRecord]) -> DashboardSummary {
    let patients: HashSet<(u32, &str)> = records
        .iter()
        .map(|r| (r.inputs.age, r.inputs.gender.as_str()))
        .collect();
    let split = outcome_split(records);

    DashboardSummary {
        patients: patients.len(),
        total_predictions: records.len(),
        attendance_rate: split.attend_pct,
        no_show_rate: split.no_show_pct,
    }
}

/// Predictions per weekday of creation in the server's local time. Weekend
/// and undated records are left out.
pub fn weekday_histogram(records: &[PredictionRecord]) -> Histogram {
    weekday_histogram_in(records, &Local)
}

pub fn weekday_histogram_in<Tz: TimeZone>(records: &[PredictionRecord], tz: &Tz) -> Histogram {
    let mut counts = [0usize; 5];
    for created in records.iter().filter_map(PredictionRecord::created_at) {
        let slot = match created.with_timezone(tz).weekday() {
            Weekday::Mon => 0,
            Weekday::Tue => 1,
            Weekday::Wed => 2,
            Weekday::Thu => 3,
            Weekday::Fri => 4,
            Weekday::Sat | Weekday::Sun => continue,
        };
        counts[slot] += 1;
    }
    Histogram::from_counts(&WEEKDAYS, &counts)
}

/// Predictions per confidence decile from 50 up. Confidence below 50 is not
/// charted.
pub fn confidence_histogram(records: &[PredictionRecord]) -> Histogram {
    let mut counts = [0usize; 5];
    for record in records {
        let slot = match record.confidence {
            50..=59 => 0,
            60..=69 => 1,
            70..=79 => 2,
            80..=89 => 3,
            90..=u8::MAX => 4,
            _ => continue,
        };
        counts[slot] += 1;
    }
    Histogram::from_counts(&CONFIDENCE_RANGES, &counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChartData, Metrics, Outcome, VisitInput, WeekdayBars};

    fn record(created_at: &str, age: u32, confidence: u8) -> PredictionRecord {
        let attend = confidence >= 50;
        PredictionRecord {
            created_at: created_at.to_string(),
            inputs: VisitInput {
                age,
                gender: "Female".to_string(),
                sms_received: true,
                appointment_day: "2026-03-02".to_string(),
            },
            result: if attend { Outcome::Attend } else { Outcome::NoShow },
            confidence,
            metrics: Metrics {
                accuracy: 80,
                precision: 78,
                recall: 82,
            },
            charts: ChartData {
                attended_pct: confidence,
                no_show_pct: 100 - confidence,
                bars: WeekdayBars {
                    mon: 50,
                    tue: 50,
                    wed: 50,
                    thu: 50,
                    fri: 50,
                },
            },
        }
    }

    #[test]
    fn summary_counts_distinct_patients() {
        let records = vec![
            record("2026-03-02T09:00:00.000Z", 30, 80),
            record("2026-03-03T09:00:00.000Z", 30, 45),
            record("2026-03-04T09:00:00.000Z", 61, 70),
        ];
        let summary = dashboard_summary(&records);
        assert_eq!(summary.patients, 2);
        assert_eq!(summary.total_predictions, 3);
        assert_eq!(summary.attendance_rate, 67);
        assert_eq!(summary.no_show_rate, 33);
    }

    #[test]
    fn empty_history_reports_zero_attendance() {
        let summary = dashboard_summary(&[]);
        assert_eq!(summary.attendance_rate, 0);
        assert_eq!(summary.no_show_rate, 100);
    }

    #[test]
    fn weekday_histogram_scales_tallest_to_full_height() {
        // 2026-03-02 is a Monday, 2026-03-07 a Saturday.
        let records = vec![
            record("2026-03-02T09:00:00.000Z", 30, 80),
            record("2026-03-02T10:00:00.000Z", 31, 80),
            record("2026-03-04T10:00:00.000Z", 32, 80),
            record("2026-03-07T10:00:00.000Z", 33, 80),
            record("not a date", 34, 80),
        ];
        let histogram = weekday_histogram_in(&records, &chrono::Utc);
        assert_eq!(histogram.get("Mon").unwrap().height_pct, 100);
        assert_eq!(histogram.get("Wed").unwrap().height_pct, 50);
        assert_eq!(histogram.get("Fri").unwrap().height_pct, 0);
        assert_eq!(histogram.buckets.iter().map(|b| b.count).sum::<usize>(), 3);
    }

    #[test]
    fn weekday_follows_the_given_timezone() {
        // Sunday evening UTC is Monday morning at UTC+10, Friday evening is Saturday.
        let records = vec![
            record("2026-03-01T20:00:00.000Z", 30, 80),
            record("2026-03-06T20:00:00.000Z", 31, 80),
        ];
        let plus_ten = chrono::FixedOffset::east_opt(10 * 3600).unwrap();

        let local = weekday_histogram_in(&records, &plus_ten);
        assert_eq!(local.get("Mon").unwrap().count, 1);
        assert_eq!(local.get("Fri").unwrap().count, 0);

        let utc = weekday_histogram_in(&records, &chrono::Utc);
        assert_eq!(utc.get("Mon").unwrap().count, 0);
        assert_eq!(utc.get("Fri").unwrap().count, 1);
    }

    #[test]
    fn confidence_below_fifty_is_not_bucketed() {
        let records = vec![
            record("2026-03-02T09:00:00.000Z", 30, 45),
            record("2026-03-02T09:00:01.000Z", 30, 55),
            record("2026-03-02T09:00:02.000Z", 30, 95),
            record("2026-03-02T09:00:03.000Z", 30, 91),
        ];
        let histogram = confidence_histogram(&records);
        assert_eq!(histogram.get("50-60").unwrap().count, 1);
        assert_eq!(histogram.get("90-100").unwrap().count, 2);
        assert_eq!(histogram.get("50-60").unwrap().height_pct, 50);
    }

    #[test]
    fn zero_counts_stay_flat() {
        assert_eq!(relative_heights(&[0, 0, 0]), vec![0, 0, 0]);
    }
}
