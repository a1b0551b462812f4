use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const DEFAULT_AGE: u32 = 30;
pub const DEFAULT_GENDER: &str = "Male";
pub const WEEKDAYS: [&str; 5] = ["Mon", "Tue", "Wed", "Thu", "Fri"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitInput {
    pub age: u32,
    pub gender: String,
    pub sms_received: bool,
    pub appointment_day: String,
}

impl VisitInput {
    pub fn with_defaults(today: NaiveDate) -> Self {
        Self {
            age: DEFAULT_AGE,
            gender: DEFAULT_GENDER.to_string(),
            sms_received: true,
            appointment_day: format_date(today),
        }
    }
}

/// Raw visit form fields as posted by the input and dashboard pages.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitForm {
    pub age: Option<String>,
    pub gender: Option<String>,
    pub sms: Option<String>,
    pub appointment_day: Option<String>,
}

impl VisitForm {
    pub fn into_input(self, today: NaiveDate) -> VisitInput {
        let age = self
            .age
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .and_then(|raw| raw.parse::<f64>().ok())
            .filter(|age| age.is_finite() && *age >= 0.0)
            .map(|age| age.trunc() as u32)
            .unwrap_or(DEFAULT_AGE);

        let gender = non_empty(self.gender).unwrap_or_else(|| DEFAULT_GENDER.to_string());
        let sms_received = non_empty(self.sms)
            .map(|sms| sms.eq_ignore_ascii_case("yes"))
            .unwrap_or(true);
        let appointment_day = non_empty(self.appointment_day).unwrap_or_else(|| format_date(today));

        VisitInput {
            age,
            gender,
            sms_received,
            appointment_day,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "Likely to Attend")]
    Attend,
    #[serde(rename = "Likely No-Show")]
    NoShow,
}

impl Outcome {
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Attend => "Likely to Attend",
            Outcome::NoShow => "Likely No-Show",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub accuracy: u8,
    pub precision: u8,
    pub recall: u8,
}

/// Weekly attendance bars. Field order matches the stored `Mon..Fri` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayBars {
    #[serde(rename = "Mon", default = "missing_bar")]
    pub mon: u8,
    #[serde(rename = "Tue", default = "missing_bar")]
    pub tue: u8,
    #[serde(rename = "Wed", default = "missing_bar")]
    pub wed: u8,
    #[serde(rename = "Thu", default = "missing_bar")]
    pub thu: u8,
    #[serde(rename = "Fri", default = "missing_bar")]
    pub fri: u8,
}

// Height shown for a day absent from stored data.
fn missing_bar() -> u8 {
    50
}

impl WeekdayBars {
    pub fn values(&self) -> [u8; 5] {
        [self.mon, self.tue, self.wed, self.thu, self.fri]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u8)> {
        WEEKDAYS.into_iter().zip(self.values())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub attended_pct: u8,
    pub no_show_pct: u8,
    pub bars: WeekdayBars,
}

/// Output of the scoring engine before it is stamped and stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub result: Outcome,
    pub confidence: u8,
    pub metrics: Metrics,
    pub charts: ChartData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub created_at: String,
    pub inputs: VisitInput,
    pub result: Outcome,
    pub confidence: u8,
    pub metrics: Metrics,
    pub charts: ChartData,
}

impl PredictionRecord {
    pub fn new(created_at: DateTime<Utc>, inputs: VisitInput, prediction: Prediction) -> Self {
        Self {
            created_at: format_timestamp(created_at),
            inputs,
            result: prediction.result,
            confidence: prediction.confidence,
            metrics: prediction.metrics,
            charts: prediction.charts,
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    pub fn will_attend(&self) -> bool {
        self.result == Outcome::Attend
    }
}

/// Stand-in for a trained classifier: a fixed baseline nudged by the visit
/// inputs plus uniform jitter. Output ranges are what the views depend on.
#[derive(Debug, Clone)]
pub struct SyntheticScorer {
    base_score: f64,
    sms_bonus: f64,
    young_penalty: f64,
    senior_penalty: f64,
    jitter: f64,
}

impl Default for SyntheticScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticScorer {
    pub fn new() -> Self {
        Self {
            base_score: 0.6,
            sms_bonus: 0.15,
            young_penalty: 0.06,
            senior_penalty: 0.04,
            jitter: 0.07,
        }
    }

    pub fn score<R: Rng + ?Sized>(&self, input: &VisitInput, rng: &mut R) -> f64 {
        let mut score = self.base_score;
        if input.sms_received {
            score += self.sms_bonus;
        }
        if input.age < 25 {
            score -= self.young_penalty;
        }
        if input.age >= 60 {
            score -= self.senior_penalty;
        }

        let noise: f64 = rng.gen_range(-self.jitter..self.jitter);
        // Snap to whole percents so the 0.5 threshold and the rounded
        // attended percentage can never disagree.
        js_round((score + noise).clamp(0.05, 0.95) * 100.0) / 100.0
    }

    pub fn predict<R: Rng + ?Sized>(&self, input: &VisitInput, rng: &mut R) -> Prediction {
        let score = self.score(input, rng);
        let confidence = js_round(score * 100.0);

        let accuracy = js_round((confidence + offset(rng)).clamp(70.0, 95.0));
        let precision = js_round((confidence - 3.0 + offset(rng)).clamp(65.0, 95.0));
        let recall = js_round((confidence + 2.0 + offset(rng)).clamp(65.0, 95.0));

        let attended_pct = js_round(score * 100.0);
        let base = 35.0 + js_round(attended_pct / 100.0 * 30.0);
        let mut bar = || (base + js_round(rng.gen_range(-9.0..9.0))).clamp(15.0, 85.0) as u8;
        let bars = WeekdayBars {
            mon: bar(),
            tue: bar(),
            wed: bar(),
            thu: bar(),
            fri: bar(),
        };

        Prediction {
            result: if score >= 0.5 { Outcome::Attend } else { Outcome::NoShow },
            confidence: confidence as u8,
            metrics: Metrics {
                accuracy: accuracy as u8,
                precision: precision as u8,
                recall: recall as u8,
            },
            charts: ChartData {
                attended_pct: attended_pct as u8,
                no_show_pct: 100 - attended_pct as u8,
                bars,
            },
        }
    }

    pub fn record<R: Rng + ?Sized>(
        &self,
        input: VisitInput,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> PredictionRecord {
        let prediction = self.predict(&input, rng);
        PredictionRecord::new(now, input, prediction)
    }
}

pub fn compute_prediction<R: Rng + ?Sized>(input: &VisitInput, rng: &mut R) -> Prediction {
    SyntheticScorer::new().predict(input, rng)
}

fn offset<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(-5.0..5.0)
}

// Half-up rounding, so -4.5 becomes -4 like the stored data expects.
pub(crate) fn js_round(value: f64) -> f64 {
    (value + 0.5).floor()
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn input(age: u32, sms_received: bool) -> VisitInput {
        VisitInput {
            age,
            gender: "Female".to_string(),
            sms_received,
            appointment_day: "2026-03-02".to_string(),
        }
    }

    #[test]
    fn predictions_stay_within_bands() {
        let mut rng = StdRng::seed_from_u64(7);
        let scorer = SyntheticScorer::new();

        for age in [0, 18, 24, 25, 45, 59, 60, 90] {
            for sms in [true, false] {
                for _ in 0..50 {
                    let p = scorer.predict(&input(age, sms), &mut rng);
                    assert_eq!(p.charts.attended_pct as u32 + p.charts.no_show_pct as u32, 100);
                    assert_eq!(p.result == Outcome::Attend, p.charts.attended_pct >= 50);
                    assert_eq!(p.confidence, p.charts.attended_pct);
                    assert!((70..=95).contains(&p.metrics.accuracy));
                    assert!((65..=95).contains(&p.metrics.precision));
                    assert!((65..=95).contains(&p.metrics.recall));
                    assert!(p.charts.bars.values().iter().all(|v| (15..=85).contains(v)));
                }
            }
        }
    }

    #[test]
    fn sms_reminder_lifts_the_score() {
        let scorer = SyntheticScorer::new();
        let with_sms = scorer.score(&input(40, true), &mut StdRng::seed_from_u64(3));
        let without = scorer.score(&input(40, false), &mut StdRng::seed_from_u64(3));
        assert!((with_sms - without - 0.15).abs() < 0.011);
    }

    #[test]
    fn seeded_generator_is_reproducible() {
        let a = compute_prediction(&input(30, true), &mut StdRng::seed_from_u64(11));
        let b = compute_prediction(&input(30, true), &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
    }

    #[test]
    fn form_defaults_fill_missing_fields() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let parsed = VisitForm {
            age: Some("abc".to_string()),
            gender: Some(String::new()),
            sms: Some("NO".to_string()),
            appointment_day: None,
        }
        .into_input(today);

        assert_eq!(parsed.age, DEFAULT_AGE);
        assert_eq!(parsed.gender, "Male");
        assert!(!parsed.sms_received);
        assert_eq!(parsed.appointment_day, "2026-10-19");
        assert!(VisitForm::default().into_input(today).sms_received);
    }

    #[test]
    fn record_serializes_with_stored_field_names() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap();
        let record = SyntheticScorer::new().record(input(33, true), &mut StdRng::seed_from_u64(1), now);
        let json = serde_json::to_string(&record).unwrap();

        assert!(json.starts_with(r#"{"createdAt":"2026-03-02T09:30:00.000Z","inputs":{"age":33"#));
        assert!(json.contains(r#""smsReceived":true"#));
        assert!(json.contains(r#""bars":{"Mon":"#));
        assert!(json.contains(r#""attendedPct":"#));
        assert_eq!(record.created_at(), Some(now));
    }

    #[test]
    fn half_values_round_up() {
        assert_eq!(js_round(-4.5), -4.0);
        assert_eq!(js_round(4.5), 5.0);
        assert_eq!(js_round(74.4), 74.0);
    }

    #[test]
    fn missing_weekday_bar_reads_as_fifty() {
        let bars: WeekdayBars = serde_json::from_str(r#"{"Mon": 20, "Wed": 70}"#).unwrap();
        assert_eq!(bars.values(), [20, 50, 70, 50, 50]);
    }
}
