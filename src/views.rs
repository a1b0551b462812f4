//! View descriptions built from stored state. Nothing here touches storage or
//! HTML; `pages` turns these into markup.

use chrono::{Local, NaiveDate};
use rand::Rng;

use crate::analytics::{self, DashboardSummary, Histogram, OutcomeSplit};
use crate::export::DisplayRow;
use crate::model::{PredictionRecord, VisitInput, WeekdayBars};
use crate::repository::{UserAccount, UserStatus};
use crate::session::{Area, LOGIN_PATH};

pub const WEEKLY_BAR_TRANSITION_MS: u32 = 700;
pub const ADMIN_BAR_TRANSITION_MS: u32 = 800;
const RECENT_ROWS: usize = 10;

const FIRST_NAMES: [&str; 10] = [
    "John", "Jane", "Michael", "Sarah", "David", "Emily", "Robert", "Jessica", "William", "Amanda",
];
const LAST_NAMES: [&str; 10] = [
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez",
];

/// Per-request UI state owned by the page controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UiState {
    pub menu_open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub href: &'static str,
    pub active: bool,
    pub logout: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub title: String,
    pub subtitle: &'static str,
    pub nav: Vec<NavItem>,
    pub menu_open: bool,
}

const USER_NAV: [(&str, &str); 4] = [
    ("Dashboard", "/user/index"),
    ("Input", "/user/input"),
    ("Predictions", "/user/predictions"),
    ("Charts", "/user/charts"),
];

const ADMIN_NAV: [(&str, &str); 5] = [
    ("Dashboard", "/admin/dashboard"),
    ("Users", "/admin/users"),
    ("Predictions", "/admin/predictions"),
    ("Analytics", "/admin/analytics"),
    ("User View", "/user/index"),
];

pub fn layout(path: &str, title: &str, ui: UiState) -> Layout {
    let admin = Area::from_path(path) == Area::Admin;
    let entries: &[(&'static str, &'static str)] = if admin { &ADMIN_NAV } else { &USER_NAV };

    let mut nav: Vec<NavItem> = entries
        .iter()
        .map(|&(label, href)| NavItem {
            label,
            href,
            active: path == href,
            logout: false,
        })
        .collect();
    nav.push(NavItem {
        label: "Logout",
        href: "/logout",
        active: false,
        logout: true,
    });

    Layout {
        title: title.to_string(),
        subtitle: if admin { "Admin Panel" } else { "AUCA Innovation Center" },
        nav,
        menu_open: ui.menu_open,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modal {
    pub title: String,
    pub message: String,
    pub confirm_action: String,
    pub cancel_href: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pie {
    pub attended_pct: u8,
    pub no_show_pct: u8,
}

impl Pie {
    pub fn gradient(&self) -> String {
        format!(
            "conic-gradient(#22c55e 0 {pct}%, #ef4444 {pct}% 100%)",
            pct = self.attended_pct
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartBar {
    pub label: String,
    pub height_pct: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarChart {
    pub bars: Vec<ChartBar>,
    pub transition_ms: u32,
}

impl BarChart {
    fn from_histogram(histogram: &Histogram) -> Self {
        BarChart {
            bars: histogram
                .buckets
                .iter()
                .map(|b| ChartBar {
                    label: b.label.clone(),
                    height_pct: b.height_pct,
                })
                .collect(),
            transition_ms: ADMIN_BAR_TRANSITION_MS,
        }
    }
}

pub fn weekly_bars(bars: &WeekdayBars) -> BarChart {
    BarChart {
        bars: bars
            .iter()
            .map(|(day, value)| ChartBar {
                label: day.to_string(),
                height_pct: value.clamp(10, 90),
            })
            .collect(),
        transition_ms: WEEKLY_BAR_TRANSITION_MS,
    }
}

pub fn percent_label(value: u8) -> String {
    format!("{value}%")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsView {
    pub accuracy: String,
    pub precision: String,
    pub recall: String,
}

impl MetricsView {
    fn from_record(record: &PredictionRecord) -> Self {
        Self {
            accuracy: percent_label(record.metrics.accuracy),
            precision: percent_label(record.metrics.precision),
            recall: percent_label(record.metrics.recall),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub banner: String,
    pub metrics: MetricsView,
    pub pie: Pie,
    pub bars: BarChart,
    pub defaults: VisitInput,
    /// The record shown was computed for this view and not stored.
    pub synthesized: bool,
}

pub fn dashboard_view(record: &PredictionRecord, synthesized: bool) -> DashboardView {
    DashboardView {
        banner: record.result.label().to_string(),
        metrics: MetricsView::from_record(record),
        pie: Pie {
            attended_pct: record.charts.attended_pct,
            no_show_pct: record.charts.no_show_pct,
        },
        bars: weekly_bars(&record.charts.bars),
        defaults: record.inputs.clone(),
        synthesized,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputView {
    pub defaults: VisitInput,
    pub saved: bool,
}

pub fn input_view(today: NaiveDate, saved: bool) -> InputView {
    InputView {
        defaults: VisitInput::with_defaults(today),
        saved,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionDetail {
    pub banner: String,
    pub age: String,
    pub gender: String,
    pub sms: &'static str,
    pub appointment_day: String,
    pub confidence: String,
    pub metrics: MetricsView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictionsView {
    Empty,
    Filled(PredictionDetail),
}

pub fn predictions_view(record: Option<&PredictionRecord>) -> PredictionsView {
    let Some(record) = record else {
        return PredictionsView::Empty;
    };
    PredictionsView::Filled(PredictionDetail {
        banner: record.result.label().to_string(),
        age: record.inputs.age.to_string(),
        gender: record.inputs.gender.clone(),
        sms: yes_no(record.inputs.sms_received),
        appointment_day: record.inputs.appointment_day.clone(),
        confidence: percent_label(record.confidence),
        metrics: MetricsView::from_record(record),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartsView {
    Empty,
    Filled {
        pie: Pie,
        weekly: BarChart,
        trend: BarChart,
    },
}

/// The trend strip is decorative and gets fresh heights on every render.
pub fn charts_view<R: Rng + ?Sized>(record: Option<&PredictionRecord>, rng: &mut R) -> ChartsView {
    let Some(record) = record else {
        return ChartsView::Empty;
    };
    let trend = BarChart {
        bars: (1..=7)
            .map(|week| ChartBar {
                label: format!("W{week}"),
                height_pct: rng.gen_range(20.0..90.0_f64).clamp(10.0, 90.0) as u8,
            })
            .collect(),
        transition_ms: ADMIN_BAR_TRANSITION_MS,
    };
    ChartsView::Filled {
        pie: Pie {
            attended_pct: record.charts.attended_pct,
            no_show_pct: record.charts.no_show_pct,
        },
        weekly: weekly_bars(&record.charts.bars),
        trend,
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

/// Display name for a record, stable across renders of the same record.
pub fn patient_name(record: &PredictionRecord) -> String {
    // FNV-1a
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    let age = record.inputs.age.to_le_bytes();
    let bytes = record
        .created_at
        .bytes()
        .chain(age)
        .chain(record.inputs.gender.bytes());
    for byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    let first = FIRST_NAMES[(hash % 10) as usize];
    let last = LAST_NAMES[((hash / 10) % 10) as usize];
    format!("{first} {last}")
}

fn display_date(record: &PredictionRecord, today: NaiveDate) -> String {
    let date = record
        .created_at()
        .map(|ts| ts.with_timezone(&Local).date_naive())
        .unwrap_or(today);
    date.format("%-m/%-d/%Y").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientRow {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub sms: &'static str,
    pub result: &'static str,
    pub confidence: String,
    pub date: String,
}

pub fn patient_row(record: &PredictionRecord, today: NaiveDate) -> PatientRow {
    PatientRow {
        name: patient_name(record),
        age: record.inputs.age,
        gender: record.inputs.gender.clone(),
        sms: yes_no(record.inputs.sms_received),
        result: record.result.label(),
        confidence: percent_label(record.confidence),
        date: display_date(record, today),
    }
}

pub fn export_rows(records: &[PredictionRecord], today: NaiveDate) -> Vec<DisplayRow> {
    records
        .iter()
        .map(|record| {
            DisplayRow::new()
                .with("Patient Name", patient_name(record))
                .with("Age", record.inputs.age.to_string())
                .with("Gender", record.inputs.gender.clone())
                .with("SMS Received", yes_no(record.inputs.sms_received))
                .with("Appointment Day", record.inputs.appointment_day.clone())
                .with("Prediction", record.result.label())
                .with("Confidence", percent_label(record.confidence))
                .with("Date", display_date(record, today))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminDashboardView {
    pub summary: DashboardSummary,
    /// Newest first.
    pub recent: Vec<PatientRow>,
    pub toast: Option<Toast>,
}

pub fn admin_dashboard_view(records: &[PredictionRecord], today: NaiveDate) -> AdminDashboardView {
    let recent = records
        .iter()
        .rev()
        .take(RECENT_ROWS)
        .map(|r| patient_row(r, today))
        .collect();
    AdminDashboardView {
        summary: analytics::dashboard_summary(records),
        recent,
        toast: None,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultFilter {
    #[default]
    All,
    Attend,
    NoShow,
}

impl ResultFilter {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "attend" => ResultFilter::Attend,
            "no-show" => ResultFilter::NoShow,
            _ => ResultFilter::All,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResultFilter::All => "all",
            ResultFilter::Attend => "attend",
            ResultFilter::NoShow => "no-show",
        }
    }

    fn matches(self, record: &PredictionRecord) -> bool {
        match self {
            ResultFilter::All => true,
            ResultFilter::Attend => record.will_attend(),
            ResultFilter::NoShow => !record.will_attend(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPredictionsView {
    pub search: String,
    pub filter: ResultFilter,
    pub rows: Vec<PatientRow>,
}

pub fn admin_predictions_view(
    records: &[PredictionRecord],
    search: &str,
    filter: ResultFilter,
    today: NaiveDate,
) -> AdminPredictionsView {
    let needle = search.trim().to_lowercase();
    let rows = records
        .iter()
        .filter(|r| filter.matches(r))
        .map(|r| patient_row(r, today))
        .filter(|row| needle.is_empty() || row.name.to_lowercase().contains(&needle))
        .collect();
    AdminPredictionsView {
        search: search.to_string(),
        filter,
        rows,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub status: UserStatus,
    pub joined: String,
    pub toggle_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsersView {
    pub rows: Vec<UserRow>,
    pub toast: Option<Toast>,
    pub modal: Option<Modal>,
}

pub fn users_view(users: &[UserAccount]) -> UsersView {
    let rows = users
        .iter()
        .map(|u| UserRow {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role.clone(),
            status: u.status,
            joined: u.joined.clone().unwrap_or_default(),
            toggle_label: match u.status {
                UserStatus::Active => "Suspend",
                UserStatus::Suspended => "Activate",
            },
        })
        .collect();
    UsersView {
        rows,
        toast: None,
        modal: None,
    }
}

/// Outcome of a user action, carried across the post/redirect as `?notice=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserNotice {
    Activated,
    Suspended,
    Deleted,
}

impl UserNotice {
    pub fn after_toggle(user: &UserAccount) -> Self {
        match user.status {
            UserStatus::Active => UserNotice::Activated,
            UserStatus::Suspended => UserNotice::Suspended,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "activated" => Some(UserNotice::Activated),
            "suspended" => Some(UserNotice::Suspended),
            "deleted" => Some(UserNotice::Deleted),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserNotice::Activated => "activated",
            UserNotice::Suspended => "suspended",
            UserNotice::Deleted => "deleted",
        }
    }

    pub fn toast(self) -> Toast {
        match self {
            UserNotice::Activated => Toast::success("User activated"),
            UserNotice::Suspended => Toast::success("User suspended"),
            UserNotice::Deleted => Toast::success("User deleted"),
        }
    }
}

pub fn delete_modal(user: &UserAccount) -> Modal {
    Modal {
        title: "Delete User".to_string(),
        message: format!(
            "Are you sure you want to delete {}? This action cannot be undone.",
            user.name
        ),
        confirm_action: format!("/admin/users/{}/delete", user.id),
        cancel_href: "/admin/users".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsView {
    Empty,
    Filled {
        split: OutcomeSplit,
        outcomes: BarChart,
        weekdays: BarChart,
        confidence: BarChart,
    },
}

pub fn analytics_view(records: &[PredictionRecord]) -> AnalyticsView {
    if records.is_empty() {
        return AnalyticsView::Empty;
    }
    let split = analytics::outcome_split(records);
    let outcomes = BarChart {
        bars: vec![
            ChartBar {
                label: "Attend".to_string(),
                height_pct: split.attend_pct,
            },
            ChartBar {
                label: "No-Show".to_string(),
                height_pct: split.no_show_pct,
            },
        ],
        transition_ms: ADMIN_BAR_TRANSITION_MS,
    };
    AnalyticsView::Filled {
        split,
        outcomes,
        weekdays: BarChart::from_histogram(&analytics::weekday_histogram(records)),
        confidence: BarChart::from_histogram(&analytics::confidence_histogram(records)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginView {
    pub error: Option<String>,
    pub email: String,
    pub action: &'static str,
}

pub fn login_view(error: Option<String>, email: &str) -> LoginView {
    LoginView {
        error,
        email: email.to_string(),
        action: LOGIN_PATH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SyntheticScorer;
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample(ts_secs: u32, age: u32) -> PredictionRecord {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, ts_secs).unwrap();
        let mut input = VisitInput::with_defaults(now.date_naive());
        input.age = age;
        SyntheticScorer::new().record(input, &mut StdRng::seed_from_u64(ts_secs as u64), now)
    }

    #[test]
    fn same_record_keeps_its_name() {
        let record = sample(1, 40);
        assert_eq!(patient_name(&record), patient_name(&record.clone()));
        let (first, last) = patient_name(&record).split_once(' ').map(|(a, b)| (a.to_string(), b.to_string())).unwrap();
        assert!(FIRST_NAMES.contains(&first.as_str()));
        assert!(LAST_NAMES.contains(&last.as_str()));
    }

    #[test]
    fn admin_dashboard_lists_latest_ten_newest_first() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let records: Vec<_> = (0..12).map(|i| sample(i, 20 + i)).collect();
        let view = admin_dashboard_view(&records, today);
        assert_eq!(view.recent.len(), 10);
        assert_eq!(view.recent[0].age, 31);
        assert_eq!(view.recent[9].age, 22);
        assert!(view.recent[0].date.ends_with("/2026"));
    }

    #[test]
    fn predictions_filter_and_search() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let records: Vec<_> = (0..8).map(|i| sample(i, 30 + i)).collect();
        let attend = records.iter().filter(|r| r.will_attend()).count();

        let view = admin_predictions_view(&records, "", ResultFilter::Attend, today);
        assert_eq!(view.rows.len(), attend);
        let view = admin_predictions_view(&records, "", ResultFilter::NoShow, today);
        assert_eq!(view.rows.len(), records.len() - attend);

        let name = patient_name(&records[3]);
        let view = admin_predictions_view(&records, &name.to_uppercase(), ResultFilter::All, today);
        assert!(view.rows.iter().all(|row| row.name == name));
        assert!(!view.rows.is_empty());
    }

    #[test]
    fn empty_state_without_record() {
        assert_eq!(predictions_view(None), PredictionsView::Empty);
        assert_eq!(charts_view(None, &mut StdRng::seed_from_u64(0)), ChartsView::Empty);
        assert_eq!(analytics_view(&[]), AnalyticsView::Empty);
    }

    #[test]
    fn dashboard_formats_percentages() {
        let record = sample(5, 45);
        let view = dashboard_view(&record, false);
        assert_eq!(view.banner, record.result.label());
        assert_eq!(view.metrics.accuracy, format!("{}%", record.metrics.accuracy));
        assert_eq!(view.bars.bars.len(), 5);
        assert!(view.pie.gradient().contains(&format!("{}%", record.charts.attended_pct)));
    }

    #[test]
    fn user_notices_survive_the_query_string() {
        for notice in [UserNotice::Activated, UserNotice::Suspended, UserNotice::Deleted] {
            assert_eq!(UserNotice::parse(notice.as_str()), Some(notice));
        }
        assert_eq!(UserNotice::parse("bogus"), None);
        assert_eq!(UserNotice::Suspended.toast(), Toast::success("User suspended"));
    }

    #[test]
    fn admin_nav_marks_active_page() {
        let layout = layout("/admin/users", "Users", UiState::default());
        assert_eq!(layout.subtitle, "Admin Panel");
        assert!(layout.nav.iter().any(|n| n.active && n.label == "Users"));
        assert!(layout.nav.last().unwrap().logout);
    }

    #[test]
    fn export_rows_follow_column_order() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let rows = export_rows(&[sample(2, 50)], today);
        let columns: Vec<_> = rows[0].columns().collect();
        assert_eq!(
            columns,
            ["Patient Name", "Age", "Gender", "SMS Received", "Appointment Day", "Prediction", "Confidence", "Date"]
        );
        assert_eq!(rows[0].get("SMS Received"), Some("Yes"));
    }
}
