//! Renders view descriptions as HTML documents.

use std::fmt::Write;

use crate::analytics::DashboardSummary;
use crate::model::VisitInput;
use crate::repository::UserStatus;
use crate::views::{
    AdminDashboardView, AdminPredictionsView, AnalyticsView, BarChart, ChartsView, DashboardView,
    InputView, Layout, LoginView, MetricsView, Modal, PatientRow, Pie, PredictionsView, Toast,
    ToastKind, UsersView,
};

const STYLE: &str = r#"
    body { font-family: Arial, sans-serif; margin: 0; background: #f8fafc; color: #334155; }
    nav { background: linear-gradient(90deg, #0f766e, #059669); color: white; padding: 12px 32px; display: flex; justify-content: space-between; align-items: center; flex-wrap: wrap; }
    nav a, nav button { color: white; text-decoration: none; padding: 4px 12px; border-radius: 8px; background: none; border: none; font: inherit; cursor: pointer; }
    nav a.active { background: #10b981; }
    header { background: linear-gradient(90deg, #0d9488, #10b981); color: white; padding: 24px; }
    main { max-width: 960px; margin: 24px auto; padding: 0 16px; }
    .card { background: white; border-radius: 10px; padding: 20px; margin: 16px 0; box-shadow: 0 1px 3px rgba(0,0,0,.1); }
    .metrics { display: grid; grid-template-columns: repeat(auto-fit, minmax(160px, 1fr)); gap: 12px; }
    .pie { width: 160px; height: 160px; border-radius: 50%; }
    .bars { display: flex; align-items: flex-end; gap: 12px; height: 180px; }
    .bar { width: 36px; background: #10b981; }
    table { width: 100%; border-collapse: collapse; }
    th, td { padding: 10px; text-align: left; border-bottom: 1px solid #e2e8f0; }
    .toast { position: fixed; right: 16px; bottom: 16px; color: white; padding: 12px 16px; border-radius: 8px; }
    .toast.success { background: #10b981; } .toast.error { background: #ef4444; }
    .modal { position: fixed; inset: 0; background: rgba(15,23,42,.5); display: flex; align-items: center; justify-content: center; }
    .error { color: #dc2626; }
    .badge-active { color: #047857; background: #ecfdf5; padding: 2px 8px; border-radius: 4px; }
    .badge-suspended { color: #b91c1c; background: #fef2f2; padding: 2px 8px; border-radius: 4px; }
"#;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn document(title: &str, chrome: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title} - Health Sphere</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{chrome}<main id=\"hsContent\">\n{body}</main>\n</body>\n</html>\n",
        title = escape(title),
    )
}

fn nav(layout: &Layout) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<nav id=\"topNav\">");
    let _ = writeln!(
        out,
        "<div><strong>Health Sphere</strong><div><small>{}</small></div></div>",
        escape(layout.subtitle)
    );
    let _ = writeln!(
        out,
        "<a id=\"hsMenuToggle\" href=\"?menu={}\">Menu</a>",
        if layout.menu_open { "closed" } else { "open" }
    );
    let _ = writeln!(
        out,
        "<div id=\"hsNavDropdown\" aria-expanded=\"{}\" class=\"{}\">",
        layout.menu_open,
        if layout.menu_open { "open" } else { "closed" }
    );
    for item in &layout.nav {
        if item.logout {
            let _ = writeln!(
                out,
                "<form method=\"post\" action=\"{}\" style=\"display:inline\"><button data-hs-nav-action=\"logout\">{}</button></form>",
                item.href, item.label
            );
        } else {
            let _ = writeln!(
                out,
                "<a data-hs-nav href=\"{}\"{}>{}</a>",
                item.href,
                if item.active { " class=\"active\"" } else { "" },
                item.label
            );
        }
    }
    let _ = writeln!(out, "</div>\n</nav>");
    let _ = writeln!(out, "<header><h1>{}</h1></header>", escape(&layout.title));
    out
}

fn toast(toast: Option<&Toast>) -> String {
    let Some(toast) = toast else {
        return String::new();
    };
    let kind = match toast.kind {
        ToastKind::Success => "success",
        ToastKind::Error => "error",
    };
    format!(
        "<div id=\"hsToastContainer\"><div class=\"toast {kind}\">{}</div></div>\n",
        escape(&toast.message)
    )
}

fn modal(modal: Option<&Modal>) -> String {
    let Some(modal) = modal else {
        return String::new();
    };
    format!(
        "<div id=\"hsConfirmModal\" class=\"modal\"><div class=\"card\">\
         <h3 id=\"hsModalTitle\">{}</h3><p id=\"hsModalMessage\">{}</p>\
         <a id=\"hsModalCancel\" href=\"{}\">Cancel</a> \
         <form method=\"post\" action=\"{}\" style=\"display:inline\"><button id=\"hsModalConfirm\">Delete</button></form>\
         </div></div>\n",
        escape(&modal.title),
        escape(&modal.message),
        escape(&modal.cancel_href),
        escape(&modal.confirm_action),
    )
}

fn pie(pie: &Pie) -> String {
    format!(
        "<div id=\"hsPie\" class=\"pie\" style=\"background: {}\"></div>\
         <p>Attend <span id=\"hsPieAttend\">{}%</span> / No-show <span id=\"hsPieNoShow\">{}%</span></p>\n",
        pie.gradient(),
        pie.attended_pct,
        pie.no_show_pct
    )
}

fn bar_chart(chart: &BarChart, attr: &str) -> String {
    let mut out = String::from("<div class=\"bars\">\n");
    for bar in &chart.bars {
        let _ = writeln!(
            out,
            "<div><div {attr}=\"{label}\" class=\"bar\" style=\"height: {h}%; transition: height {ms}ms ease\"></div><small>{label}</small></div>",
            label = escape(&bar.label),
            h = bar.height_pct,
            ms = chart.transition_ms,
        );
    }
    out.push_str("</div>\n");
    out
}

fn metrics(view: &MetricsView) -> String {
    format!(
        "<div class=\"metrics\">\
         <div class=\"card\">Accuracy <strong id=\"hsMetricAccuracy\">{}</strong></div>\
         <div class=\"card\">Precision <strong id=\"hsMetricPrecision\">{}</strong></div>\
         <div class=\"card\">Recall <strong id=\"hsMetricRecall\">{}</strong></div>\
         </div>\n",
        escape(&view.accuracy),
        escape(&view.precision),
        escape(&view.recall)
    )
}

fn visit_form(defaults: &VisitInput, action: &str) -> String {
    let sms = |value: bool| if defaults.sms_received == value { " selected" } else { "" };
    format!(
        "<form method=\"post\" action=\"{action}\" class=\"card\">\
         <label>Age <input id=\"hsAge\" name=\"age\" type=\"number\" min=\"0\" value=\"{age}\"></label>\
         <label>Gender <input id=\"hsGender\" name=\"gender\" value=\"{gender}\"></label>\
         <label>SMS received <select id=\"hsSms\" name=\"sms\"><option{yes}>Yes</option><option{no}>No</option></select></label>\
         <label>Appointment day <input id=\"hsApptDay\" name=\"appointmentDay\" type=\"date\" value=\"{day}\"></label>\
         <button id=\"hsPredictBtn\" type=\"submit\">Predict</button>\
         </form>\n",
        action = escape(action),
        age = defaults.age,
        gender = escape(&defaults.gender),
        yes = sms(true),
        no = sms(false),
        day = escape(&defaults.appointment_day),
    )
}

pub fn dashboard_page(layout: &Layout, view: &DashboardView) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "<section class=\"card\"><h2 id=\"hsResultText\">{}</h2></section>",
        escape(&view.banner)
    );
    body.push_str(&metrics(&view.metrics));
    body.push_str("<section class=\"card\">\n");
    body.push_str(&pie(&view.pie));
    body.push_str(&bar_chart(&view.bars, "data-hs-bar"));
    body.push_str("</section>\n");
    body.push_str(&visit_form(&view.defaults, "/user/predict?from=dashboard"));
    document(&layout.title, &nav(layout), &body)
}

pub fn input_page(layout: &Layout, view: &InputView) -> String {
    let mut body = visit_form(&view.defaults, "/user/predict");
    if view.saved {
        body.push_str(
            "<p id=\"hsInputStatus\">Saved locally. You can view it on <a href=\"/user/predictions\">Predictions</a>.</p>\n",
        );
    }
    document(&layout.title, &nav(layout), &body)
}

pub fn predictions_page(layout: &Layout, view: &PredictionsView) -> String {
    let body = match view {
        PredictionsView::Empty => empty_state("No prediction yet. Run one from the Input page."),
        PredictionsView::Filled(detail) => {
            let mut body = String::new();
            let _ = writeln!(
                body,
                "<section id=\"hsPredictionView\" class=\"card\"><h2 id=\"hsResultText\">{banner}</h2>\
                 <p>Age <span id=\"hsPredAge\">{age}</span></p>\
                 <p>Gender <span id=\"hsPredGender\">{gender}</span></p>\
                 <p>SMS received <span id=\"hsPredSms\">{sms}</span></p>\
                 <p>Appointment day <span id=\"hsPredDay\">{day}</span></p>\
                 <p>Prediction <span id=\"hsPredFinal\">{banner}</span></p>\
                 <p>Confidence <span id=\"hsConfidenceValue\">{confidence}</span></p></section>",
                banner = escape(&detail.banner),
                age = escape(&detail.age),
                gender = escape(&detail.gender),
                sms = detail.sms,
                day = escape(&detail.appointment_day),
                confidence = escape(&detail.confidence),
            );
            body.push_str(&metrics(&detail.metrics));
            body
        }
    };
    document(&layout.title, &nav(layout), &body)
}

pub fn charts_page(layout: &Layout, view: &ChartsView) -> String {
    let body = match view {
        ChartsView::Empty => empty_state("No prediction yet. Run one from the Input page."),
        ChartsView::Filled { pie: p, weekly, trend } => {
            let mut body = String::from("<section id=\"hsChartsView\" class=\"card\">\n");
            body.push_str(&pie(p));
            body.push_str("<h3>Weekly attendance</h3>\n");
            body.push_str(&bar_chart(weekly, "data-hs-bar"));
            body.push_str("<h3>Trend</h3>\n");
            body.push_str(&bar_chart(trend, "data-hs-trend"));
            body.push_str("</section>\n");
            body
        }
    };
    document(&layout.title, &nav(layout), &body)
}

fn empty_state(message: &str) -> String {
    format!("<section id=\"hsEmptyState\" class=\"card\"><p>{}</p></section>\n", escape(message))
}

fn summary_cards(summary: &DashboardSummary) -> String {
    format!(
        "<div class=\"metrics\">\
         <div class=\"card\">Patients <strong id=\"hsMetricPatients\">{}</strong></div>\
         <div class=\"card\">Predictions <strong id=\"hsMetricPredictions\">{}</strong></div>\
         <div class=\"card\">Attendance <strong id=\"hsMetricAttendance\">{}%</strong></div>\
         <div class=\"card\">No-show <strong id=\"hsMetricNoShow\">{}%</strong></div>\
         </div>\n",
        summary.patients, summary.total_predictions, summary.attendance_rate, summary.no_show_rate
    )
}

fn patient_table(rows: &[PatientRow], with_gender: bool) -> String {
    if rows.is_empty() {
        return empty_state("No predictions recorded yet.");
    }
    let mut out = String::from("<table id=\"hsPredictionsTable\">\n<tr><th>Patient</th><th>Age</th>");
    if with_gender {
        out.push_str("<th>Gender</th>");
    }
    out.push_str("<th>SMS</th><th>Prediction</th><th>Confidence</th><th>Date</th></tr>\n<tbody id=\"hsPredictionsTbody\">\n");
    for row in rows {
        let _ = write!(out, "<tr><td>{}</td><td>{}</td>", escape(&row.name), row.age);
        if with_gender {
            let _ = write!(out, "<td>{}</td>", escape(&row.gender));
        }
        let _ = writeln!(
            out,
            "<td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            row.sms,
            row.result,
            escape(&row.confidence),
            escape(&row.date)
        );
    }
    out.push_str("</tbody>\n</table>\n");
    out
}

pub fn admin_dashboard_page(layout: &Layout, view: &AdminDashboardView) -> String {
    let mut body = summary_cards(&view.summary);
    body.push_str("<section class=\"card\"><h3>Recent predictions</h3>\n");
    body.push_str("<a id=\"hsExportBtn\" href=\"/admin/export.csv\">Export CSV</a>\n");
    body.push_str(&patient_table(&view.recent, false));
    body.push_str("</section>\n");
    body.push_str(&toast(view.toast.as_ref()));
    document(&layout.title, &nav(layout), &body)
}

pub fn admin_predictions_page(layout: &Layout, view: &AdminPredictionsView) -> String {
    let option = |value: &str, label: &str| {
        format!(
            "<option value=\"{value}\"{}>{label}</option>",
            if view.filter.as_str() == value { " selected" } else { "" }
        )
    };
    let mut body = format!(
        "<form method=\"get\" action=\"/admin/predictions\" class=\"card\">\
         <input id=\"hsSearchInput\" name=\"search\" placeholder=\"Search by name\" value=\"{}\">\
         <select id=\"hsFilterSelect\" name=\"filter\">{}{}{}</select>\
         <button type=\"submit\">Filter</button></form>\n",
        escape(&view.search),
        option("all", "All"),
        option("attend", "Likely to Attend"),
        option("no-show", "Likely No-Show"),
    );
    body.push_str(&patient_table(&view.rows, true));
    document(&layout.title, &nav(layout), &body)
}

pub fn users_page(layout: &Layout, view: &UsersView) -> String {
    let mut body = String::from(
        "<table>\n<tr><th>Name</th><th>Email</th><th>Role</th><th>Status</th><th>Joined</th><th>Actions</th></tr>\n<tbody id=\"hsUsersTbody\">\n",
    );
    for row in &view.rows {
        let badge = match row.status {
            UserStatus::Active => "badge-active",
            UserStatus::Suspended => "badge-suspended",
        };
        let _ = writeln!(
            body,
            "<tr><td>{name}</td><td>{email}</td><td>{role}</td><td><span class=\"{badge}\">{status}</span></td><td>{joined}</td><td>\
             <form method=\"post\" action=\"/admin/users/{id}/toggle\" style=\"display:inline\"><button data-user-action=\"toggle\">{toggle}</button></form> \
             <a data-user-action=\"delete\" href=\"/admin/users/{id}/delete\">Delete</a></td></tr>",
            name = escape(&row.name),
            email = escape(&row.email),
            role = escape(&row.role),
            status = row.status.label(),
            joined = escape(&row.joined),
            id = row.id,
            toggle = row.toggle_label,
        );
    }
    body.push_str("</tbody>\n</table>\n");
    body.push_str(&modal(view.modal.as_ref()));
    body.push_str(&toast(view.toast.as_ref()));
    document(&layout.title, &nav(layout), &body)
}

pub fn analytics_page(layout: &Layout, view: &AnalyticsView) -> String {
    let body = match view {
        AnalyticsView::Empty => empty_state("No predictions to analyse yet."),
        AnalyticsView::Filled {
            split,
            outcomes,
            weekdays,
            confidence,
        } => {
            let mut body = format!(
                "<section class=\"card\"><h3>Outcomes</h3><p>{} attend / {} no-show</p>\n<p><span id=\"hsBarAttendLabel\">{}%</span> / <span id=\"hsBarNoShowLabel\">{}%</span></p>\n",
                split.attend_count, split.no_show_count, split.attend_pct, split.no_show_pct
            );
            body.push_str(&bar_chart(outcomes, "data-hs-outcome-bar"));
            body.push_str("</section>\n<section class=\"card\"><h3>Predictions by weekday</h3>\n");
            body.push_str(&bar_chart(weekdays, "data-hs-day-bar"));
            body.push_str("</section>\n<section class=\"card\"><h3>Confidence distribution</h3>\n");
            body.push_str(&bar_chart(confidence, "data-hs-conf-bar"));
            body.push_str("</section>\n");
            body
        }
    };
    document(&layout.title, &nav(layout), &body)
}

pub fn landing_page() -> String {
    let body = "<section class=\"card\"><h2>Health Sphere</h2>\
        <p>Patient no-show prediction for outpatient appointments. Predictions here are simulated.</p>\
        <p><a href=\"/login\">Log in</a> or <a href=\"/register\">create an account</a>.</p></section>\n";
    document("Welcome", "", body)
}

pub fn login_page(view: &LoginView) -> String {
    let error = view
        .error
        .as_deref()
        .map(|e| format!("<p class=\"error\">{}</p>", escape(e)))
        .unwrap_or_default();
    let body = format!(
        "<form id=\"hsLoginForm\" method=\"post\" action=\"{action}\" class=\"card\"><h2>Log in</h2>{error}\
         <label>Email <input id=\"hsLoginEmail\" name=\"email\" type=\"email\" value=\"{email}\"></label>\
         <label>Password <input id=\"hsLoginPassword\" name=\"password\" type=\"password\"></label>\
         <label><input type=\"radio\" name=\"role\" value=\"user\" checked> User</label>\
         <label><input type=\"radio\" name=\"role\" value=\"admin\"> Admin</label>\
         <button id=\"hsLoginBtn\" type=\"submit\">Log in</button>\
         <p><a href=\"/register\">Create an account</a></p></form>\n",
        action = view.action,
        email = escape(&view.email),
    );
    document("Log in", "", &body)
}

pub fn register_page(error: Option<&str>) -> String {
    let error = error
        .map(|e| format!("<p id=\"hsRegisterError\" class=\"error\">{}</p>", escape(e)))
        .unwrap_or_default();
    let body = format!(
        "<form id=\"hsRegisterForm\" method=\"post\" action=\"/register\" class=\"card\"><h2>Create account</h2>\
         <label>Name <input id=\"hsRegisterName\" name=\"name\"></label>\
         <label>Email <input id=\"hsRegisterEmail\" name=\"email\" type=\"email\"></label>\
         <label>Password <input id=\"hsRegisterPassword\" name=\"password\" type=\"password\"></label>\
         <label>Confirm password <input id=\"hsRegisterConfirmPassword\" name=\"confirmPassword\" type=\"password\"></label>\
         <label>Account type <select id=\"accountType\" name=\"accountType\"><option value=\"\">Choose</option>\
         <option value=\"user\">User</option><option value=\"admin\">Admin</option></select></label>\
         {error}<button id=\"hsRegisterBtn\" type=\"submit\">Create Account</button></form>\n"
    );
    document("Register", "", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::{layout, users_view, UiState};
    use crate::repository::UserAccount;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<b>\"O'Neil\" & co</b>"), "&lt;b&gt;&quot;O&#39;Neil&quot; &amp; co&lt;/b&gt;");
    }

    #[test]
    fn users_page_escapes_names() {
        let users = vec![UserAccount {
            id: 7,
            name: "<script>".to_string(),
            email: "x@y.z".to_string(),
            role: "Nurse".to_string(),
            status: UserStatus::Suspended,
            joined: None,
        }];
        let html = users_page(&layout("/admin/users", "Users", UiState::default()), &users_view(&users));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Activate"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn open_menu_is_rendered_expanded() {
        let ui = UiState { menu_open: true };
        let html = predictions_page(&layout("/user/predictions", "Predictions", ui), &PredictionsView::Empty);
        assert!(html.contains("aria-expanded=\"true\""));
        assert!(html.contains("hsEmptyState"));
    }
}
