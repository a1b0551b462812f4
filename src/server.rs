use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use actix_web::http::header;
use actix_web::{middleware, web, App, HttpRequest, HttpResponse, HttpServer};
use chrono::{Local, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::AppError;
use crate::export::{export_filename, rows_to_csv, ExportError};
use crate::model::{PredictionRecord, SyntheticScorer, VisitForm, VisitInput};
use crate::pages;
use crate::repository::RecordRepository;
use crate::session::{self, check_access, Access, Area, LoginForm, RegistrationForm, LANDING_PATH};
use crate::views::{self, ResultFilter, Toast, UiState, UserNotice};

/// Artificial delays applied before predict, login and register complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub predict: Duration,
    pub login: Duration,
    pub register: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            predict: Duration::from_millis(1500),
            login: Duration::from_millis(1000),
            register: Duration::from_millis(800),
        }
    }
}

impl Timing {
    pub fn immediate() -> Self {
        Self {
            predict: Duration::ZERO,
            login: Duration::ZERO,
            register: Duration::ZERO,
        }
    }
}

pub struct AppState {
    pub repo: RecordRepository,
    pub scorer: SyntheticScorer,
    pub timing: Timing,
    predict_in_flight: AtomicBool,
}

impl AppState {
    pub fn new(repo: RecordRepository, timing: Timing) -> Self {
        Self {
            repo,
            scorer: SyntheticScorer::new(),
            timing,
            predict_in_flight: AtomicBool::new(false),
        }
    }

    /// Waits out the simulated latency, scores and persists. Only one
    /// prediction may be pending at a time.
    pub async fn run_prediction(&self, input: VisitInput) -> Result<PredictionRecord, AppError> {
        let _pending = PendingPrediction::acquire(&self.predict_in_flight)?;
        tokio::time::sleep(self.timing.predict).await;

        let record = self.scorer.record(input, &mut rand::thread_rng(), Utc::now());
        self.repo.record_prediction(&record)?;
        Ok(record)
    }
}

struct PendingPrediction<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PendingPrediction<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, AppError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::PredictionPending)?;
        Ok(Self { flag })
    }
}

impl Drop for PendingPrediction<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    menu: Option<String>,
    saved: Option<String>,
    from: Option<String>,
    notice: Option<String>,
}

impl PageQuery {
    fn ui(&self) -> UiState {
        UiState {
            menu_open: self.menu.as_deref() == Some("open"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PredictionsQuery {
    menu: Option<String>,
    search: Option<String>,
    filter: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPredictRequest {
    age: Option<u32>,
    gender: Option<String>,
    sms_received: Option<bool>,
    appointment_day: Option<String>,
}

impl ApiPredictRequest {
    fn into_input(self, today: NaiveDate) -> VisitInput {
        let mut input = VisitInput::with_defaults(today);
        if let Some(age) = self.age {
            input.age = age;
        }
        if let Some(gender) = self.gender.filter(|g| !g.trim().is_empty()) {
            input.gender = gender;
        }
        if let Some(sms) = self.sms_received {
            input.sms_received = sms;
        }
        if let Some(day) = self.appointment_day.filter(|d| !d.trim().is_empty()) {
            input.appointment_day = day;
        }
        input
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok().content_type("text/html; charset=utf-8").body(body)
}

fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn guard(state: &AppState, req: &HttpRequest) -> Option<HttpResponse> {
    match check_access(state.repo.role(), Area::from_path(req.path())) {
        Access::Allow => None,
        Access::Redirect(to) => {
            debug!(from = req.path(), to, "session guard redirect");
            Some(see_other(to))
        }
    }
}

async fn landing() -> HttpResponse {
    html(pages::landing_page())
}

async fn login_form() -> HttpResponse {
    html(pages::login_page(&views::login_view(None, "")))
}

async fn login(state: web::Data<AppState>, form: web::Form<LoginForm>) -> Result<HttpResponse, AppError> {
    let (role, email) = match form.validate() {
        Ok(ok) => ok,
        Err(err) => {
            let page = pages::login_page(&views::login_view(Some(err.to_string()), &form.email));
            return Ok(HttpResponse::BadRequest().content_type("text/html; charset=utf-8").body(page));
        }
    };

    tokio::time::sleep(state.timing.login).await;
    let home = session::login(&state.repo, role, &email)?;
    info!(role = role.as_str(), "logged in");
    Ok(see_other(home))
}

async fn register_form() -> HttpResponse {
    html(pages::register_page(None))
}

async fn register(
    state: web::Data<AppState>,
    form: web::Form<RegistrationForm>,
) -> Result<HttpResponse, AppError> {
    let account = match session::check_registration(&state.repo, &form) {
        Ok(account) => account,
        Err(err) if err.is_validation() => return Ok(register_rejected(&err)),
        Err(err) => return Err(err.into()),
    };

    tokio::time::sleep(state.timing.register).await;
    match session::complete_registration(&state.repo, &account, Utc::now()) {
        Ok((_, home)) => Ok(see_other(home)),
        Err(err) if err.is_validation() => Ok(register_rejected(&err)),
        Err(err) => Err(err.into()),
    }
}

fn register_rejected(err: &session::AuthError) -> HttpResponse {
    HttpResponse::BadRequest()
        .content_type("text/html; charset=utf-8")
        .body(pages::register_page(Some(&err.to_string())))
}

async fn logout(state: web::Data<AppState>) -> HttpResponse {
    let to = session::logout(&state.repo);
    info!("logged out");
    see_other(to)
}

async fn user_dashboard(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<PageQuery>,
) -> HttpResponse {
    if let Some(redirect) = guard(&state, &req) {
        return redirect;
    }
    let view = match state.repo.load_last() {
        Some(record) => views::dashboard_view(&record, false),
        None => {
            let synthesized = state.scorer.record(
                VisitInput::with_defaults(today()),
                &mut rand::thread_rng(),
                Utc::now(),
            );
            views::dashboard_view(&synthesized, true)
        }
    };
    html(pages::dashboard_page(&views::layout(req.path(), "Dashboard", query.ui()), &view))
}

async fn user_input(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<PageQuery>,
) -> HttpResponse {
    if let Some(redirect) = guard(&state, &req) {
        return redirect;
    }
    let view = views::input_view(today(), query.saved.is_some());
    html(pages::input_page(&views::layout(req.path(), "Input", query.ui()), &view))
}

async fn user_predictions(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<PageQuery>,
) -> HttpResponse {
    if let Some(redirect) = guard(&state, &req) {
        return redirect;
    }
    let record = state.repo.load_last();
    let view = views::predictions_view(record.as_ref());
    html(pages::predictions_page(&views::layout(req.path(), "Predictions", query.ui()), &view))
}

async fn user_charts(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<PageQuery>,
) -> HttpResponse {
    if let Some(redirect) = guard(&state, &req) {
        return redirect;
    }
    let record = state.repo.load_last();
    let view = views::charts_view(record.as_ref(), &mut rand::thread_rng());
    html(pages::charts_page(&views::layout(req.path(), "Charts", query.ui()), &view))
}

async fn user_predict(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<PageQuery>,
    form: web::Form<VisitForm>,
) -> Result<HttpResponse, AppError> {
    if let Some(redirect) = guard(&state, &req) {
        return Ok(redirect);
    }
    let input = form.into_inner().into_input(today());
    state.run_prediction(input).await?;

    match query.from.as_deref() {
        Some("dashboard") => Ok(see_other(session::USER_HOME_PATH)),
        _ => Ok(see_other("/user/input?saved=1")),
    }
}

async fn api_predict(
    state: web::Data<AppState>,
    body: web::Json<ApiPredictRequest>,
) -> Result<HttpResponse, AppError> {
    let record = state.run_prediction(body.into_inner().into_input(today())).await?;
    Ok(HttpResponse::Ok().json(record))
}

async fn api_last_prediction(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.repo.load_last())
}

async fn api_all_predictions(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.repo.load_all())
}

async fn admin_dashboard(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<PageQuery>,
) -> HttpResponse {
    if let Some(redirect) = guard(&state, &req) {
        return redirect;
    }
    let records = state.repo.load_all();
    let view = views::admin_dashboard_view(&records, today());
    html(pages::admin_dashboard_page(&views::layout(req.path(), "Admin Dashboard", query.ui()), &view))
}

async fn admin_export(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    if let Some(redirect) = guard(&state, &req) {
        return Ok(redirect);
    }
    let records = state.repo.load_all();
    let today = today();
    let csv = match rows_to_csv(&views::export_rows(&records, today)) {
        Ok(csv) => csv,
        Err(ExportError::Empty) => {
            let mut view = views::admin_dashboard_view(&records, today);
            view.toast = Some(Toast::error(ExportError::Empty.to_string()));
            let layout = views::layout("/admin/dashboard", "Admin Dashboard", UiState::default());
            return Ok(html(pages::admin_dashboard_page(&layout, &view)));
        }
        Err(err) => return Err(err.into()),
    };

    let filename = export_filename(today);
    info!(rows = records.len(), %filename, "CSV exported successfully");
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(csv))
}

fn users_redirect(notice: UserNotice) -> HttpResponse {
    see_other(&format!("/admin/users?notice={}", notice.as_str()))
}

async fn admin_users(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    if let Some(redirect) = guard(&state, &req) {
        return Ok(redirect);
    }
    let users = state.repo.load_users_seeded()?;
    let mut view = views::users_view(&users);
    view.toast = query.notice.as_deref().and_then(UserNotice::parse).map(UserNotice::toast);
    Ok(html(pages::users_page(&views::layout(req.path(), "Users", query.ui()), &view)))
}

async fn admin_toggle_user(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    if let Some(redirect) = guard(&state, &req) {
        return Ok(redirect);
    }
    let id = path.into_inner();
    let user = state
        .repo
        .toggle_user_status(id)?
        .ok_or(AppError::UserNotFound(id))?;
    info!(id, status = user.status.label(), "user status changed");
    Ok(users_redirect(UserNotice::after_toggle(&user)))
}

async fn admin_confirm_delete(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    if let Some(redirect) = guard(&state, &req) {
        return Ok(redirect);
    }
    let id = path.into_inner();
    let users = state.repo.load_users();
    let user = users
        .iter()
        .find(|u| u.id == id)
        .ok_or(AppError::UserNotFound(id))?;
    let mut view = views::users_view(&users);
    view.modal = Some(views::delete_modal(user));
    let layout = views::layout("/admin/users", "Users", UiState::default());
    Ok(html(pages::users_page(&layout, &view)))
}

async fn admin_delete_user(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    if let Some(redirect) = guard(&state, &req) {
        return Ok(redirect);
    }
    let id = path.into_inner();
    state.repo.delete_user(id)?.ok_or(AppError::UserNotFound(id))?;
    info!(id, "user deleted");
    Ok(users_redirect(UserNotice::Deleted))
}

async fn admin_predictions(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<PredictionsQuery>,
) -> HttpResponse {
    if let Some(redirect) = guard(&state, &req) {
        return redirect;
    }
    let records = state.repo.load_all();
    let filter = query.filter.as_deref().map(ResultFilter::parse).unwrap_or_default();
    let search = query.search.as_deref().unwrap_or("");
    let view = views::admin_predictions_view(&records, search, filter, today());
    let ui = UiState {
        menu_open: query.menu.as_deref() == Some("open"),
    };
    html(pages::admin_predictions_page(&views::layout(req.path(), "Predictions", ui), &view))
}

async fn admin_analytics(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<PageQuery>,
) -> HttpResponse {
    if let Some(redirect) = guard(&state, &req) {
        return redirect;
    }
    let view = views::analytics_view(&state.repo.load_all());
    html(pages::analytics_page(&views::layout(req.path(), "Analytics", query.ui()), &view))
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("Health Sphere is running!")
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(landing))
        .route(LANDING_PATH, web::get().to(landing))
        .route("/login", web::get().to(login_form))
        .route("/login", web::post().to(login))
        .route("/register", web::get().to(register_form))
        .route("/register", web::post().to(register))
        .route("/logout", web::post().to(logout))
        .route("/logout", web::get().to(logout))
        .route("/user/index", web::get().to(user_dashboard))
        .route("/user/input", web::get().to(user_input))
        .route("/user/predictions", web::get().to(user_predictions))
        .route("/user/charts", web::get().to(user_charts))
        .route("/user/predict", web::post().to(user_predict))
        .route("/api/predict", web::post().to(api_predict))
        .route("/api/predictions/last", web::get().to(api_last_prediction))
        .route("/api/predictions", web::get().to(api_all_predictions))
        .route("/admin/dashboard", web::get().to(admin_dashboard))
        .route("/admin/export.csv", web::get().to(admin_export))
        .route("/admin/users", web::get().to(admin_users))
        .route("/admin/users/{id}/toggle", web::post().to(admin_toggle_user))
        .route("/admin/users/{id}/delete", web::get().to(admin_confirm_delete))
        .route("/admin/users/{id}/delete", web::post().to(admin_delete_user))
        .route("/admin/predictions", web::get().to(admin_predictions))
        .route("/admin/analytics", web::get().to(admin_analytics))
        .route("/health", web::get().to(health_check));
}

pub async fn start_api(state: AppState, host: &str, port: u16) -> std::io::Result<()> {
    let data = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(data.clone())
            .configure(configure)
    })
    .bind((host, port))?
    .run()
    .await
}
