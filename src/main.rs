// src/main.rs

use anyhow::{Context, Result};
use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::{env, net::SocketAddr, sync::Arc};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

mod aggregate;
mod model;
mod policy;
mod store;
mod validation;
mod workflow;

mod api_tests;

use model::{Principal, Role};
use store::Store;
use validation::{ReviewPayload, TimeOffPayload, TimesheetPayload};
use workflow::{ListParams, WorkflowError, WorkflowService};

// --- Error mapping ---

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Access denied. Please login.")]
    Unauthorized,
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Request failed: {:?}", self);
        let (status, body) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": self.to_string() }),
            ),
            AppError::Workflow(err) => {
                let status = match err {
                    WorkflowError::Validation(_)
                    | WorkflowError::InvalidState { .. }
                    | WorkflowError::InvalidAction
                    | WorkflowError::EmptyPayload => StatusCode::BAD_REQUEST,
                    WorkflowError::Conflict => StatusCode::CONFLICT,
                    WorkflowError::AccessDenied => StatusCode::FORBIDDEN,
                    WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
                };
                let body = match err {
                    WorkflowError::Validation(fields) => json!({ "errors": fields }),
                    _ => json!({ "message": err.to_string() }),
                };
                (status, body)
            }
        };
        (status, Json(body)).into_response()
    }
}

// --- Principal extraction ---
//
// The upstream session layer authenticates the caller and forwards the
// resolved identity in headers; credentials never reach this service.

const HEADER_EMPLOYEE_ID: &str = "x-employee-id";
const HEADER_ROLE: &str = "x-role";
const HEADER_DEPARTMENT: &str = "x-department";

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let employee_id = header(HEADER_EMPLOYEE_ID)
            .filter(|id| !id.is_empty())
            .ok_or(AppError::Unauthorized)?;
        let role = header(HEADER_ROLE)
            .as_deref()
            .and_then(Role::parse)
            .ok_or(AppError::Unauthorized)?;

        Ok(Principal {
            employee_id,
            role,
            department: header(HEADER_DEPARTMENT),
        })
    }
}

// --- Handlers ---

#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<u64>,
    limit: Option<u64>,
    status: Option<String>,
}

impl ListQuery {
    fn params(&self) -> ListParams {
        ListParams {
            page: self.page,
            limit: self.limit,
        }
    }
}

async fn create_or_update_timesheet(
    State(service): State<WorkflowService>,
    principal: Principal,
    Json(payload): Json<TimesheetPayload>,
) -> Result<Response, AppError> {
    let (timesheet, created) = service.upsert_timesheet(&principal, &payload)?;
    let (status, message) = if created {
        (StatusCode::CREATED, "Timesheet created successfully")
    } else {
        (StatusCode::OK, "Timesheet updated successfully")
    };
    Ok((
        status,
        Json(json!({ "message": message, "timesheet": timesheet })),
    )
        .into_response())
}

async fn list_my_timesheets(
    State(service): State<WorkflowService>,
    principal: Principal,
    Query(query): Query<ListQuery>,
) -> Result<Response, AppError> {
    let page = service.list_my_timesheets(&principal, query.params(), query.status.as_deref())?;
    Ok(Json(page).into_response())
}

async fn list_pending_timesheets(
    State(service): State<WorkflowService>,
    principal: Principal,
    Query(query): Query<ListQuery>,
) -> Result<Response, AppError> {
    let page = service.list_pending_timesheets(&principal, query.params())?;
    Ok(Json(page).into_response())
}

async fn get_timesheet(
    State(service): State<WorkflowService>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let timesheet = service.get_timesheet(&principal, &id)?;
    Ok(Json(json!({ "timesheet": timesheet })).into_response())
}

async fn submit_timesheet(
    State(service): State<WorkflowService>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let timesheet = service.submit_timesheet(&principal, &id)?;
    Ok(Json(json!({
        "message": "Timesheet submitted successfully",
        "timesheet": timesheet
    }))
    .into_response())
}

async fn review_timesheet(
    State(service): State<WorkflowService>,
    principal: Principal,
    Path(id): Path<String>,
    Json(payload): Json<ReviewPayload>,
) -> Result<Response, AppError> {
    let timesheet = service.review_timesheet(&principal, &id, &payload)?;
    Ok(Json(json!({
        "message": format!("Timesheet {}d successfully", payload.action),
        "timesheet": timesheet
    }))
    .into_response())
}

async fn create_time_off(
    State(service): State<WorkflowService>,
    principal: Principal,
    Json(payload): Json<TimeOffPayload>,
) -> Result<Response, AppError> {
    let request = service.create_time_off(&principal, &payload)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Time off request created successfully",
            "request": request
        })),
    )
        .into_response())
}

async fn list_my_time_off(
    State(service): State<WorkflowService>,
    principal: Principal,
    Query(query): Query<ListQuery>,
) -> Result<Response, AppError> {
    let page = service.list_my_time_off(&principal, query.params(), query.status.as_deref())?;
    Ok(Json(page).into_response())
}

async fn list_pending_time_off(
    State(service): State<WorkflowService>,
    principal: Principal,
    Query(query): Query<ListQuery>,
) -> Result<Response, AppError> {
    let page = service.list_pending_time_off(&principal, query.params())?;
    Ok(Json(page).into_response())
}

async fn get_time_off(
    State(service): State<WorkflowService>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let request = service.get_time_off(&principal, &id)?;
    Ok(Json(json!({ "request": request })).into_response())
}

async fn review_time_off(
    State(service): State<WorkflowService>,
    principal: Principal,
    Path(id): Path<String>,
    Json(payload): Json<ReviewPayload>,
) -> Result<Response, AppError> {
    let request = service.review_time_off(&principal, &id, &payload)?;
    Ok(Json(json!({
        "message": format!("Time off request {}d successfully", payload.action),
        "request": request
    }))
    .into_response())
}

async fn handle_status() -> Response {
    Json(json!({
        "status": "ok",
        "time": chrono::Local::now().to_rfc3339()
    }))
    .into_response()
}

// --- Wiring ---

pub fn app(service: WorkflowService) -> Router {
    let timesheet_routes = Router::new()
        .route("/", post(create_or_update_timesheet).get(list_my_timesheets))
        .route("/pending", get(list_pending_timesheets))
        .route("/{id}", get(get_timesheet))
        .route("/{id}/submit", post(submit_timesheet))
        .route("/{id}/review", post(review_timesheet));

    let time_off_routes = Router::new()
        .route("/", post(create_time_off).get(list_my_time_off))
        .route("/pending", get(list_pending_time_off))
        .route("/{id}", get(get_time_off))
        .route("/{id}/review", post(review_time_off));

    let api_routes = Router::new()
        .nest("/timesheets", timesheet_routes)
        .nest("/time-off", time_off_routes);

    Router::new()
        .nest("/api", api_routes)
        .route("/status", get(handle_status))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

#[derive(Debug, Clone)]
struct AppConfig {
    bind_addr: SocketAddr,
}

fn load_app_config() -> Result<AppConfig> {
    let bind_addr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
        .parse()
        .context("Invalid BIND_ADDR")?;
    Ok(AppConfig { bind_addr })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Setting tracing subscriber failed")?;
    info!("Tracing subscriber initialized.");

    let config = load_app_config()?;
    let service = WorkflowService::new(Arc::new(Store::new()));
    let app = app(service);

    info!("Starting server on http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .context("Failed to bind listen address")?;
    axum::serve(listener, app).await.context("Server failed")?;

    Ok(())
}
