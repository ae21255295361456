use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{Datelike, Duration, NaiveDate};
use kennel_core::Clock;
use kennel_domain::DateRange;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/capacity/availability", get(check_availability))
        .route("/api/capacity/calendar", get(month_calendar))
        .route("/api/capacity/holds", post(create_hold))
        .route("/api/capacity/holds/{id}", delete(release_hold))
}

#[derive(Debug, Deserialize)]
struct AvailabilityQuery {
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    quantity: Option<u32>,
}

async fn check_availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    // Single-day queries omit end_date
    let end = query
        .end_date
        .unwrap_or(query.start_date + Duration::days(1));
    let range = DateRange::new(query.start_date, end)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let report = state
        .coordinator
        .check_availability(range, query.quantity.unwrap_or(1))
        .await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
struct CalendarQuery {
    month: Option<u32>,
    year: Option<i32>,
}

#[derive(Debug, Serialize)]
struct CalendarResponse {
    month: u32,
    year: i32,
    max_capacity: u32,
    calendar: Vec<kennel_capacity::CalendarDay>,
}

async fn month_calendar(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarResponse>, AppError> {
    let today = state.clock.now().date_naive();
    let month = query.month.unwrap_or(today.month());
    let year = query.year.unwrap_or(today.year());

    let calendar = state.coordinator.month_calendar(month, year).await?;
    Ok(Json(CalendarResponse {
        month,
        year,
        max_capacity: state.coordinator.max_capacity(),
        calendar,
    }))
}

#[derive(Debug, Deserialize)]
struct CreateHoldRequest {
    start_date: NaiveDate,
    end_date: NaiveDate,
    #[serde(default = "default_quantity")]
    quantity: u32,
    session_id: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Serialize)]
struct CreateHoldResponse {
    hold_id: Uuid,
    expires_at: chrono::DateTime<chrono::Utc>,
    expires_in_minutes: i64,
}

async fn create_hold(
    State(state): State<AppState>,
    Json(req): Json<CreateHoldRequest>,
) -> Result<Json<CreateHoldResponse>, AppError> {
    let range = DateRange::new(req.start_date, req.end_date)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let hold = state
        .coordinator
        .admit_hold(range, req.quantity, req.session_id)
        .await?;

    let expires_in_minutes = (hold.expires_at - state.clock.now()).num_minutes();
    Ok(Json(CreateHoldResponse {
        hold_id: hold.id,
        expires_at: hold.expires_at,
        expires_in_minutes,
    }))
}

async fn release_hold(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.coordinator.holds().release_hold(id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
