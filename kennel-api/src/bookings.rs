use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use kennel_core::{Clock, ReservationStore};
use kennel_domain::{lifecycle, Booking, BookingStatus, CancelledBy, DateRange, RefundRecord};
use kennel_reservation::NewBooking;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::require_admin_key;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/api/bookings/confirm", post(confirm_booking))
        .route("/api/bookings/reject", post(reject_booking))
        .route("/api/bookings/complete", post(complete_booking))
        .route_layer(middleware::from_fn_with_state(state, require_admin_key));

    Router::new()
        .route("/api/bookings", post(create_booking))
        .route("/api/bookings/policy", get(cancellation_policy))
        .route("/api/bookings/cancel", post(cancel_booking))
        .route("/api/bookings/by-email/{email}", get(bookings_by_email))
        .route("/api/bookings/{id}", get(booking_by_id))
        .merge(admin)
}

/// Customer-facing projection; never leaks payment references.
#[derive(Debug, Serialize)]
struct SafeBooking {
    id: Uuid,
    status: BookingStatus,
    start_date: NaiveDate,
    end_date: NaiveDate,
    pet_name: String,
    pet_type: String,
    quantity: u32,
    total_price_cents: i64,
    currency: String,
    refund: Option<RefundRecord>,
    created_at: DateTime<Utc>,
}

impl From<&Booking> for SafeBooking {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            status: booking.status,
            start_date: booking.range.start,
            end_date: booking.range.end,
            pet_name: booking.pet_name.clone(),
            pet_type: booking.pet_type.clone(),
            quantity: booking.quantity,
            total_price_cents: booking.total_price_cents,
            currency: booking.currency.clone(),
            refund: booking.refund.clone(),
            created_at: booking.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateBookingRequest {
    email: String,
    pet_name: String,
    pet_type: String,
    #[serde(default = "default_quantity")]
    quantity: u32,
    start_date: NaiveDate,
    end_date: NaiveDate,
    total_price_cents: i64,
    customer_ref: Option<String>,
    method_ref: Option<String>,
    hold_id: Option<Uuid>,
}

fn default_quantity() -> u32 {
    1
}

async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let range = DateRange::new(req.start_date, req.end_date)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let booking = state
        .bookings
        .intake(NewBooking {
            email: req.email,
            pet_name: req.pet_name,
            pet_type: req.pet_type,
            quantity: req.quantity,
            range,
            total_price_cents: req.total_price_cents,
            customer_ref: req.customer_ref,
            method_ref: req.method_ref,
            hold_id: req.hold_id,
        })
        .await?;

    Ok(Json(serde_json::json!({
        "booking": SafeBooking::from(&booking),
    })))
}

#[derive(Debug, Deserialize)]
struct BookingQuery {
    email: Option<String>,
}

async fn booking_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<BookingQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let booking = state
        .store
        .get_booking(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Booking not found".to_string()))?;

    // Basic ownership check when an email is supplied
    if let Some(email) = &query.email {
        if !booking.email.eq_ignore_ascii_case(email) {
            return Err(AppError::AuthenticationError(
                "You do not have access to this booking".to_string(),
            ));
        }
    }

    // Hand out a cancellation capability only while cancelling is legal
    let cancellation_token =
        if lifecycle::can_transition(booking.status, BookingStatus::Cancelled) {
            Some(
                state
                    .tokens
                    .issue(booking.id, &booking.email, state.clock.now())
                    .map_err(|e| AppError::Anyhow(e.into()))?,
            )
        } else {
            None
        };

    Ok(Json(serde_json::json!({
        "booking": SafeBooking::from(&booking),
        "cancellation_token": cancellation_token,
    })))
}

async fn bookings_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let bookings = state.store.bookings_by_email(&email).await?;
    let safe: Vec<SafeBooking> = bookings.iter().map(SafeBooking::from).collect();
    Ok(Json(serde_json::json!({ "bookings": safe })))
}

async fn cancellation_policy(State(state): State<AppState>) -> Json<serde_json::Value> {
    let policy = &state.policy;
    Json(serde_json::json!({
        "policy": policy,
        "description": {
            "full": format!(
                "Full refund when cancelling {} days before arrival",
                policy.free_cancellation_days
            ),
            "partial": format!(
                "{}% refund when cancelling later",
                policy.partial_refund_percentage
            ),
            "none": format!(
                "No refund when cancelling less than {} hours before arrival",
                policy.no_refund_hours
            ),
        },
    }))
}

#[derive(Debug, Deserialize)]
struct BookingActionRequest {
    booking_id: Uuid,
    reason: Option<String>,
}

async fn confirm_booking(
    State(state): State<AppState>,
    Json(req): Json<BookingActionRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let booking = state.bookings.confirm(req.booking_id).await?;
    let cancellation_token = state
        .tokens
        .issue(booking.id, &booking.email, state.clock.now())
        .map_err(|e| AppError::Anyhow(e.into()))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "payment_ref": booking.payment.intent_ref,
        "cancellation_token": cancellation_token,
    })))
}

async fn reject_booking(
    State(state): State<AppState>,
    Json(req): Json<BookingActionRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.bookings.reject(req.booking_id, req.reason).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn complete_booking(
    State(state): State<AppState>,
    Json(req): Json<BookingActionRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.bookings.complete(req.booking_id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
struct CancelBookingRequest {
    booking_id: Uuid,
    token: String,
}

async fn cancel_booking(
    State(state): State<AppState>,
    Json(req): Json<CancelBookingRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let claims = state.tokens.verify(&req.token)?;
    if claims.booking_id != req.booking_id {
        return Err(AppError::AuthenticationError(
            "Token does not match this booking".to_string(),
        ));
    }

    // The token binds both the booking and the holder's email
    let stored = state
        .store
        .get_booking(req.booking_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Booking not found".to_string()))?;
    if !stored.email.eq_ignore_ascii_case(&claims.email) {
        return Err(AppError::AuthenticationError(
            "Token does not match this booking".to_string(),
        ));
    }

    let booking = state
        .bookings
        .cancel(req.booking_id, CancelledBy::Customer)
        .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "refund": booking.refund,
    })))
}
