//! Request handler definitions.
//!
//! Handlers stay generic over the engine's trait seams so the endpoint tests can drive them
//! against mocks; [`crate::server`] instantiates them with the Postgres store and the HTTP
//! payment gateway.

use std::time::Duration;

use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use log::*;

use booking_engine::{
    booking_objects::Pagination,
    traits::{BookingDatabase, EventCatalog, PaymentGateway},
    BookingFlowApi, BookingFlowError,
};

use crate::{
    auth::JwtClaims,
    data_objects::{CreateBookingRequest, CreateBookingResponse, PaymentWebhookPayload},
    errors::ServerError,
};

/// Webhook bodies older than this are treated as replays.
const WEBHOOK_FRESHNESS_WINDOW_SECS: i64 = 300;
/// Budget for dispatching a webhook verdict into the store.
const WEBHOOK_DISPATCH_BUDGET: Duration = Duration::from_secs(60);

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

/// `GET /api/v1/events`: one page of the event catalog.
pub async fn list_events<B, G>(
    query: web::Query<Pagination>,
    api: web::Data<BookingFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: BookingDatabase,
    G: PaymentGateway,
{
    let pagination = query.into_inner();
    trace!("💻️ GET events, page {} of size {}", pagination.page_number(), pagination.page_size());
    let page = api.db().list_events(pagination).await.map_err(|e| ServerError::Unavailable(e.to_string()))?;
    Ok(HttpResponse::Ok().json(page))
}

/// `GET /api/v1/events/{event_id}/seats`: the event-scoped seat ids (and their statuses)
/// that clients pick from when building a reservation request.
pub async fn seats_for_event<B, G>(
    path: web::Path<i64>,
    api: web::Data<BookingFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: BookingDatabase,
    G: PaymentGateway,
{
    let event_id = path.into_inner();
    trace!("💻️ GET seats for event {event_id}");
    let seats =
        api.db().seats_for_event(event_id).await.map_err(|e| ServerError::Unavailable(e.to_string()))?;
    Ok(HttpResponse::Ok().json(seats))
}

/// `POST /api/v1/bookings`: the saga entry point. Requires a bearer token; the user id comes
/// from its claims, never from the body.
pub async fn create_booking<B, G>(
    claims: JwtClaims,
    body: web::Json<CreateBookingRequest>,
    api: web::Data<BookingFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: BookingDatabase,
    G: PaymentGateway,
{
    let user_id = claims.user_id();
    let request = body.into_inner();
    debug!(
        "💻️ User {user_id} requests {} seats on event {}",
        request.seat_ids.len(),
        request.event_id
    );
    let booking_id = api.create_booking(user_id, request.event_id, &request.seat_ids).await?;
    info!("💻️ Booking {booking_id} created for user {user_id}");
    Ok(HttpResponse::Created().json(CreateBookingResponse { booking_id }))
}

/// `POST /api/v1/payments/webhook`: payment provider callback.
///
/// The HMAC middleware has already authenticated the raw body by the time this runs. What is
/// left here: parse, reject stale timestamps as replays, and hand the verdict to the saga
/// with a bounded budget.
pub async fn payment_webhook<B, G>(
    body: web::Bytes,
    api: web::Data<BookingFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: BookingDatabase,
    G: PaymentGateway,
{
    let payload: PaymentWebhookPayload = serde_json::from_slice(body.as_ref()).map_err(|e| {
        warn!("💻️ Could not deserialize webhook payload: {e}");
        ServerError::CouldNotDeserializePayload
    })?;
    let age = Utc::now().signed_duration_since(payload.timestamp);
    if age.num_seconds() > WEBHOOK_FRESHNESS_WINDOW_SECS {
        warn!(
            "💻️ Webhook for booking {} is {} seconds old. Rejecting as a replay",
            payload.booking_id,
            age.num_seconds()
        );
        return Err(ServerError::StaleWebhook);
    }

    debug!("💻️ Payment webhook for booking {}: {}", payload.booking_id, payload.status);
    let dispatch = api.handle_payment_webhook(payload.booking_id, &payload.status);
    match tokio::time::timeout(WEBHOOK_DISPATCH_BUDGET, dispatch).await {
        Err(_) => Err(ServerError::Unavailable("the booking store did not answer in time".to_string())),
        Ok(Err(BookingFlowError::InvalidPaymentStatus(status))) => Err(ServerError::InvalidWebhookPayload(status)),
        Ok(Err(e)) => Err(ServerError::Unavailable(e.to_string())),
        Ok(Ok(())) => Ok(HttpResponse::Ok().finish()),
    }
}
