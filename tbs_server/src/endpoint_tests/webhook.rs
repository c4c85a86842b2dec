use actix_web::{http::StatusCode, test::TestRequest};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use booking_engine::traits::BookingDatabaseError;

use crate::{
    endpoint_tests::{
        helpers::{send_request, sign_body},
        mocks::{MockDb, MockGateway},
    },
    middleware::WEBHOOK_SIGNATURE_HEADER,
};

fn webhook_body(booking_id: i64, status: &str, timestamp: DateTime<Utc>) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "booking_id": booking_id,
        "status": status,
        "timestamp": timestamp.to_rfc3339(),
    }))
    .unwrap()
}

fn signed_post(body: Vec<u8>, signature: &str) -> TestRequest {
    TestRequest::post()
        .uri("/api/v1/payments/webhook")
        .insert_header((WEBHOOK_SIGNATURE_HEADER, signature))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body)
}

#[actix_web::test]
async fn confirmed_webhook_with_valid_signature_confirms_the_booking() {
    let body = webhook_body(1001, "CONFIRMED", Utc::now());
    let signature = sign_body(&body);
    let mut db = MockDb::new();
    db.expect_confirm_booking().times(1).withf(|id| *id == 1001).returning(|_| Ok(()));

    let (status, _) = send_request(signed_post(body, &signature), db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn duplicate_webhook_for_a_settled_booking_still_returns_200() {
    let body = webhook_body(1001, "CONFIRMED", Utc::now());
    let signature = sign_body(&body);
    let mut db = MockDb::new();
    db.expect_confirm_booking()
        .times(1)
        .returning(|id| Err(BookingDatabaseError::BookingCannotBeChanged(id)));

    let (status, _) = send_request(signed_post(body, &signature), db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn failed_webhook_cancels_the_booking() {
    let body = webhook_body(1001, "FAILED", Utc::now());
    let signature = sign_body(&body);
    let mut db = MockDb::new();
    db.expect_cancel_booking().times(1).withf(|id| *id == 1001).returning(|_| Ok(()));

    let (status, _) = send_request(signed_post(body, &signature), db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn a_tampered_body_is_forbidden_before_reaching_the_store() {
    let body = webhook_body(1001, "CONFIRMED", Utc::now());
    let signature = sign_body(&body);
    let mut tampered = body;
    tampered[10] ^= 0x01;

    // No expectations set: any store call would panic the test.
    let (status, _) = send_request(signed_post(tampered, &signature), MockDb::new(), MockGateway::new()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn a_tampered_signature_is_forbidden() {
    let body = webhook_body(1001, "CONFIRMED", Utc::now());
    let mut signature = sign_body(&body).into_bytes();
    signature[0] = if signature[0] == b'0' { b'1' } else { b'0' };
    let signature = String::from_utf8(signature).unwrap();

    let (status, _) = send_request(signed_post(body, &signature), MockDb::new(), MockGateway::new()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn a_missing_signature_is_forbidden() {
    let body = webhook_body(1001, "CONFIRMED", Utc::now());
    let req = TestRequest::post()
        .uri("/api/v1/payments/webhook")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body);

    let (status, _) = send_request(req, MockDb::new(), MockGateway::new()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn a_stale_timestamp_is_rejected_as_a_replay() {
    let body = webhook_body(1001, "CONFIRMED", Utc::now() - Duration::minutes(10));
    let signature = sign_body(&body);

    let (status, _) = send_request(signed_post(body, &signature), MockDb::new(), MockGateway::new()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn a_correctly_signed_garbage_body_is_a_bad_request() {
    let body = b"this is not json".to_vec();
    let signature = sign_body(&body);

    let (status, _) = send_request(signed_post(body, &signature), MockDb::new(), MockGateway::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn an_unknown_payment_status_is_a_bad_request() {
    let body = webhook_body(1001, "REFUNDED", Utc::now());
    let signature = sign_body(&body);

    let (status, _) = send_request(signed_post(body, &signature), MockDb::new(), MockGateway::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn a_store_outage_maps_to_service_unavailable() {
    let body = webhook_body(1001, "CONFIRMED", Utc::now());
    let signature = sign_body(&body);
    let mut db = MockDb::new();
    db.expect_confirm_booking()
        .times(1)
        .returning(|_| Err(BookingDatabaseError::DatabaseError("pool timed out".to_string())));

    let (status, _) = send_request(signed_post(body, &signature), db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
