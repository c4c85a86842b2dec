use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use actix_web::{http::StatusCode, test::TestRequest};
use chrono::Utc;
use serde_json::json;
use tbs_common::Cents;

use booking_engine::{
    db_types::EventInfo,
    traits::{BookingDatabaseError, PaymentGatewayError},
};

use crate::endpoint_tests::{
    helpers::{issue_token, send_request},
    mocks::{MockDb, MockGateway},
};

fn booking_request(token: Option<&str>) -> TestRequest {
    let mut req = TestRequest::post()
        .uri("/api/v1/bookings")
        .set_json(json!({"event_id": 1, "seat_ids": [1, 2]}));
    if let Some(token) = token {
        req = req.insert_header(("Authorization", format!("Bearer {token}")));
    }
    req
}

fn event_priced_at(cents: i64) -> EventInfo {
    EventInfo {
        id: 1,
        title: "Rustfest".to_string(),
        description: None,
        starts_at: Utc::now(),
        price: Cents::from(cents),
    }
}

#[actix_web::test]
async fn booking_without_a_token_is_unauthorized() {
    let (status, _) = send_request(booking_request(None), MockDb::new(), MockGateway::new()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn booking_with_a_forged_token_is_unauthorized() {
    let mut token = issue_token(1);
    token.replace_range(token.len() - 6..token.len() - 1, "AAAAA");
    let (status, _) = send_request(booking_request(Some(&token)), MockDb::new(), MockGateway::new()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn a_successful_booking_returns_created_with_the_id() {
    let token = issue_token(7);
    let mut db = MockDb::new();
    db.expect_create_booking()
        .times(1)
        .withf(|user_id, event_id, seat_ids| *user_id == 7 && *event_id == 1 && seat_ids.to_vec() == vec![1, 2])
        .returning(|_, _, _| Ok(1001));
    db.expect_fetch_event().times(1).returning(|_| Ok(Some(event_priced_at(2_500))));
    let mut gateway = MockGateway::new();
    gateway
        .expect_initiate_payment()
        .times(1)
        .withf(|id, amount| *id == 1001 && *amount == Cents::from(5_000))
        .returning(|_, _| Ok(()));

    let (status, body) = send_request(booking_request(Some(&token)), db, gateway).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.contains("\"booking_id\":1001"), "unexpected body: {body}");
}

#[actix_web::test]
async fn a_seat_conflict_is_a_409() {
    let token = issue_token(7);
    let mut db = MockDb::new();
    db.expect_create_booking().times(1).returning(|_, _, _| Err(BookingDatabaseError::SeatNotAvailable));

    let (status, body) = send_request(booking_request(Some(&token)), db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("not available"), "unexpected body: {body}");
}

#[actix_web::test]
async fn a_payment_failure_compensates_and_returns_409() {
    let token = issue_token(7);
    let cancelled = Arc::new(AtomicBool::new(false));
    let mut db = MockDb::new();
    db.expect_create_booking().times(1).returning(|_, _, _| Ok(1002));
    db.expect_fetch_event().times(1).returning(|_| Ok(Some(event_priced_at(2_500))));
    let flag = cancelled.clone();
    db.expect_clone().times(1).returning(move || {
        let mut compensator = MockDb::new();
        let flag = flag.clone();
        compensator.expect_cancel_booking().times(1).returning(move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });
        compensator
    });
    let mut gateway = MockGateway::new();
    gateway.expect_initiate_payment().times(1).returning(|_, _| Err(PaymentGatewayError::RejectedRequest(500)));

    let (status, _) = send_request(booking_request(Some(&token)), db, gateway).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(cancelled.load(Ordering::SeqCst), "the reservation must have been compensated");
}

#[actix_web::test]
async fn an_empty_seat_selection_is_a_bad_request() {
    let token = issue_token(7);
    let req = TestRequest::post()
        .uri("/api/v1/bookings")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(json!({"event_id": 1, "seat_ids": []}));

    let (status, _) = send_request(req, MockDb::new(), MockGateway::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
