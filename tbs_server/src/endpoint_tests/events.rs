use actix_web::{http::StatusCode, test::TestRequest};
use chrono::Utc;
use tbs_common::Cents;

use booking_engine::{
    booking_objects::EventList,
    db_types::{EventInfo, Seat, SeatStatus},
};

use crate::endpoint_tests::{
    helpers::send_request,
    mocks::{MockDb, MockGateway},
};

fn one_page() -> EventList {
    EventList {
        events: vec![EventInfo {
            id: 1,
            title: "Rustfest".to_string(),
            description: Some("Three days of systems programming".to_string()),
            starts_at: Utc::now(),
            price: Cents::from(9_900),
        }],
        total_count: 1,
        page_number: 1,
        page_size: 10,
    }
}

#[actix_web::test]
async fn listing_events_needs_no_authentication() {
    let mut db = MockDb::new();
    db.expect_list_events().times(1).returning(|_| Ok(one_page()));

    let req = TestRequest::get().uri("/api/v1/events");
    let (status, body) = send_request(req, db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Rustfest"), "unexpected body: {body}");
    assert!(body.contains("\"total_count\":1"), "unexpected body: {body}");
}

#[actix_web::test]
async fn pagination_parameters_reach_the_catalog() {
    let mut db = MockDb::new();
    db.expect_list_events()
        .times(1)
        .withf(|p| p.page_number() == 3 && p.page_size() == 25)
        .returning(|_| Ok(one_page()));

    let req = TestRequest::get().uri("/api/v1/events?page_number=3&page_size=25");
    let (status, _) = send_request(req, db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn event_seats_are_listed_with_their_statuses() {
    let mut db = MockDb::new();
    db.expect_seats_for_event().times(1).withf(|event_id| *event_id == 1).returning(|_| {
        Ok(vec![
            Seat { id: 1, event_id: 1, status: SeatStatus::Available },
            Seat { id: 2, event_id: 1, status: SeatStatus::Reserved },
        ])
    });

    let req = TestRequest::get().uri("/api/v1/events/1/seats");
    let (status, body) = send_request(req, db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"AVAILABLE\""), "unexpected body: {body}");
    assert!(body.contains("\"RESERVED\""), "unexpected body: {body}");
}

#[actix_web::test]
async fn an_oversized_page_request_is_clamped() {
    let mut db = MockDb::new();
    db.expect_list_events()
        .times(1)
        .withf(|p| p.page_number() == 1 && p.page_size() == 100)
        .returning(|_| Ok(one_page()));

    let req = TestRequest::get().uri("/api/v1/events?page_size=100000");
    let (status, _) = send_request(req, db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
}
