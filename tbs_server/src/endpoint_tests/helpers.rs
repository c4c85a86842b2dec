use actix_web::{dev::Service, error::ResponseError, http::StatusCode, test, web, App};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use tbs_common::Secret;

use booking_engine::BookingFlowApi;

use crate::{
    auth::{AuthConfig, JwtClaims},
    endpoint_tests::mocks::{MockDb, MockGateway},
    helpers::calculate_webhook_signature,
    middleware::{WebhookSignatureFactory, WEBHOOK_SIGNATURE_HEADER},
    server::configure_routes,
};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";
pub const TEST_WEBHOOK_SECRET: &str = "test-webhook-secret";

pub fn issue_token(user_id: i64) -> String {
    let claims = JwtClaims { sub: user_id, exp: (Utc::now() + chrono::Duration::hours(1)).timestamp() };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()))
        .expect("token encoding cannot fail")
}

pub fn sign_body(body: &[u8]) -> String {
    calculate_webhook_signature(TEST_WEBHOOK_SECRET, body)
}

/// Builds the full app (routes, auth config, webhook signature guard) around the given mocks
/// and performs one request. Errors raised by extractors, middleware or handlers are folded
/// into the status/body pair the way the real server would render them.
pub async fn send_request(req: test::TestRequest, db: MockDb, gateway: MockGateway) -> (StatusCode, String) {
    let _ = env_logger::try_init();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(BookingFlowApi::new(db, gateway)))
            .app_data(web::Data::new(AuthConfig::new(Secret::new(TEST_JWT_SECRET.to_string()))))
            .configure(configure_routes::<MockDb, MockGateway>(WebhookSignatureFactory::new(
                WEBHOOK_SIGNATURE_HEADER,
                Secret::new(TEST_WEBHOOK_SECRET.to_string()),
                true,
            ))),
    )
    .await;
    match app.call(req.to_request()).await {
        Ok(resp) => {
            let status = resp.status();
            let body = test::read_body(resp).await;
            (status, String::from_utf8_lossy(&body).to_string())
        },
        Err(e) => {
            let status = e.as_response_error().status_code();
            (status, e.to_string())
        },
    }
}
