use async_trait::async_trait;
use mockall::mock;
use tbs_common::Cents;

use booking_engine::{
    booking_objects::{EventList, Pagination},
    db_types::{Booking, EventInfo, Seat},
    traits::{
        BookingDatabase, BookingDatabaseError, CatalogError, EventCatalog, PaymentGateway, PaymentGatewayError,
    },
};

mock! {
    pub Db {}

    impl Clone for Db {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl EventCatalog for Db {
        async fn list_events(&self, pagination: Pagination) -> Result<EventList, CatalogError>;
        async fn fetch_event(&self, event_id: i64) -> Result<Option<EventInfo>, CatalogError>;
        async fn seats_for_event(&self, event_id: i64) -> Result<Vec<Seat>, CatalogError>;
    }

    #[async_trait]
    impl BookingDatabase for Db {
        fn url(&self) -> &str;
        async fn create_booking(&self, user_id: i64, event_id: i64, seat_ids: &[i64]) -> Result<i64, BookingDatabaseError>;
        async fn confirm_booking(&self, booking_id: i64) -> Result<(), BookingDatabaseError>;
        async fn cancel_booking(&self, booking_id: i64) -> Result<(), BookingDatabaseError>;
        async fn expire_booking(&self, booking_id: i64) -> Result<(), BookingDatabaseError>;
        async fn fetch_booking(&self, booking_id: i64) -> Result<Option<Booking>, BookingDatabaseError>;
        async fn seats_for_booking(&self, booking_id: i64) -> Result<Vec<Seat>, BookingDatabaseError>;
    }
}

mock! {
    pub Gateway {}

    impl Clone for Gateway {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl PaymentGateway for Gateway {
        async fn initiate_payment(&self, booking_id: i64, amount: Cents) -> Result<(), PaymentGatewayError>;
    }
}
