use std::{fmt::Debug, time::Duration};

use log::*;

use crate::{
    booking_flow::BookingFlowError,
    booking_objects::PaymentOutcome,
    traits::{BookingDatabase, BookingDatabaseError, EventCatalog, PaymentGateway},
};

/// How long a compensation is allowed to run once the payment request has failed.
const COMPENSATION_BUDGET: Duration = Duration::from_secs(60);

/// `BookingFlowApi` sequences the booking saga: reserve seats, request payment, and settle
/// the booking when the payment outcome arrives (webhook) or fails to arrive (expiration).
///
/// The API owns no state of its own. All serialization happens in the store's status-guarded
/// updates, which is what makes every entry point here safe to call more than once.
pub struct BookingFlowApi<B, G> {
    db: B,
    gateway: G,
}

impl<B: Clone, G: Clone> Clone for BookingFlowApi<B, G> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), gateway: self.gateway.clone() }
    }
}

impl<B, G> Debug for BookingFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BookingFlowApi")
    }
}

impl<B, G> BookingFlowApi<B, G> {
    pub fn new(db: B, gateway: G) -> Self {
        Self { db, gateway }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, G> BookingFlowApi<B, G>
where
    B: BookingDatabase,
    G: PaymentGateway,
{
    /// Reserve the seats, create the PENDING booking and ask the provider to start the
    /// payment.
    ///
    /// On success the booking is returned still PENDING; it will be settled by the webhook or
    /// by the expiration consumer, whichever fires first. If the payment request fails, the
    /// reservation is compensated (booking cancelled, seats released) before the error
    /// reaches the caller, and the compensation runs on a detached task so that a client
    /// hanging up cannot interrupt it.
    pub async fn create_booking(
        &self,
        user_id: i64,
        event_id: i64,
        seat_ids: &[i64],
    ) -> Result<i64, BookingFlowError> {
        if seat_ids.is_empty() {
            return Err(BookingFlowError::EmptySeatSelection);
        }
        let booking_id = self.db.create_booking(user_id, event_id, seat_ids).await?;
        debug!("🔄️ Booking {booking_id} reserved; requesting payment");

        let amount = self.amount_for(event_id, seat_ids.len()).await?;
        if let Err(e) = self.gateway.initiate_payment(booking_id, amount).await {
            warn!("🔄️ Payment initiation for booking {booking_id} failed: {e}. Compensating");
            self.compensate_failed_payment(booking_id).await;
            return Err(BookingFlowError::PaymentFailed);
        }
        debug!("🔄️ Payment of {amount} requested for booking {booking_id}");
        Ok(booking_id)
    }

    /// Settle a booking according to the payment provider's verdict.
    ///
    /// A CONFIRMED verdict for a booking that already expired is a business event, not an
    /// error: the booking stays terminal, the provider owes the customer a refund, and we
    /// answer success so the provider stops retrying.
    pub async fn handle_payment_webhook(&self, booking_id: i64, status: &str) -> Result<(), BookingFlowError> {
        let outcome = status
            .parse::<PaymentOutcome>()
            .map_err(|_| BookingFlowError::InvalidPaymentStatus(status.to_string()))?;
        match outcome {
            PaymentOutcome::Confirmed => match self.db.confirm_booking(booking_id).await {
                Ok(()) => {
                    info!("🔄️ Booking {booking_id} confirmed by payment webhook");
                    Ok(())
                },
                Err(BookingDatabaseError::BookingCannotBeChanged(_)) => {
                    warn!(
                        "🔄️ Payment confirmed for booking {booking_id}, but it is already terminal. The payment \
                         provider must refund this payment."
                    );
                    Ok(())
                },
                Err(e) => Err(e.into()),
            },
            PaymentOutcome::Failed => {
                info!("🔄️ Payment failed for booking {booking_id}; cancelling");
                self.db.cancel_booking(booking_id).await.map_err(BookingFlowError::from)
            },
        }
    }

    /// Entry point for the expiration consumer. Safe under redelivery: a booking that was
    /// confirmed or cancelled in the meantime is left untouched.
    pub async fn expire_booking(&self, booking_id: i64) -> Result<(), BookingFlowError> {
        self.db.expire_booking(booking_id).await.map_err(BookingFlowError::from)
    }

    pub async fn cancel_booking(&self, booking_id: i64) -> Result<(), BookingFlowError> {
        self.db.cancel_booking(booking_id).await.map_err(BookingFlowError::from)
    }

    async fn amount_for(&self, event_id: i64, seat_count: usize) -> Result<tbs_common::Cents, BookingFlowError> {
        let event = self
            .db
            .fetch_event(event_id)
            .await?
            .ok_or(BookingFlowError::CatalogError(crate::traits::CatalogError::EventNotFound(event_id)))?;
        event
            .price
            .times(seat_count)
            .ok_or_else(|| BookingFlowError::Internal(format!("amount overflow for event {event_id}")))
    }

    /// Undo a reservation whose payment request failed.
    ///
    /// The work is spawned so it is not tied to the caller's future: if the HTTP request that
    /// triggered the saga is dropped, the cancel still runs to completion (bounded by
    /// [`COMPENSATION_BUDGET`]). If compensation fails anyway, the delay queue will expire
    /// the booking within 15 minutes, so seats are never lost forever.
    async fn compensate_failed_payment(&self, booking_id: i64) {
        let db = self.db.clone();
        let task = tokio::spawn(async move {
            match tokio::time::timeout(COMPENSATION_BUDGET, db.cancel_booking(booking_id)).await {
                Ok(Ok(())) => info!("🔄️ Compensation complete: booking {booking_id} cancelled, seats released"),
                Ok(Err(e)) => error!("🔄️ Compensation for booking {booking_id} failed: {e}"),
                Err(_) => error!("🔄️ Compensation for booking {booking_id} timed out"),
            }
        });
        if task.await.is_err() {
            error!("🔄️ Compensation task for booking {booking_id} panicked");
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use async_trait::async_trait;
    use chrono::Utc;
    use mockall::mock;
    use tbs_common::Cents;

    use super::*;
    use crate::{
        booking_objects::{EventList, Pagination},
        db_types::{Booking, EventInfo, Seat},
        traits::{CatalogError, EventCatalog, PaymentGatewayError},
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

    fn event_priced_at(cents: i64) -> EventInfo {
        EventInfo {
            id: 1,
            title: "Rustfest".to_string(),
            description: None,
            starts_at: Utc::now(),
            price: Cents::from(cents),
        }
    }

    #[tokio::test]
    async fn happy_path_leaves_booking_pending() {
        let _ = env_logger::try_init();
        let mut db = MockDb::new();
        db.expect_create_booking().times(1).returning(|_, _, _| Ok(1001));
        db.expect_fetch_event().times(1).returning(|_| Ok(Some(event_priced_at(2_500))));
        let mut gateway = MockGateway::new();
        gateway
            .expect_initiate_payment()
            .times(1)
            .withf(|id, amount| *id == 1001 && *amount == Cents::from(5_000))
            .returning(|_, _| Ok(()));

        let api = BookingFlowApi::new(db, gateway);
        let booking_id = api.create_booking(1, 1, &[1, 2]).await.expect("booking should succeed");
        assert_eq!(booking_id, 1001);
    }

    #[tokio::test]
    async fn failed_payment_compensates_even_though_the_error_is_surfaced() {
        let _ = env_logger::try_init();
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut db = MockDb::new();
        db.expect_create_booking().times(1).returning(|_, _, _| Ok(42));
        db.expect_fetch_event().times(1).returning(|_| Ok(Some(event_priced_at(1_000))));
        let flag = cancelled.clone();
        db.expect_clone().times(1).returning(move || {
            let mut compensator = MockDb::new();
            let flag = flag.clone();
            compensator.expect_cancel_booking().times(1).returning(move |id| {
                assert_eq!(id, 42);
                flag.store(true, Ordering::SeqCst);
                Ok(())
            });
            compensator
        });
        let mut gateway = MockGateway::new();
        gateway
            .expect_initiate_payment()
            .times(1)
            .returning(|_, _| Err(PaymentGatewayError::RejectedRequest(500)));

        let api = BookingFlowApi::new(db, gateway);
        let err = api.create_booking(2, 1, &[7]).await.expect_err("payment failure must surface");
        assert!(matches!(err, BookingFlowError::PaymentFailed));
        assert!(cancelled.load(Ordering::SeqCst), "compensation must have cancelled the booking");
    }

    #[tokio::test]
    async fn seat_conflicts_propagate_without_calling_the_gateway() {
        let _ = env_logger::try_init();
        let mut db = MockDb::new();
        db.expect_create_booking().times(1).returning(|_, _, _| Err(BookingDatabaseError::SeatNotAvailable));
        let gateway = MockGateway::new();

        let api = BookingFlowApi::new(db, gateway);
        let err = api.create_booking(1, 1, &[4]).await.expect_err("conflict expected");
        assert!(matches!(err, BookingFlowError::SeatNotAvailable));
    }

    #[tokio::test]
    async fn empty_seat_selection_is_rejected_before_touching_the_store() {
        let _ = env_logger::try_init();
        let api = BookingFlowApi::new(MockDb::new(), MockGateway::new());
        let err = api.create_booking(1, 1, &[]).await.expect_err("empty selection must fail");
        assert!(matches!(err, BookingFlowError::EmptySeatSelection));
    }

    #[tokio::test]
    async fn confirmed_webhook_confirms_the_booking() {
        let _ = env_logger::try_init();
        let mut db = MockDb::new();
        db.expect_confirm_booking().times(1).returning(|_| Ok(()));
        let api = BookingFlowApi::new(db, MockGateway::new());
        api.handle_payment_webhook(1001, "CONFIRMED").await.expect("webhook should succeed");
    }

    #[tokio::test]
    async fn late_confirmation_of_a_terminal_booking_is_not_an_error() {
        let _ = env_logger::try_init();
        let mut db = MockDb::new();
        db.expect_confirm_booking()
            .times(1)
            .returning(|id| Err(BookingDatabaseError::BookingCannotBeChanged(id)));
        let api = BookingFlowApi::new(db, MockGateway::new());
        api.handle_payment_webhook(1001, "CONFIRMED").await.expect("duplicate/late webhook must be a no-op");
    }

    #[tokio::test]
    async fn failed_webhook_cancels_the_booking() {
        let _ = env_logger::try_init();
        let mut db = MockDb::new();
        db.expect_cancel_booking().times(1).returning(|_| Ok(()));
        let api = BookingFlowApi::new(db, MockGateway::new());
        api.handle_payment_webhook(1001, "FAILED").await.expect("webhook should succeed");
    }

    #[tokio::test]
    async fn unknown_webhook_status_is_invalid_and_changes_nothing() {
        let _ = env_logger::try_init();
        let api = BookingFlowApi::new(MockDb::new(), MockGateway::new());
        let err = api.handle_payment_webhook(1001, "REFUNDED").await.expect_err("bad status must fail");
        assert!(matches!(err, BookingFlowError::InvalidPaymentStatus(s) if s == "REFUNDED"));
    }
}
