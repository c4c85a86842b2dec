use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use crate::db_types::EventInfo;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

//--------------------------------------    Pagination     -----------------------------------------------------------
/// Page-numbered pagination for catalog queries. Out-of-range values are clamped rather than
/// rejected, so a sloppy client still gets a sensible page.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
}

impl Pagination {
    pub fn new(page_number: i64, page_size: i64) -> Self {
        Self { page_number: Some(page_number), page_size: Some(page_size) }
    }

    pub fn page_number(&self) -> i64 {
        self.page_number.filter(|n| *n >= 1).unwrap_or(1)
    }

    pub fn page_size(&self) -> i64 {
        self.page_size.filter(|n| *n >= 1).unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page_number() - 1) * self.page_size()
    }
}

//--------------------------------------     EventList     -----------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventList {
    pub events: Vec<EventInfo>,
    pub total_count: i64,
    pub page_number: i64,
    pub page_size: i64,
}

//--------------------------------------   PaymentOutcome  -----------------------------------------------------------
/// The outcome a payment provider reports through the webhook. Anything else on the wire is a
/// validation error, never a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentOutcome {
    #[serde(rename = "CONFIRMED")]
    Confirmed,
    #[serde(rename = "FAILED")]
    Failed,
}

impl Display for PaymentOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentOutcome::Confirmed => write!(f, "CONFIRMED"),
            PaymentOutcome::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for PaymentOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRMED" => Ok(Self::Confirmed),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("Unknown payment outcome: {other}")),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pagination_defaults_and_caps() {
        let p = Pagination::default();
        assert_eq!(p.page_number(), 1);
        assert_eq!(p.page_size(), 10);
        assert_eq!(p.offset(), 0);

        let p = Pagination::new(3, 25);
        assert_eq!(p.offset(), 50);

        let p = Pagination::new(0, 100_000);
        assert_eq!(p.page_number(), 1);
        assert_eq!(p.page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn payment_outcome_accepts_only_the_wire_values() {
        assert_eq!("CONFIRMED".parse::<PaymentOutcome>().unwrap(), PaymentOutcome::Confirmed);
        assert_eq!("FAILED".parse::<PaymentOutcome>().unwrap(), PaymentOutcome::Failed);
        assert!("confirmed".parse::<PaymentOutcome>().is_err());
        assert!("REFUNDED".parse::<PaymentOutcome>().is_err());
    }
}
