//! Fine (late-return penalty) model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Fine record from database
///
/// A fine is active while `settled_date` is null; any active fine blocks
/// new loans for the patron.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Fine {
    pub id: i32,
    pub patron_id: i32,
    pub loan_id: i32,
    pub amount: Decimal,
    pub issued_date: DateTime<Utc>,
    pub settled_date: Option<DateTime<Utc>>,
}

impl Fine {
    pub fn is_active(&self) -> bool {
        self.settled_date.is_none()
    }
}

/// Command for recording a new fine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFine {
    pub patron_id: i32,
    pub loan_id: i32,
    pub amount: Decimal,
}
