//! Physical copy model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Copy lending state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
pub enum CopyStatus {
    Available = 0,
    Loaned = 1,
    InRepair = 2,
}

impl From<i16> for CopyStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => CopyStatus::Loaned,
            2 => CopyStatus::InRepair,
            _ => CopyStatus::Available,
        }
    }
}

impl From<CopyStatus> for i16 {
    fn from(s: CopyStatus) -> Self {
        s as i16
    }
}

impl std::fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CopyStatus::Available => "Available",
            CopyStatus::Loaned => "Loaned",
            CopyStatus::InRepair => "In repair",
        };
        write!(f, "{}", label)
    }
}

/// Full copy model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Copy {
    pub id: i32,
    pub book_id: i32,
    /// Barcode printed on the physical copy, unique
    pub barcode: String,
    pub shelf_location: Option<String>,
    pub status: i16, // 0=Available, 1=Loaned, 2=InRepair
    pub acquired_date: DateTime<Utc>,
}

impl Copy {
    pub fn status(&self) -> CopyStatus {
        CopyStatus::from(self.status)
    }
}

/// Create copy request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCopy {
    /// Barcode (optional, generated from the copy id when omitted)
    pub barcode: Option<String>,
    pub shelf_location: Option<String>,
}

/// Copy status change request (repair flow)
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCopyStatus {
    pub status: CopyStatus,
}
