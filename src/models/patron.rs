//! Patron model and related types

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

static NATIONAL_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{8}[A-Z]$").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{9}$").unwrap());

/// Patron status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
pub enum PatronStatus {
    Active = 0,
    Inactive = 1,
    Blocked = 2,
}

impl From<i16> for PatronStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => PatronStatus::Inactive,
            2 => PatronStatus::Blocked,
            _ => PatronStatus::Active,
        }
    }
}

impl From<PatronStatus> for i16 {
    fn from(s: PatronStatus) -> Self {
        s as i16
    }
}

/// Patron categories (drives nothing in the lending rules today,
/// kept for statistics and desk display)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
pub enum PatronType {
    Student = 0,
    Teacher = 1,
    Staff = 2,
    External = 3,
}

impl From<i16> for PatronType {
    fn from(v: i16) -> Self {
        match v {
            1 => PatronType::Teacher,
            2 => PatronType::Staff,
            3 => PatronType::External,
            _ => PatronType::Student,
        }
    }
}

impl From<PatronType> for i16 {
    fn from(t: PatronType) -> Self {
        t as i16
    }
}

impl std::fmt::Display for PatronType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PatronType::Student => "Student",
            PatronType::Teacher => "Teacher",
            PatronType::Staff => "Staff",
            PatronType::External => "External",
        };
        write!(f, "{}", label)
    }
}

/// Full patron model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Patron {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    /// National identity number, unique across patrons
    pub national_id: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub patron_type: i16, // 0=Student, 1=Teacher, 2=Staff, 3=External
    pub status: i16,      // 0=Active, 1=Inactive, 2=Blocked
    pub registered_date: DateTime<Utc>,
}

impl Patron {
    pub fn status(&self) -> PatronStatus {
        PatronStatus::from(self.status)
    }
}

/// Short patron representation for lists
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PatronShort {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub status: i16,
    pub nb_active_loans: Option<i64>,
}

/// Patron query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct PatronQuery {
    pub name: Option<String>,
    pub national_id: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create patron request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePatron {
    #[validate(length(min = 2, max = 50, message = "First name must have 2 to 50 characters"))]
    pub first_name: String,
    #[validate(length(min = 2, max = 100, message = "Last name must have 2 to 100 characters"))]
    pub last_name: String,
    /// National identity number (8 digits + control letter)
    #[validate(regex(path = *NATIONAL_ID_RE, message = "Invalid national id format"))]
    pub national_id: String,
    pub address: Option<String>,
    #[validate(regex(path = *PHONE_RE, message = "Phone must have 9 digits"))]
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub patron_type: Option<PatronType>,
}

/// Update patron request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePatron {
    #[validate(length(min = 2, max = 50, message = "First name must have 2 to 50 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 2, max = 100, message = "Last name must have 2 to 100 characters"))]
    pub last_name: Option<String>,
    pub address: Option<String>,
    #[validate(regex(path = *PHONE_RE, message = "Phone must have 9 digits"))]
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub patron_type: Option<PatronType>,
    pub status: Option<PatronStatus>,
}
