//! Loan management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::AppResult, models::loan::Loan};

/// Create loan request
#[derive(Deserialize, ToSchema)]
pub struct CreateLoanRequest {
    /// Patron ID
    pub patron_id: i32,
    /// Copies to borrow in this transaction, in desk order
    pub copy_ids: Vec<i32>,
}

/// Loan response with calculated dates
#[derive(Serialize, ToSchema)]
pub struct LoanResponse {
    /// Loan ID
    pub id: i32,
    /// Due date (ISO 8601 format)
    pub due_date: DateTime<Utc>,
    /// Renewals used so far
    pub nb_renewals: i16,
    /// Status message
    pub message: String,
}

/// Return request; the return moment defaults to now
#[derive(Deserialize, Default, ToSchema)]
pub struct ReturnLoanRequest {
    pub returned_at: Option<DateTime<Utc>>,
}

/// Return response with loan details
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Return status
    pub status: String,
    /// Whether the return was late and a fine was issued
    pub fine_issued: bool,
    /// The closed loan
    pub loan: Loan,
}

/// Create a new loan (borrow one or more copies)
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan created", body = LoanResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Patron or copy not found"),
        (status = 409, description = "Copy not available"),
        (status = 422, description = "Patron not eligible or loan limit reached")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateLoanRequest>,
) -> AppResult<(StatusCode, Json<LoanResponse>)> {
    let loan = state
        .services
        .loans
        .create_loan(request.patron_id, &request.copy_ids)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanResponse {
            id: loan.id,
            due_date: loan.due_date,
            nb_renewals: loan.nb_renewals,
            message: format!("{} copy(ies) borrowed", loan.lines.len()),
        }),
    ))
}

/// Renew a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/renew",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan renewed", body = LoanResponse),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Already returned or max renewals reached")
    )
)]
pub async fn renew_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanResponse>> {
    let loan = state.services.loans.renew_loan(loan_id).await?;

    Ok(Json(LoanResponse {
        id: loan.id,
        due_date: loan.due_date,
        nb_renewals: loan.nb_renewals,
        message: format!("Loan renewed ({} renewals)", loan.nb_renewals),
    }))
}

/// Return a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = ReturnLoanRequest,
    responses(
        (status = 200, description = "Loan returned", body = ReturnResponse),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Already returned")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i32>,
    request: Option<Json<ReturnLoanRequest>>,
) -> AppResult<Json<ReturnResponse>> {
    let returned_at = request
        .and_then(|Json(r)| r.returned_at)
        .unwrap_or_else(Utc::now);

    let loan = state.services.loans.return_loan(loan_id, returned_at).await?;
    let fine_issued = returned_at > loan.due_date;

    Ok(Json(ReturnResponse {
        status: "returned".to_string(),
        fine_issued,
        loan,
    }))
}
