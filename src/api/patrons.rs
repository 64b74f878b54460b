//! Patron management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        fine::Fine,
        loan::LoanDetails,
        patron::{CreatePatron, Patron, PatronQuery, PatronShort, UpdatePatron},
    },
};

use super::books::PaginatedResponse;

/// List patrons with search and pagination
#[utoipa::path(
    get,
    path = "/patrons",
    tag = "patrons",
    params(
        ("name" = Option<String>, Query, description = "Search by name"),
        ("national_id" = Option<String>, Query, description = "Search by national id"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "List of patrons", body = PaginatedResponse<PatronShort>)
    )
)]
pub async fn list_patrons(
    State(state): State<crate::AppState>,
    Query(query): Query<PatronQuery>,
) -> AppResult<Json<PaginatedResponse<PatronShort>>> {
    let (patrons, total) = state.services.patrons.search(&query).await?;

    Ok(Json(PaginatedResponse {
        items: patrons,
        total,
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    }))
}

/// Get patron details by ID
#[utoipa::path(
    get,
    path = "/patrons/{id}",
    tag = "patrons",
    params(
        ("id" = i32, Path, description = "Patron ID")
    ),
    responses(
        (status = 200, description = "Patron details", body = Patron),
        (status = 404, description = "Patron not found")
    )
)]
pub async fn get_patron(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Patron>> {
    let patron = state.services.patrons.get_by_id(id).await?;
    Ok(Json(patron))
}

/// Register a new patron
#[utoipa::path(
    post,
    path = "/patrons",
    tag = "patrons",
    request_body = CreatePatron,
    responses(
        (status = 201, description = "Patron created", body = Patron),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "National id already registered")
    )
)]
pub async fn create_patron(
    State(state): State<crate::AppState>,
    Json(patron): Json<CreatePatron>,
) -> AppResult<(StatusCode, Json<Patron>)> {
    let created = state.services.patrons.create(patron).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an existing patron
#[utoipa::path(
    put,
    path = "/patrons/{id}",
    tag = "patrons",
    params(
        ("id" = i32, Path, description = "Patron ID")
    ),
    request_body = UpdatePatron,
    responses(
        (status = 200, description = "Patron updated", body = Patron),
        (status = 404, description = "Patron not found")
    )
)]
pub async fn update_patron(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(patron): Json<UpdatePatron>,
) -> AppResult<Json<Patron>> {
    let updated = state.services.patrons.update(id, patron).await?;
    Ok(Json(updated))
}

/// Delete a patron
#[utoipa::path(
    delete,
    path = "/patrons/{id}",
    tag = "patrons",
    params(
        ("id" = i32, Path, description = "Patron ID")
    ),
    responses(
        (status = 204, description = "Patron deleted"),
        (status = 404, description = "Patron not found"),
        (status = 409, description = "Patron has active loans")
    )
)]
pub async fn delete_patron(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.patrons.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get active loans for a patron
#[utoipa::path(
    get,
    path = "/patrons/{id}/loans",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Patron ID")
    ),
    responses(
        (status = 200, description = "Patron's active loans", body = Vec<LoanDetails>),
        (status = 404, description = "Patron not found")
    )
)]
pub async fn get_patron_loans(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.patrons.loans(id).await?;
    Ok(Json(loans))
}

/// Get fine history for a patron
#[utoipa::path(
    get,
    path = "/patrons/{id}/fines",
    tag = "fines",
    params(
        ("id" = i32, Path, description = "Patron ID")
    ),
    responses(
        (status = 200, description = "Patron's fines, newest first", body = Vec<Fine>),
        (status = 404, description = "Patron not found")
    )
)]
pub async fn get_patron_fines(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<Fine>>> {
    let fines = state.services.patrons.fines(id).await?;
    Ok(Json(fines))
}

/// Settle an open fine
#[utoipa::path(
    post,
    path = "/fines/{id}/settle",
    tag = "fines",
    params(
        ("id" = i32, Path, description = "Fine ID")
    ),
    responses(
        (status = 200, description = "Fine settled", body = Fine),
        (status = 404, description = "Fine not found"),
        (status = 409, description = "Fine already settled")
    )
)]
pub async fn settle_fine(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Fine>> {
    let fine = state.services.patrons.settle_fine(id).await?;
    Ok(Json(fine))
}
