//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, health, loans, patrons};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Biblioteca API",
        version = "0.3.0",
        description = "Library Loan Management REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::list_copies,
        books::create_copy,
        books::delete_copy,
        books::update_copy_status,
        books::list_categories,
        // Patrons
        patrons::list_patrons,
        patrons::get_patron,
        patrons::create_patron,
        patrons::update_patron,
        patrons::delete_patron,
        patrons::get_patron_loans,
        patrons::get_patron_fines,
        patrons::settle_fine,
        // Loans
        loans::create_loan,
        loans::renew_loan,
        loans::return_loan,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::BookShort,
            crate::models::book::Category,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::copy::Copy,
            crate::models::copy::CopyStatus,
            crate::models::copy::CreateCopy,
            crate::models::copy::UpdateCopyStatus,
            // Patrons
            crate::models::patron::Patron,
            crate::models::patron::PatronShort,
            crate::models::patron::PatronStatus,
            crate::models::patron::PatronType,
            crate::models::patron::CreatePatron,
            crate::models::patron::UpdatePatron,
            // Loans
            loans::CreateLoanRequest,
            loans::LoanResponse,
            loans::ReturnLoanRequest,
            loans::ReturnResponse,
            crate::models::loan::Loan,
            crate::models::loan::LoanLine,
            crate::models::loan::LoanDetails,
            crate::models::loan::LoanLineDetails,
            crate::models::loan::LoanStatus,
            crate::models::loan::LineStatus,
            // Fines
            crate::models::fine::Fine,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "patrons", description = "Patron management"),
        (name = "loans", description = "Loan management"),
        (name = "fines", description = "Late-return fines")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
