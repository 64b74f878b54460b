//! Business logic services

pub mod catalog;
pub mod loans;
pub mod patrons;

use std::sync::Arc;

use crate::{config::LoanPolicy, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub patrons: patrons::PatronsService,
    pub loans: loans::LoansService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, loan_policy: LoanPolicy) -> Self {
        let loans = loans::LoansService::new(
            Arc::new(repository.patrons.clone()),
            Arc::new(repository.copies.clone()),
            Arc::new(repository.loans.clone()),
            Arc::new(repository.fines.clone()),
            loan_policy,
        );

        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            patrons: patrons::PatronsService::new(repository),
            loans,
        }
    }
}
