//! Patron management service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        fine::Fine,
        loan::LoanDetails,
        patron::{CreatePatron, Patron, PatronQuery, PatronShort, UpdatePatron},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct PatronsService {
    repository: Repository,
}

impl PatronsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search patrons with filters
    pub async fn search(&self, query: &PatronQuery) -> AppResult<(Vec<PatronShort>, i64)> {
        self.repository.patrons.search(query).await
    }

    /// Get patron by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Patron> {
        self.repository.patrons.get_by_id(id).await
    }

    /// Register a new patron
    pub async fn create(&self, patron: CreatePatron) -> AppResult<Patron> {
        patron
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if self
            .repository
            .patrons
            .national_id_exists(&patron.national_id, None)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "Patron with national id {} already exists",
                patron.national_id
            )));
        }

        let created = self.repository.patrons.create(&patron).await?;
        tracing::info!("Patron {} registered", created.id);
        Ok(created)
    }

    /// Update an existing patron
    pub async fn update(&self, id: i32, patron: UpdatePatron) -> AppResult<Patron> {
        patron
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        self.repository.patrons.update(id, &patron).await
    }

    /// Delete a patron
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.patrons.delete(id).await
    }

    /// Active loans of a patron with copy details
    pub async fn loans(&self, patron_id: i32) -> AppResult<Vec<LoanDetails>> {
        self.repository.patrons.get_by_id(patron_id).await?;
        self.repository.loans.active_for_patron(patron_id).await
    }

    /// Fine history of a patron
    pub async fn fines(&self, patron_id: i32) -> AppResult<Vec<Fine>> {
        self.repository.patrons.get_by_id(patron_id).await?;
        self.repository.fines.list_for_patron(patron_id).await
    }

    /// Settle an open fine
    pub async fn settle_fine(&self, fine_id: i32) -> AppResult<Fine> {
        let fine = self.repository.fines.settle(fine_id).await?;
        tracing::info!("Fine {} settled for patron {}", fine.id, fine.patron_id);
        Ok(fine)
    }
}
