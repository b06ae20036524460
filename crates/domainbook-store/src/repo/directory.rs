use crate::error::{Result, StoreError};
use crate::Store;
use domainbook_core::{
    belongs_to_domain, domain_of, normalize_email, DomainIndex, EmailAddress, ExportRow,
};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Reads and mutations over the directory table. Reads load the table fresh;
/// mutations hold the table lock for the whole load-modify-persist cycle.
pub struct DirectoryRepo<'a> {
    store: &'a Store,
}

impl<'a> DirectoryRepo<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn list_domains(&self) -> Result<Vec<String>> {
        let table = self.store.load()?;
        let emails: BTreeSet<String> = table.normalized_entries().collect();
        let domains: BTreeSet<String> = emails
            .iter()
            .filter_map(|email| domain_of(email).ok())
            .map(str::to_string)
            .collect();
        Ok(domains.into_iter().collect())
    }

    /// Matches on the literal suffix `@{domain}` of the normalized value and
    /// returns the rows as stored.
    pub fn list_emails(&self, domain: &str) -> Result<Vec<String>> {
        let table = self.store.load()?;
        let suffix = format!("@{domain}");
        let emails: BTreeSet<String> = table
            .entries()
            .filter(|entry| normalize_email(entry).ends_with(&suffix))
            .map(str::to_string)
            .collect();
        Ok(emails.into_iter().collect())
    }

    pub fn add_email(&self, domain: &str, raw_email: &str) -> Result<EmailAddress> {
        let email = EmailAddress::parse(raw_email)?;
        if !belongs_to_domain(&email, domain) {
            return Err(StoreError::DomainMismatch {
                email: email.into_string(),
                domain: domain.to_string(),
            });
        }

        let _guard = self.store.lock()?;
        let mut table = self.store.load()?;
        if table.contains_normalized(email.as_str()) {
            return Err(StoreError::DuplicateEntry(email.into_string()));
        }

        table.push(email.as_str());
        let dropped = table.dedup();
        self.store.persist(&table)?;
        debug!(email = %email, domain, rows = table.len(), dropped, "email added");
        Ok(email)
    }

    /// Removes every row equal to the normalized address. `domain` is not
    /// checked against the address.
    pub fn delete_email(&self, domain: &str, raw_email: &str) -> Result<usize> {
        let email = normalize_email(raw_email);
        if domain_of(&email).map_or(true, |actual| actual != domain) {
            warn!(email = %email, domain, "deleting email outside the requested domain");
        }

        let _guard = self.store.lock()?;
        let mut table = self.store.load()?;
        if !table.contains_normalized(&email) {
            return Err(StoreError::NotFound(email));
        }

        let removed = table.remove_normalized(&email);
        self.store.persist(&table)?;
        debug!(email = %email, domain, rows = table.len(), removed, "email deleted");
        Ok(removed)
    }

    pub fn domain_index(&self) -> Result<DomainIndex> {
        let table = self.store.load()?;
        Ok(DomainIndex::from_entries(table.normalized_entries()))
    }

    pub fn export_grouped(&self) -> Result<Vec<ExportRow>> {
        Ok(self.domain_index()?.banded_rows())
    }
}
