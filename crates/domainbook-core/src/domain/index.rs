use crate::domain::email::domain_of;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Addresses grouped by domain. Derived from table rows on demand and never
/// persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainIndex {
    groups: BTreeMap<String, Vec<String>>,
}

/// One line of the banded export. Header rows carry only `domain`, member
/// rows carry only `email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub domain: String,
    pub email: String,
}

impl ExportRow {
    pub fn header(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            email: String::new(),
        }
    }

    pub fn member(email: &str) -> Self {
        Self {
            domain: String::new(),
            email: email.to_string(),
        }
    }
}

impl DomainIndex {
    /// Entries must already be normalized. Entries without an `@` are skipped;
    /// duplicates are kept in encounter order.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for entry in entries {
            let entry = entry.as_ref();
            let Ok(domain) = domain_of(entry) else {
                continue;
            };
            groups
                .entry(domain.to_string())
                .or_default()
                .push(entry.to_string());
        }
        Self { groups }
    }

    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn emails(&self, domain: &str) -> &[String] {
        self.groups.get(domain).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn banded_rows(&self) -> Vec<ExportRow> {
        let mut rows = Vec::new();
        for (domain, emails) in &self.groups {
            rows.push(ExportRow::header(domain));
            rows.extend(emails.iter().map(|email| ExportRow::member(email)));
        }
        rows
    }
}
