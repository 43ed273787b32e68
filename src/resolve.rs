//! Account deduplication and email resolution.
//!
//! Two lookup strategies are supported:
//! - bulk: ids are partitioned into chunks of at most `batch_size` and each
//!   chunk is one admin search request; any failing chunk fails the run.
//! - single: one Jira request per id; a failing lookup is logged and recorded
//!   as an empty email, the only place a remote failure is tolerated.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use tracing::{info, warn};

use crate::contract::{Directory, EmailDirectory, User};
use crate::error::ApiError;

/// Upper bound on ids per bulk search request.
pub const MAX_BULK_BATCH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EmailLookup {
    Bulk {
        #[serde(default = "default_batch")]
        batch_size: usize,
    },
    Single,
}

fn default_batch() -> usize {
    MAX_BULK_BATCH
}

impl Default for EmailLookup {
    fn default() -> Self {
        EmailLookup::Bulk {
            batch_size: MAX_BULK_BATCH,
        }
    }
}

/// Distinct non-empty account ids across all lists.
pub fn unique_account_ids<'a, I>(lists: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a [User]>,
{
    lists
        .into_iter()
        .flatten()
        .filter(|user| !user.account_id.is_empty())
        .map(|user| user.account_id.clone())
        .collect()
}

/// Account id to email. Absent entries read as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailIndex {
    emails: BTreeMap<String, String>,
    /// Number of remote requests issued to build this index.
    pub requests: usize,
}

impl EmailIndex {
    pub fn email_for(&self, account_id: &str) -> &str {
        self.emails.get(account_id).map(String::as_str).unwrap_or("")
    }

    pub fn insert(&mut self, account_id: String, email: String) {
        self.emails.insert(account_id, email);
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

impl FromIterator<(String, String)> for EmailIndex {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            emails: iter.into_iter().collect(),
            requests: 0,
        }
    }
}

/// Resolve emails for `ids` with the configured strategy.
pub async fn resolve_emails<D, E>(
    lookup: EmailLookup,
    directory: &D,
    bulk: &E,
    ids: &BTreeSet<String>,
) -> Result<EmailIndex, ApiError>
where
    D: Directory + ?Sized,
    E: EmailDirectory + ?Sized,
{
    match lookup {
        EmailLookup::Bulk { batch_size } => resolve_emails_bulk(bulk, ids, batch_size).await,
        EmailLookup::Single => Ok(resolve_emails_single(directory, ids).await),
    }
}

pub async fn resolve_emails_bulk<E>(
    bulk: &E,
    ids: &BTreeSet<String>,
    batch_size: usize,
) -> Result<EmailIndex, ApiError>
where
    E: EmailDirectory + ?Sized,
{
    let batch_size = batch_size.clamp(1, MAX_BULK_BATCH);
    let ordered: Vec<String> = ids.iter().cloned().collect();
    let mut index = EmailIndex::default();

    for chunk in ordered.chunks(batch_size) {
        let found = bulk.bulk_emails(chunk).await?;
        index.requests += 1;
        info!(requested = chunk.len(), returned = found.len(), "Resolved email batch");
        for entry in found {
            if !entry.account_id.is_empty() {
                index.insert(entry.account_id, entry.email);
            }
        }
    }

    let missing = ids.iter().filter(|id| index.email_for(id).is_empty()).count();
    if missing > 0 {
        warn!(missing, "Some accounts have no resolvable email");
    }
    Ok(index)
}

pub async fn resolve_emails_single<D>(directory: &D, ids: &BTreeSet<String>) -> EmailIndex
where
    D: Directory + ?Sized,
{
    let mut index = EmailIndex::default();
    for id in ids {
        index.requests += 1;
        let email = match directory.user_email(id).await {
            Ok(email) => email.unwrap_or_default(),
            Err(e) => {
                warn!(account_id = %id, error = %e, "Email lookup failed, continuing without email");
                String::new()
            }
        };
        index.insert(id.clone(), email);
    }
    info!(count = index.len(), requests = index.requests, "Resolved emails one by one");
    index
}
