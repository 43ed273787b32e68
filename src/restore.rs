//! Restore-access lookup: find an account by email, then ask the
//! organisation admin API to restore its product access.
//!
//! An account that cannot be found is an expected outcome and comes back as
//! [`RestoreOutcome::NotFound`]. The admin call's status is reported as-is,
//! successful or not.

use tracing::{debug, info, warn};

use crate::contract::{AccessAdmin, AdminResponse, Directory, ResponseBody};
use crate::error::ApiError;

/// Page size for the site-wide user search.
pub const USER_SEARCH_PAGE_SIZE: usize = 50;

/// Scan the user search for `email` (case-insensitive). Stops at the first
/// match with an account id, even mid-page, or at the first empty page.
pub async fn find_account_id<D>(directory: &D, email: &str) -> Result<Option<String>, ApiError>
where
    D: Directory + ?Sized,
{
    let wanted = email.to_lowercase();
    let mut start_at = 0;

    loop {
        let users = directory.users_page(start_at, USER_SEARCH_PAGE_SIZE).await?;
        debug!(start_at, received = users.len(), "Scanned user search page");
        if users.is_empty() {
            info!(email, "No account matches email");
            return Ok(None);
        }
        if let Some(user) = users
            .into_iter()
            .find(|u| !u.account_id.is_empty() && u.email_address.to_lowercase() == wanted)
        {
            info!(email, account_id = %user.account_id, "Found account for email");
            return Ok(Some(user.account_id));
        }
        start_at += USER_SEARCH_PAGE_SIZE;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    NotFound { message: String },
    Restored {
        account_id: String,
        response: AdminResponse,
    },
}

impl RestoreOutcome {
    /// Human-readable lines for the console and the result file.
    pub fn lines(&self) -> Vec<String> {
        match self {
            RestoreOutcome::NotFound { message } => vec![message.clone()],
            RestoreOutcome::Restored {
                account_id,
                response,
            } => {
                let body = match &response.body {
                    ResponseBody::Json(value) => format!("Response JSON: {value}"),
                    ResponseBody::Text(text) => format!("Response Text: {text}"),
                };
                vec![
                    format!("Found accountId: {account_id}"),
                    format!("Response Status: {}", response.status),
                    body,
                ]
            }
        }
    }
}

pub fn not_found_message(email: &str, support_ticket_url: Option<&str>) -> String {
    let mut message = format!(
        "Your account was not found from the provided email address, {email}. \
         This could be because the email address is hidden, especially for external users. \
         Please ensure this is the correct email"
    );
    match support_ticket_url {
        Some(url) => message.push_str(&format!(
            ". If it was correct and/or you are an external user, please [log a ticket]({url})."
        )),
        None => message.push('.'),
    }
    message
}

pub async fn restore_user_access<D, A>(
    directory: &D,
    admin: &A,
    email: &str,
    support_ticket_url: Option<&str>,
) -> Result<RestoreOutcome, ApiError>
where
    D: Directory + ?Sized,
    A: AccessAdmin + ?Sized,
{
    let Some(account_id) = find_account_id(directory, email).await? else {
        warn!(email, "Restore skipped, account not found");
        return Ok(RestoreOutcome::NotFound {
            message: not_found_message(email, support_ticket_url),
        });
    };

    let response = admin.restore_access(&account_id).await?;
    if !(200..300).contains(&response.status) {
        warn!(account_id = %account_id, status = response.status, "Restore-access returned a non-success status");
    }
    Ok(RestoreOutcome::Restored {
        account_id,
        response,
    })
}
