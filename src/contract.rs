//! # contract: seams between the pipeline and the outside world
//!
//! Every remote collaborator the roster pipeline, the restore-access flow and
//! the audit export talk to is described here as an async trait, together
//! with the plain data types crossing those seams.
//!
//! - [`Directory`]: Jira user directory (group members, user search, single email)
//! - [`EmailDirectory`]: organisation admin bulk email search
//! - [`Publisher`]: attachments, comments and workflow transitions on a ticket
//! - [`AccessAdmin`]: organisation admin "restore access"
//! - [`AuditSource`]: Jira and Confluence audit records
//! - [`ObjectStore`]: cloud object storage
//!
//! ## Mocking & Testing
//! All traits are annotated with `mockall::automock` (exported behind the
//! `test-export-mocks` feature) so integration tests can count calls and
//! script responses without a network.
//!
//! The production implementations live in [`crate::client`] and
//! [`crate::storage`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::adf::AdfDocument;
use crate::error::ApiError;

/// A user as reported by the directory. Missing fields default to an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email_address: String,
}

impl User {
    pub fn new(account_id: &str, display_name: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            display_name: display_name.to_string(),
            email_address: String::new(),
        }
    }
}

fn last_page_when_missing() -> bool {
    true
}

/// One page of `GET /rest/api/3/group/member`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupMembersPage {
    #[serde(default)]
    pub values: Vec<User>,
    #[serde(rename = "isLast", default = "last_page_when_missing")]
    pub is_last: bool,
}

/// One entry of the admin bulk user search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountEmail {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub email: String,
}

/// Handle for a file staged at the service desk, not yet linked to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryAttachment {
    pub temporary_attachment_id: String,
    #[serde(default)]
    pub file_name: String,
}

/// Body of an issue comment.
#[derive(Debug, Clone, PartialEq)]
pub enum CommentBody {
    Plain(String),
    Document(AdfDocument),
}

/// Raw outcome of an admin call whose status is reported rather than raised.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminResponse {
    pub status: u16,
    pub body: ResponseBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
}

/// Time range for audit record queries, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

pub type AuditRecord = serde_json::Map<String, serde_json::Value>;

/// Jira user directory.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Directory: Send + Sync {
    /// Fetch one page of members of `group`.
    async fn group_members_page(
        &self,
        group: &str,
        start_at: usize,
        max_results: usize,
    ) -> Result<GroupMembersPage, ApiError>;

    /// Fetch one page of the site-wide user search. An empty page means no more users.
    async fn users_page(&self, start_at: usize, max_results: usize)
        -> Result<Vec<User>, ApiError>;

    /// Look up the email of a single account. `None` when the account hides it.
    async fn user_email(&self, account_id: &str) -> Result<Option<String>, ApiError>;
}

/// Organisation admin bulk email lookup.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait EmailDirectory: Send + Sync {
    async fn bulk_emails(&self, account_ids: &[String]) -> Result<Vec<AccountEmail>, ApiError>;
}

/// Ticket-side operations used to publish a report.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Stage a file at a service desk.
    async fn attach_temporary_file(
        &self,
        service_desk_id: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<Vec<TemporaryAttachment>, ApiError>;

    /// Permanently link staged files to a request and post a comment in the same call.
    async fn attach_to_request(
        &self,
        issue_key: &str,
        temporary_attachment_ids: Vec<String>,
        comment: &str,
        public: bool,
    ) -> Result<(), ApiError>;

    /// Attach a file directly to an issue.
    async fn attach_to_issue(
        &self,
        issue_key: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<(), ApiError>;

    async fn post_comment(&self, issue_key: &str, body: CommentBody) -> Result<(), ApiError>;

    async fn transition_issue(
        &self,
        issue_key: &str,
        transition_id: &str,
        resolution: Option<String>,
    ) -> Result<(), ApiError>;
}

/// Organisation admin account operations.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait AccessAdmin: Send + Sync {
    async fn restore_access(&self, account_id: &str) -> Result<AdminResponse, ApiError>;
}

/// Audit record pages from Jira and Confluence.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait AuditSource: Send + Sync {
    async fn jira_audit_page(
        &self,
        window: AuditWindow,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<AuditRecord>, ApiError>;

    async fn confluence_audit_page(
        &self,
        window: AuditWindow,
        start: usize,
        limit: usize,
    ) -> Result<Vec<AuditRecord>, ApiError>;
}

/// Cloud object storage.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `content` under `object_name`, returning a display location such as `gs://bucket/name`.
    async fn upload(
        &self,
        object_name: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ApiError>;
}
