//! # AtlassianClient: reqwest implementation of the Atlassian contract traits
//!
//! One client carries the Jira site credentials (Basic) and, optionally, the
//! organisation admin credentials (Bearer). It implements [`Directory`],
//! [`EmailDirectory`], [`Publisher`], [`AccessAdmin`] and [`AuditSource`].
//!
//! Every request is one-shot with a fixed timeout. A non-success status is
//! logged together with the response body and returned as
//! [`ApiError::Http`]; the restore-access call is the exception and hands
//! its status back to the caller instead.

use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::config::{AdminAuth, AtlassianAuth};
use crate::contract::{
    AccessAdmin, AccountEmail, AdminResponse, AuditRecord, AuditSource, AuditWindow, CommentBody,
    Directory, EmailDirectory, GroupMembersPage, Publisher, ResponseBody, TemporaryAttachment,
    User,
};
use crate::error::ApiError;

/// Fixed timeout for every remote call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Shared reqwest client with the fixed timeout.
pub fn http_client() -> Result<Client, ApiError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|source| ApiError::Transport {
            url: String::from("<client>"),
            source,
        })
}

/// Send a request and turn any non-success status into [`ApiError::Http`].
pub(crate) async fn send(
    builder: RequestBuilder,
    method: &'static str,
    url: &str,
) -> Result<Response, ApiError> {
    let response = builder.send().await.map_err(|source| {
        error!(method, url, error = %source, "Request could not be sent");
        ApiError::Transport {
            url: url.to_string(),
            source,
        }
    })?;
    let status = response.status();
    if status.is_success() {
        debug!(method, url, status = status.as_u16(), "Request succeeded");
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<failed to decode response body>"));
    error!(method, url, status = status.as_u16(), body = %body, "Remote call failed");
    Err(ApiError::Http {
        method,
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}

pub(crate) async fn decode<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, ApiError> {
    response.json::<T>().await.map_err(|e| ApiError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

fn file_part(file_name: &str, content: Vec<u8>, url: &str) -> Result<Part, ApiError> {
    let mime = if file_name.to_ascii_lowercase().ends_with(".pdf") {
        "application/pdf"
    } else {
        "application/octet-stream"
    };
    Part::bytes(content)
        .file_name(file_name.to_string())
        .mime_str(mime)
        .map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })
}

/// Audit endpoints wrap records under a key, but may also return a bare array.
fn audit_records(value: Value, key: &str, url: &str) -> Result<Vec<AuditRecord>, ApiError> {
    let items = match value {
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ApiError::Decode {
                    url: url.to_string(),
                    message: format!("`{key}` is not an array: {other}"),
                })
            }
            None => Vec::new(),
        },
        Value::Array(items) => items,
        other => {
            return Err(ApiError::Decode {
                url: url.to_string(),
                message: format!("unexpected audit payload: {other}"),
            })
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(record) => Some(record),
            other => {
                warn!(url, record = %other, "Skipping audit record that is not an object");
                None
            }
        })
        .collect())
}

struct AdminCredentials {
    base_url: String,
    org_id: String,
    bearer: SecretString,
}

pub struct AtlassianClient {
    http: Client,
    base_url: String,
    authorization: SecretString,
    admin: Option<AdminCredentials>,
}

#[derive(Deserialize)]
struct UserEmail {
    #[serde(default)]
    email: String,
}

#[derive(Deserialize)]
struct BulkSearchResponse {
    #[serde(default)]
    data: Vec<AccountEmail>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemporaryAttachments {
    #[serde(default)]
    temporary_attachments: Vec<TemporaryAttachment>,
}

impl AtlassianClient {
    pub fn new(jira: &AtlassianAuth, admin: Option<&AdminAuth>) -> Result<Self, ApiError> {
        let client = Self {
            http: http_client()?,
            base_url: jira.base_url.trim_end_matches('/').to_string(),
            authorization: SecretString::from(jira.authorization()),
            admin: admin.map(|a| AdminCredentials {
                base_url: a.base_url.trim_end_matches('/').to_string(),
                org_id: a.org_id.clone(),
                bearer: SecretString::from(a.bearer_token.expose_secret().to_string()),
            }),
        };
        info!(
            base_url = %client.base_url,
            admin_configured = client.admin.is_some(),
            "Initialised Atlassian client"
        );
        Ok(client)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn jira(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(AUTHORIZATION, self.authorization.expose_secret())
            .header(ACCEPT, "application/json")
    }

    fn admin(&self) -> Result<&AdminCredentials, ApiError> {
        self.admin
            .as_ref()
            .ok_or(ApiError::NotConfigured("organisation admin API"))
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Response, ApiError> {
        send(self.jira(self.http.post(url)).json(body), "POST", url).await
    }
}

#[async_trait]
impl Directory for AtlassianClient {
    async fn group_members_page(
        &self,
        group: &str,
        start_at: usize,
        max_results: usize,
    ) -> Result<GroupMembersPage, ApiError> {
        let url = self.url("/rest/api/3/group/member");
        let request = self.jira(self.http.get(&url)).query(&[
            ("groupname", group.to_string()),
            ("startAt", start_at.to_string()),
            ("maxResults", max_results.to_string()),
        ]);
        let response = send(request, "GET", &url).await?;
        decode(response, &url).await
    }

    async fn users_page(&self, start_at: usize, max_results: usize) -> Result<Vec<User>, ApiError> {
        let url = self.url("/rest/api/3/users/search");
        let request = self
            .jira(self.http.get(&url))
            .query(&[("startAt", start_at), ("maxResults", max_results)]);
        let response = send(request, "GET", &url).await?;
        decode(response, &url).await
    }

    async fn user_email(&self, account_id: &str) -> Result<Option<String>, ApiError> {
        let url = self.url("/rest/api/3/user/email");
        let request = self
            .jira(self.http.get(&url))
            .query(&[("accountId", account_id)]);
        let response = send(request, "GET", &url).await?;
        let found: UserEmail = decode(response, &url).await?;
        Ok(Some(found.email).filter(|email| !email.is_empty()))
    }
}

#[async_trait]
impl EmailDirectory for AtlassianClient {
    async fn bulk_emails(&self, account_ids: &[String]) -> Result<Vec<AccountEmail>, ApiError> {
        let admin = self.admin()?;
        let url = format!("{}/admin/v1/orgs/{}/users/search", admin.base_url, admin.org_id);
        let body = json!({ "accountIds": account_ids, "expand": ["EMAIL"] });
        let request = self
            .http
            .post(&url)
            .bearer_auth(admin.bearer.expose_secret())
            .header(ACCEPT, "application/json")
            .json(&body);
        let response = send(request, "POST", &url).await?;
        let found: BulkSearchResponse = decode(response, &url).await?;
        Ok(found.data)
    }
}

#[async_trait]
impl Publisher for AtlassianClient {
    async fn attach_temporary_file(
        &self,
        service_desk_id: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<Vec<TemporaryAttachment>, ApiError> {
        let url = self.url(&format!(
            "/rest/servicedeskapi/servicedesk/{service_desk_id}/attachTemporaryFile"
        ));
        let form = Form::new().part("file", file_part(file_name, content, &url)?);
        let request = self
            .jira(self.http.post(&url))
            .header("X-Atlassian-Token", "no-check")
            .header("X-ExperimentalApi", "opt-in")
            .multipart(form);
        let response = send(request, "POST", &url).await?;
        let staged: TemporaryAttachments = decode(response, &url).await?;
        info!(
            service_desk_id,
            file_name,
            handles = staged.temporary_attachments.len(),
            "Staged temporary attachment"
        );
        Ok(staged.temporary_attachments)
    }

    async fn attach_to_request(
        &self,
        issue_key: &str,
        temporary_attachment_ids: Vec<String>,
        comment: &str,
        public: bool,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!("/rest/servicedeskapi/request/{issue_key}/attachment"));
        let body = json!({
            "temporaryAttachmentIds": temporary_attachment_ids,
            "public": public,
            "additionalComment": { "body": comment },
        });
        let request = self
            .jira(self.http.post(&url))
            .header("X-ExperimentalApi", "opt-in")
            .json(&body);
        send(request, "POST", &url).await?;
        info!(issue_key, public, "Attached staged files to request with comment");
        Ok(())
    }

    async fn attach_to_issue(
        &self,
        issue_key: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!("/rest/api/3/issue/{issue_key}/attachments"));
        let form = Form::new().part("file", file_part(file_name, content, &url)?);
        let request = self
            .jira(self.http.post(&url))
            .header("X-Atlassian-Token", "no-check")
            .multipart(form);
        send(request, "POST", &url).await?;
        info!(issue_key, file_name, "Attached file to issue");
        Ok(())
    }

    async fn post_comment(&self, issue_key: &str, body: CommentBody) -> Result<(), ApiError> {
        let (url, payload) = match body {
            CommentBody::Plain(text) => (
                self.url(&format!("/rest/api/2/issue/{issue_key}/comment")),
                json!({ "body": text }),
            ),
            CommentBody::Document(doc) => (
                self.url(&format!("/rest/api/3/issue/{issue_key}/comment")),
                json!({ "body": doc }),
            ),
        };
        self.post_json(&url, &payload).await?;
        info!(issue_key, "Posted comment");
        Ok(())
    }

    async fn transition_issue(
        &self,
        issue_key: &str,
        transition_id: &str,
        resolution: Option<String>,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!("/rest/api/3/issue/{issue_key}/transitions"));
        let mut payload = json!({ "transition": { "id": transition_id } });
        if let Some(name) = &resolution {
            payload["fields"] = json!({ "resolution": { "name": name } });
        }
        self.post_json(&url, &payload).await?;
        info!(issue_key, transition_id, resolution = ?resolution, "Transitioned issue");
        Ok(())
    }
}

#[async_trait]
impl AccessAdmin for AtlassianClient {
    async fn restore_access(&self, account_id: &str) -> Result<AdminResponse, ApiError> {
        let admin = self.admin()?;
        let url = format!(
            "{}/admin/v1/orgs/{}/directory/users/{}/restore-access",
            admin.base_url, admin.org_id, account_id
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(admin.bearer.expose_secret())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;
        let body = match serde_json::from_str::<Value>(&text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(text),
        };
        info!(account_id, status, "Restore-access call returned");
        Ok(AdminResponse { status, body })
    }
}

#[async_trait]
impl AuditSource for AtlassianClient {
    async fn jira_audit_page(
        &self,
        window: AuditWindow,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<AuditRecord>, ApiError> {
        let url = self.url("/rest/api/3/auditing/record");
        let request = self.jira(self.http.get(&url)).query(&[
            ("from", window.from.to_rfc3339_opts(SecondsFormat::Secs, false)),
            ("to", window.to.to_rfc3339_opts(SecondsFormat::Secs, false)),
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
        ]);
        let response = send(request, "GET", &url).await?;
        let value: Value = decode(response, &url).await?;
        audit_records(value, "records", &url)
    }

    async fn confluence_audit_page(
        &self,
        window: AuditWindow,
        start: usize,
        limit: usize,
    ) -> Result<Vec<AuditRecord>, ApiError> {
        let url = self.url("/wiki/rest/api/audit");
        let request = self.jira(self.http.get(&url)).query(&[
            ("startDate", window.from.timestamp_millis().to_string()),
            ("endDate", window.to.timestamp_millis().to_string()),
            ("start", start.to_string()),
            ("limit", limit.to_string()),
        ]);
        let response = send(request, "GET", &url).await?;
        let value: Value = decode(response, &url).await?;
        audit_records(value, "results", &url)
    }
}
