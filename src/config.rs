use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info};

use crate::aggregate::Role;
use crate::resolve::EmailLookup;

pub const DEFAULT_ADMIN_URL: &str = "https://api.atlassian.com";
pub const DEFAULT_GCS_URL: &str = "https://storage.googleapis.com";

/// Jira site and its Basic credentials.
#[derive(Debug)]
pub struct AtlassianAuth {
    pub base_url: String,
    pub basic_token: SecretString,
}

impl AtlassianAuth {
    /// `Authorization` header value. The token may be given with or without the `Basic ` prefix.
    pub fn authorization(&self) -> String {
        let token = self.basic_token.expose_secret().trim();
        if token.starts_with("Basic ") {
            token.to_string()
        } else {
            format!("Basic {token}")
        }
    }
}

/// Organisation admin API access.
#[derive(Debug)]
pub struct AdminAuth {
    pub base_url: String,
    pub org_id: String,
    pub bearer_token: SecretString,
}

/// Group name templates per role; `{project}` is replaced by the project key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RoleGroups {
    pub managers: String,
    pub contributors: String,
    pub external_contributors: String,
    pub viewers: String,
    pub external_viewers: String,
}

impl Default for RoleGroups {
    fn default() -> Self {
        Self {
            managers: "ATLASSIAN-{project}-MANAGERS".into(),
            contributors: "ATLASSIAN-{project}-CONTRIBUTORS".into(),
            external_contributors: "ATLASSIAN-{project}-EXTERNAL-CONTRIBUTORS".into(),
            viewers: "ATLASSIAN-{project}-VIEWERS".into(),
            external_viewers: "ATLASSIAN-{project}-EXTERNAL-VIEWERS".into(),
        }
    }
}

impl RoleGroups {
    /// Concrete group names in fetch order: internal before external within a role.
    pub fn for_project(&self, project_key: &str) -> Vec<(Role, String)> {
        let expand = |template: &str| template.replace("{project}", project_key);
        vec![
            (Role::Managers, expand(&self.managers)),
            (Role::Contributors, expand(&self.contributors)),
            (Role::Contributors, expand(&self.external_contributors)),
            (Role::Viewers, expand(&self.viewers)),
            (Role::Viewers, expand(&self.external_viewers)),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// Stage at the service desk, then attach and comment in one call.
    #[default]
    ServiceDesk,
    /// Attach to the issue, then post a separate comment.
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransitionSettings {
    pub id: String,
    #[serde(default)]
    pub resolution: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PublishSettings {
    pub mode: PublishMode,
    pub public: bool,
    pub comment: String,
    /// Direct mode only: post the roster itself as an ADF table comment.
    pub adf_roster: bool,
    pub transition: Option<TransitionSettings>,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            mode: PublishMode::default(),
            public: true,
            comment: "The access roster for this project is attached.".into(),
            adf_roster: false,
            transition: None,
        }
    }
}

/// Non-secret report settings, read from the optional YAML file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub groups: RoleGroups,
    pub email_lookup: EmailLookup,
    pub show_groups: bool,
    pub output_dir: PathBuf,
    pub publish: PublishSettings,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            groups: RoleGroups::default(),
            email_lookup: EmailLookup::default(),
            show_groups: true,
            output_dir: PathBuf::from("."),
            publish: PublishSettings::default(),
        }
    }
}

#[derive(Debug)]
pub struct ReportConfig {
    pub jira: AtlassianAuth,
    /// Present when bulk email lookup is configured.
    pub admin: Option<AdminAuth>,
    pub project_key: String,
    pub issue_key: String,
    /// Present when publishing through the service desk.
    pub service_desk_id: Option<String>,
    pub settings: ReportSettings,
}

impl ReportConfig {
    pub fn report_file_name(&self) -> String {
        format!("{}-access-roster.pdf", self.project_key)
    }

    pub fn trace_loaded(&self) {
        info!(
            base_url = %self.jira.base_url,
            project_key = %self.project_key,
            issue_key = %self.issue_key,
            email_lookup = ?self.settings.email_lookup,
            publish_mode = ?self.settings.publish.mode,
            "Loaded report config"
        );
        debug!(settings = ?self.settings, "Report settings (full debug)");
    }
}

#[derive(Debug)]
pub struct RestoreConfig {
    pub jira: AtlassianAuth,
    pub admin: AdminAuth,
    pub target_email: String,
    pub support_ticket_url: Option<String>,
}

impl RestoreConfig {
    pub fn trace_loaded(&self) {
        info!(
            base_url = %self.jira.base_url,
            org_id = %self.admin.org_id,
            target_email = %self.target_email,
            "Loaded restore-access config"
        );
    }
}

#[derive(Debug)]
pub struct StorageConfig {
    pub base_url: String,
    pub bucket: String,
    pub folder: Option<String>,
    pub access_token: SecretString,
}

#[derive(Debug)]
pub struct AuditConfig {
    pub jira: AtlassianAuth,
    pub storage: StorageConfig,
}

impl AuditConfig {
    pub fn trace_loaded(&self) {
        info!(
            base_url = %self.jira.base_url,
            bucket = %self.storage.bucket,
            folder = self.storage.folder.as_deref().unwrap_or(""),
            "Loaded audit export config"
        );
    }
}
