/// `load_config`: builds typed configs from the process environment and the
/// optional static report YAML.
///
/// Secrets and identifiers come only from the environment; the YAML file holds
/// layout and publishing settings and may be omitted entirely. Every loader
/// checks all of its variables before returning, so a single error names
/// every missing one, and nothing here touches the network.
use std::fs;
use std::path::Path;

use regex::Regex;
use secrecy::SecretString;
use tracing::{error, info};

use crate::config::{
    AdminAuth, AtlassianAuth, AuditConfig, PublishMode, ReportConfig, ReportSettings,
    RestoreConfig, StorageConfig, DEFAULT_ADMIN_URL, DEFAULT_GCS_URL,
};
use crate::error::ConfigError;
use crate::resolve::{EmailLookup, MAX_BULK_BATCH};

/// Collects required variables and remembers which ones were missing.
struct EnvReader<F> {
    lookup: F,
    missing: Vec<String>,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn new(lookup: F) -> Self {
        Self {
            lookup,
            missing: Vec::new(),
        }
    }

    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&mut self, name: &str) -> String {
        match self.optional(name) {
            Some(value) => value,
            None => {
                self.missing.push(name.to_string());
                String::new()
            }
        }
    }

    fn finish(self) -> Result<(), ConfigError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            error!(missing = ?self.missing, "Required environment variables are not set");
            Err(ConfigError::MissingEnv(self.missing))
        }
    }
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn jira_auth<F>(env: &mut EnvReader<F>) -> AtlassianAuth
where
    F: Fn(&str) -> Option<String>,
{
    AtlassianAuth {
        base_url: trim_url(env.required("JIRA_BASE_URL")),
        basic_token: SecretString::from(env.required("JIRA_BASIC_TOKEN")),
    }
}

fn admin_auth<F>(env: &mut EnvReader<F>) -> AdminAuth
where
    F: Fn(&str) -> Option<String>,
{
    AdminAuth {
        base_url: trim_url(
            env.optional("ATLASSIAN_ADMIN_URL")
                .unwrap_or_else(|| DEFAULT_ADMIN_URL.to_string()),
        ),
        org_id: env.required("ATLASSIAN_ORG_ID"),
        bearer_token: SecretString::from(env.required("ATLASSIAN_ADMIN_TOKEN")),
    }
}

fn check_pattern(name: &str, value: &str, pattern: &str) -> Result<(), ConfigError> {
    let re = Regex::new(pattern).map_err(|e| ConfigError::Invalid {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    if re.is_match(value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            name: name.to_string(),
            reason: format!("{value:?} does not match {pattern}"),
        })
    }
}

/// Read the static report settings YAML.
pub fn read_report_settings<P: AsRef<Path>>(path: P) -> Result<ReportSettings, ConfigError> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading report settings from file");

    let content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        ConfigError::Read {
            path: path_ref.display().to_string(),
            source: e,
        }
    })?;

    let settings: ReportSettings = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
        ConfigError::Parse(e)
    })?;
    info!(config_path = ?path_ref, "Parsed config YAML successfully");
    Ok(settings)
}

/// Report config from the process environment and an optional settings file.
pub fn load_report_config(settings_path: Option<&Path>) -> Result<ReportConfig, ConfigError> {
    let settings = match settings_path {
        Some(path) => read_report_settings(path)?,
        None => ReportSettings::default(),
    };
    report_config_from(settings, process_env)
}

pub fn report_config_from<F>(settings: ReportSettings, lookup: F) -> Result<ReportConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut env = EnvReader::new(lookup);
    let jira = jira_auth(&mut env);
    let project_key = env.required("PROJECT_KEY");
    let issue_key = env.required("ISSUE_KEY");
    let admin = match settings.email_lookup {
        EmailLookup::Bulk { .. } => Some(admin_auth(&mut env)),
        EmailLookup::Single => None,
    };
    let service_desk_id = match settings.publish.mode {
        PublishMode::ServiceDesk => Some(env.required("SERVICE_DESK_ID")),
        PublishMode::Direct => None,
    };
    env.finish()?;

    check_pattern("PROJECT_KEY", &project_key, r"^[A-Z][A-Z0-9_]*$")?;
    check_pattern("ISSUE_KEY", &issue_key, r"^[A-Z][A-Z0-9_]*-[0-9]+$")?;
    if let EmailLookup::Bulk { batch_size } = settings.email_lookup {
        if batch_size == 0 || batch_size > MAX_BULK_BATCH {
            return Err(ConfigError::Invalid {
                name: "email_lookup.batch_size".into(),
                reason: format!("must be between 1 and {MAX_BULK_BATCH}, got {batch_size}"),
            });
        }
    }
    if let Some(transition) = &settings.publish.transition {
        if transition.id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "publish.transition.id".into(),
                reason: "must not be empty".into(),
            });
        }
    }

    let config = ReportConfig {
        jira,
        admin,
        project_key,
        issue_key,
        service_desk_id,
        settings,
    };
    config.trace_loaded();
    Ok(config)
}

pub fn load_restore_config() -> Result<RestoreConfig, ConfigError> {
    restore_config_from(process_env)
}

pub fn restore_config_from<F>(lookup: F) -> Result<RestoreConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut env = EnvReader::new(lookup);
    let jira = jira_auth(&mut env);
    let admin = admin_auth(&mut env);
    let target_email = env.required("TARGET_EMAIL");
    let support_ticket_url = env.optional("SUPPORT_TICKET_URL");
    env.finish()?;

    let config = RestoreConfig {
        jira,
        admin,
        target_email,
        support_ticket_url,
    };
    config.trace_loaded();
    Ok(config)
}

pub fn load_audit_config() -> Result<AuditConfig, ConfigError> {
    audit_config_from(process_env)
}

pub fn audit_config_from<F>(lookup: F) -> Result<AuditConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut env = EnvReader::new(lookup);
    let jira = jira_auth(&mut env);
    let storage = StorageConfig {
        base_url: trim_url(
            env.optional("GCS_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GCS_URL.to_string()),
        ),
        bucket: env.required("GOOGLE_CLOUD_BUCKET"),
        folder: env
            .optional("GOOGLE_CLOUD_FOLDER")
            .map(|f| f.trim_matches('/').to_string())
            .filter(|f| !f.is_empty()),
        access_token: SecretString::from(env.required("GOOGLE_OAUTH_ACCESS_TOKEN")),
    };
    env.finish()?;

    let config = AuditConfig { jira, storage };
    config.trace_loaded();
    Ok(config)
}
