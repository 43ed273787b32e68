use std::collections::HashMap;
use std::env;
use std::fs::write;
use std::path::PathBuf;

use jira_roster::aggregate::Role;
use jira_roster::config::{PublishMode, ReportSettings};
use jira_roster::error::ConfigError;
use jira_roster::load_config::{
    audit_config_from, load_report_config, read_report_settings, report_config_from,
    restore_config_from,
};
use jira_roster::resolve::EmailLookup;
use secrecy::ExposeSecret;
use serial_test::serial;
use tempfile::NamedTempFile;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| vars.get(name).cloned()
}

const REPORT_VARS: &[&str] = &[
    "JIRA_BASE_URL",
    "JIRA_BASIC_TOKEN",
    "PROJECT_KEY",
    "ISSUE_KEY",
    "ATLASSIAN_ORG_ID",
    "ATLASSIAN_ADMIN_TOKEN",
    "SERVICE_DESK_ID",
];

/// This test ensures that every missing variable is named in one error, before any network call.
#[test]
fn test_report_config_names_every_missing_variable() {
    let err = report_config_from(
        ReportSettings::default(),
        lookup(&[("JIRA_BASE_URL", "https://example.atlassian.net"), ("ISSUE_KEY", "   ")]),
    )
    .unwrap_err();

    let ConfigError::MissingEnv(missing) = &err else {
        panic!("expected MissingEnv, got {err:?}");
    };
    assert_eq!(
        missing,
        &vec![
            "JIRA_BASIC_TOKEN".to_string(),
            "PROJECT_KEY".to_string(),
            "ISSUE_KEY".to_string(),
            "ATLASSIAN_ORG_ID".to_string(),
            "ATLASSIAN_ADMIN_TOKEN".to_string(),
            "SERVICE_DESK_ID".to_string(),
        ]
    );
    assert!(err.to_string().contains("JIRA_BASIC_TOKEN, PROJECT_KEY"));
}

/// This test ensures that admin and desk variables are only required by the modes that use them.
#[test]
fn test_single_lookup_direct_mode_needs_only_jira_vars() {
    let yaml = "email_lookup:\n  mode: single\npublish:\n  mode: direct\n";
    let settings: ReportSettings = serde_yaml::from_str(yaml).unwrap();

    let config = report_config_from(
        settings,
        lookup(&[
            ("JIRA_BASE_URL", "https://example.atlassian.net/"),
            ("JIRA_BASIC_TOKEN", "abc123"),
            ("PROJECT_KEY", "ABC"),
            ("ISSUE_KEY", "ABC-1"),
        ]),
    )
    .unwrap();

    assert_eq!(config.jira.base_url, "https://example.atlassian.net");
    assert_eq!(config.jira.authorization(), "Basic abc123");
    assert!(config.admin.is_none());
    assert_eq!(config.settings.publish.mode, PublishMode::Direct);
    assert_eq!(config.report_file_name(), "ABC-access-roster.pdf");
}

/// This test ensures that malformed project and issue keys are rejected.
#[test]
fn test_report_config_rejects_bad_keys() {
    let mut vars: Vec<(&str, &str)> = REPORT_VARS.iter().map(|name| (*name, "x")).collect();
    vars.retain(|(name, _)| *name != "PROJECT_KEY" && *name != "ISSUE_KEY");
    vars.push(("PROJECT_KEY", "abc"));
    vars.push(("ISSUE_KEY", "ABC-1"));

    let err = report_config_from(ReportSettings::default(), lookup(&vars)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { ref name, .. } if name == "PROJECT_KEY"));

    vars.retain(|(name, _)| *name != "PROJECT_KEY" && *name != "ISSUE_KEY");
    vars.push(("PROJECT_KEY", "ABC"));
    vars.push(("ISSUE_KEY", "ABC-"));
    let err = report_config_from(ReportSettings::default(), lookup(&vars)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { ref name, .. } if name == "ISSUE_KEY"));
}

/// This test ensures that a zero or oversized batch size is a configuration error.
#[test]
fn test_report_config_rejects_batch_size_out_of_range() {
    let vars: Vec<(&str, &str)> = REPORT_VARS
        .iter()
        .map(|name| match *name {
            "PROJECT_KEY" => (*name, "ABC"),
            "ISSUE_KEY" => (*name, "ABC-7"),
            other => (other, "x"),
        })
        .collect();

    for batch_size in [0, 101] {
        let settings = ReportSettings {
            email_lookup: EmailLookup::Bulk { batch_size },
            ..ReportSettings::default()
        };
        let err = report_config_from(settings, lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("batch_size"), "got {err}");
    }
}

/// This test ensures that the YAML settings file is parsed with defaults for omitted fields.
#[test]
fn test_read_report_settings_from_yaml() {
    let yaml = r#"
groups:
  managers: "TEAM-{project}-LEADS"
email_lookup:
  mode: bulk
  batch_size: 50
show_groups: false
output_dir: ./out
publish:
  comment: "Roster attached."
  transition: { id: "31", resolution: "Done" }
"#;
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();

    let settings = read_report_settings(file.path()).expect("settings should parse");

    assert_eq!(settings.email_lookup, EmailLookup::Bulk { batch_size: 50 });
    assert!(!settings.show_groups);
    assert_eq!(settings.output_dir, PathBuf::from("./out"));
    assert_eq!(settings.publish.mode, PublishMode::ServiceDesk);
    assert!(settings.publish.public);
    assert_eq!(settings.publish.comment, "Roster attached.");
    let transition = settings.publish.transition.as_ref().unwrap();
    assert_eq!(transition.id, "31");
    assert_eq!(transition.resolution.as_deref(), Some("Done"));

    let groups = settings.groups.for_project("XYZ");
    assert_eq!(groups[0], (Role::Managers, "TEAM-XYZ-LEADS".to_string()));
    assert_eq!(
        groups[2],
        (Role::Contributors, "ATLASSIAN-XYZ-EXTERNAL-CONTRIBUTORS".to_string())
    );
}

/// This test ensures that a settings file that is not valid YAML is reported as a parse error.
#[test]
fn test_read_report_settings_errors_for_invalid_file() {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), "email_lookup: [unterminated").unwrap();

    let err = read_report_settings(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

/// This test ensures that the loader reads the process environment.
#[test]
#[serial]
fn test_load_report_config_reads_process_env() {
    for name in REPORT_VARS {
        env::remove_var(name);
    }
    env::set_var("JIRA_BASE_URL", "https://example.atlassian.net");
    env::set_var("JIRA_BASIC_TOKEN", "Basic dG9rZW4=");
    env::set_var("PROJECT_KEY", "OPS");
    env::set_var("ISSUE_KEY", "OPS-42");
    env::set_var("ATLASSIAN_ORG_ID", "org-9");
    env::set_var("ATLASSIAN_ADMIN_TOKEN", "bearer-secret");
    env::set_var("SERVICE_DESK_ID", "3");

    let config = load_report_config(None).expect("config should load");

    assert_eq!(config.project_key, "OPS");
    assert_eq!(config.issue_key, "OPS-42");
    assert_eq!(config.service_desk_id.as_deref(), Some("3"));
    let admin = config.admin.as_ref().expect("bulk lookup needs admin access");
    assert_eq!(admin.base_url, "https://api.atlassian.com");
    assert_eq!(admin.bearer_token.expose_secret(), "bearer-secret");
    assert_eq!(config.jira.authorization(), "Basic dG9rZW4=");

    for name in REPORT_VARS {
        env::remove_var(name);
    }
}

/// This test ensures that the restore loader requires the target email and keeps the ticket URL optional.
#[test]
fn test_restore_config_requires_target_email() {
    let err = restore_config_from(lookup(&[
        ("JIRA_BASE_URL", "https://example.atlassian.net"),
        ("JIRA_BASIC_TOKEN", "t"),
        ("ATLASSIAN_ORG_ID", "org"),
        ("ATLASSIAN_ADMIN_TOKEN", "a"),
    ]))
    .unwrap_err();
    assert!(err.to_string().contains("TARGET_EMAIL"));

    let config = restore_config_from(lookup(&[
        ("JIRA_BASE_URL", "https://example.atlassian.net"),
        ("JIRA_BASIC_TOKEN", "t"),
        ("ATLASSIAN_ORG_ID", "org"),
        ("ATLASSIAN_ADMIN_TOKEN", "a"),
        ("TARGET_EMAIL", "someone@example.com"),
    ]))
    .unwrap();
    assert_eq!(config.target_email, "someone@example.com");
    assert_eq!(config.support_ticket_url, None);
}

/// This test ensures that the audit loader defaults the storage endpoint and trims the folder.
#[test]
fn test_audit_config_defaults() {
    let config = audit_config_from(lookup(&[
        ("JIRA_BASE_URL", "https://example.atlassian.net"),
        ("JIRA_BASIC_TOKEN", "t"),
        ("GOOGLE_CLOUD_BUCKET", "audit-bucket"),
        ("GOOGLE_OAUTH_ACCESS_TOKEN", "ya29.token"),
        ("GOOGLE_CLOUD_FOLDER", "/exports/atlassian/"),
    ]))
    .unwrap();

    assert_eq!(config.storage.base_url, "https://storage.googleapis.com");
    assert_eq!(config.storage.bucket, "audit-bucket");
    assert_eq!(config.storage.folder.as_deref(), Some("exports/atlassian"));
}
