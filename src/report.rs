//! Coordinating module for the roster report: fetch, dedupe, resolve,
//! aggregate, render, publish.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::adf::roster_document;
use crate::aggregate::{aggregate, LabelledMembers, Role, Roster};
use crate::config::ReportConfig;
use crate::contract::{Directory, EmailDirectory, Publisher};
use crate::error::{ApiError, ReportError};
use crate::fetch::fetch_group_members;
use crate::publish::{publish_report, transition, PublishTarget};
use crate::render::render_roster_pdf;
use crate::resolve::{resolve_emails, unique_account_ids, EmailLookup};

/// Output of stages one to four.
#[derive(Debug, Clone)]
pub struct RosterBuild {
    pub roster: Roster,
    pub unique_accounts: usize,
    pub email_requests: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub managers: usize,
    pub contributors: usize,
    pub viewers: usize,
    pub unique_accounts: usize,
    pub email_requests: usize,
    pub pages: usize,
    pub substitutions: usize,
    pub file: PathBuf,
    pub attachment_ids: Vec<String>,
    pub transitioned: bool,
}

/// Fetch every group in order, resolve emails once for the union of
/// accounts, and aggregate into role buckets.
pub async fn build_roster<D, E>(
    directory: &D,
    emails: &E,
    groups: &[(Role, String)],
    lookup: EmailLookup,
) -> Result<RosterBuild, ApiError>
where
    D: Directory + ?Sized,
    E: EmailDirectory + ?Sized,
{
    let mut labelled = Vec::with_capacity(groups.len());
    for (role, group) in groups {
        let users = fetch_group_members(directory, group).await?;
        info!(role = ?role, group = %group, count = users.len(), "[REPORT] Fetched group");
        labelled.push(LabelledMembers {
            role: *role,
            group: group.clone(),
            users,
        });
    }

    let ids = unique_account_ids(labelled.iter().map(|l| l.users.as_slice()));
    info!(unique_accounts = ids.len(), "[REPORT] Collected unique accounts");

    let index = resolve_emails(lookup, directory, emails, &ids).await?;
    info!(requests = index.requests, resolved = index.len(), "[REPORT] Resolved emails");

    let roster = aggregate(&labelled, &index);
    debug!(
        managers = roster.count(Role::Managers),
        contributors = roster.count(Role::Contributors),
        viewers = roster.count(Role::Viewers),
        memberships = roster.membership.len(),
        "[REPORT] Aggregated roster"
    );

    Ok(RosterBuild {
        roster,
        unique_accounts: ids.len(),
        email_requests: index.requests,
    })
}

/// Written to a temporary file in `dir`, then renamed into place.
fn write_report(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ReportError> {
    let io_error = |path: &Path| {
        let path = path.display().to_string();
        move |source: std::io::Error| ReportError::Io { path, source }
    };

    fs::create_dir_all(dir).map_err(io_error(dir))?;
    let target = dir.join(file_name);
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_error(dir))?;
    tmp.write_all(bytes).map_err(io_error(&target))?;
    tmp.persist(&target)
        .map_err(|e| ReportError::Io {
            path: target.display().to_string(),
            source: e.error,
        })?;
    Ok(target)
}

/// Run the full roster report for the configured project and ticket.
pub async fn run_report<D, E, P>(
    config: &ReportConfig,
    directory: &D,
    emails: &E,
    publisher: &P,
) -> Result<ReportSummary, ReportError>
where
    D: Directory + ?Sized,
    E: EmailDirectory + ?Sized,
    P: Publisher + ?Sized,
{
    let settings = &config.settings;
    info!(project_key = %config.project_key, issue_key = %config.issue_key, "[REPORT] Starting roster report");

    let groups = settings.groups.for_project(&config.project_key);
    let built = build_roster(directory, emails, &groups, settings.email_lookup).await?;
    let roster = &built.roster;
    let membership = settings.show_groups.then_some(&roster.membership);

    let title = format!("{} access roster", config.project_key);
    let rendered = render_roster_pdf(roster, membership, &title).map_err(|e| {
        error!(error = %e, "[REPORT][ERROR] Rendering failed");
        e
    })?;

    let file_name = config.report_file_name();
    let file = write_report(&settings.output_dir, &file_name, &rendered.bytes)?;
    info!(file = ?file, pages = rendered.pages, "[REPORT] Wrote report");

    let target = PublishTarget {
        issue_key: &config.issue_key,
        service_desk_id: config.service_desk_id.as_deref(),
        file_name: &file_name,
    };
    let roster_comment = settings
        .publish
        .adf_roster
        .then(|| roster_document(roster, membership));
    let attachment_ids =
        publish_report(publisher, &settings.publish, &target, rendered.bytes, roster_comment)
            .await?;

    let transitioned = match &settings.publish.transition {
        Some(t) => {
            transition(publisher, &config.issue_key, t).await?;
            true
        }
        None => false,
    };

    let summary = ReportSummary {
        managers: roster.count(Role::Managers),
        contributors: roster.count(Role::Contributors),
        viewers: roster.count(Role::Viewers),
        unique_accounts: built.unique_accounts,
        email_requests: built.email_requests,
        pages: rendered.pages,
        substitutions: rendered.substitutions,
        file,
        attachment_ids,
        transitioned,
    };
    info!(summary = ?summary, "[REPORT] Roster report complete");
    Ok(summary)
}
