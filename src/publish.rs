//! Report publishing: attach the rendered file to the ticket, comment, and
//! optionally move the ticket along its workflow.

use tracing::{error, info};

use crate::adf::AdfDocument;
use crate::config::{PublishMode, PublishSettings, TransitionSettings};
use crate::contract::{CommentBody, Publisher};
use crate::error::ApiError;

/// Where and what to publish.
#[derive(Debug, Clone)]
pub struct PublishTarget<'a> {
    pub issue_key: &'a str,
    /// Required in service desk mode.
    pub service_desk_id: Option<&'a str>,
    pub file_name: &'a str,
}

/// Attach `content` and post the status comment. Returns the temporary
/// attachment ids used, empty in direct mode.
///
/// `roster_comment` replaces the plain comment in direct mode when
/// `adf_roster` is set.
pub async fn publish_report<P>(
    publisher: &P,
    settings: &PublishSettings,
    target: &PublishTarget<'_>,
    content: Vec<u8>,
    roster_comment: Option<AdfDocument>,
) -> Result<Vec<String>, ApiError>
where
    P: Publisher + ?Sized,
{
    match settings.mode {
        PublishMode::ServiceDesk => {
            let desk = target
                .service_desk_id
                .ok_or(ApiError::NotConfigured("service desk id"))?;
            info!(service_desk_id = desk, file = target.file_name, "[PUBLISH] Staging temporary attachment");
            let staged = publisher
                .attach_temporary_file(desk, target.file_name, content)
                .await?;
            let ids: Vec<String> = staged
                .into_iter()
                .map(|handle| handle.temporary_attachment_id)
                .collect();
            if ids.is_empty() {
                error!(service_desk_id = desk, "[PUBLISH][ERROR] Service desk returned no attachment handles");
                return Err(ApiError::Decode {
                    url: format!("servicedesk/{desk}/attachTemporaryFile"),
                    message: "no temporary attachment handles returned".into(),
                });
            }
            publisher
                .attach_to_request(target.issue_key, ids.clone(), &settings.comment, settings.public)
                .await?;
            info!(issue_key = target.issue_key, attachments = ids.len(), "[PUBLISH] Attached report with comment");
            Ok(ids)
        }
        PublishMode::Direct => {
            publisher
                .attach_to_issue(target.issue_key, target.file_name, content)
                .await?;
            let body = match roster_comment {
                Some(doc) if settings.adf_roster => CommentBody::Document(doc),
                _ => CommentBody::Plain(settings.comment.clone()),
            };
            publisher.post_comment(target.issue_key, body).await?;
            info!(issue_key = target.issue_key, "[PUBLISH] Attached report and posted comment");
            Ok(Vec::new())
        }
    }
}

/// Submit the configured workflow transition. A failure is logged with the
/// response body and returned unchanged.
pub async fn transition<P>(
    publisher: &P,
    issue_key: &str,
    transition: &TransitionSettings,
) -> Result<(), ApiError>
where
    P: Publisher + ?Sized,
{
    info!(issue_key, transition_id = %transition.id, "[PUBLISH] Transitioning issue");
    publisher
        .transition_issue(issue_key, &transition.id, transition.resolution.clone())
        .await
        .map_err(|e| {
            match &e {
                ApiError::Http { status, body, .. } => {
                    error!(issue_key, status, body = %body, "[PUBLISH][ERROR] Transition rejected");
                }
                other => error!(issue_key, error = %other, "[PUBLISH][ERROR] Transition failed"),
            }
            e
        })
}
