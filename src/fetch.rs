//! Group member fetcher: complete, order-preserving membership of one group.

use tracing::{debug, error, info};

use crate::contract::{Directory, User};
use crate::error::ApiError;

/// Page size for `GET /rest/api/3/group/member`.
pub const GROUP_PAGE_SIZE: usize = 50;

/// Fetch every member of `group`, page by page, until the directory reports
/// the last page or returns an empty one. Members are returned exactly as
/// reported: no filtering, no deduplication. A failing page aborts the fetch.
pub async fn fetch_group_members<D>(directory: &D, group: &str) -> Result<Vec<User>, ApiError>
where
    D: Directory + ?Sized,
{
    info!(group, "Fetching group members");
    let mut members = Vec::new();
    let mut start_at = 0;

    loop {
        let page = match directory
            .group_members_page(group, start_at, GROUP_PAGE_SIZE)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                error!(group, start_at, error = %e, "Group member page request failed");
                return Err(e);
            }
        };
        let received = page.values.len();
        debug!(group, start_at, received, is_last = page.is_last, "Received group member page");
        members.extend(page.values);

        if page.is_last || received == 0 {
            break;
        }
        start_at += GROUP_PAGE_SIZE;
    }

    info!(group, count = members.len(), "Fetched group members");
    Ok(members)
}
