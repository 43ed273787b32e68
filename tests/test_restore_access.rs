use jira_roster::contract::{
    AdminResponse, MockAccessAdmin, MockDirectory, ResponseBody, User,
};
use jira_roster::restore::{find_account_id, restore_user_access, RestoreOutcome};
use serde_json::json;

/// A site with `total` users; user `i` has email `user{i}@example.com`.
fn site_directory(total: usize, expected_pages: usize) -> MockDirectory {
    let mut directory = MockDirectory::new();
    directory
        .expect_users_page()
        .times(expected_pages)
        .returning(move |start_at, max_results| {
            let end = (start_at + max_results).min(total);
            Ok((start_at.min(end)..end)
                .map(|i| User {
                    account_id: format!("acc-{i}"),
                    display_name: format!("User {i}"),
                    email_address: format!("user{i}@example.com"),
                })
                .collect())
        });
    directory
}

/// This test ensures that a match on the third page stops the scan without a fourth request.
#[tokio::test]
async fn test_find_account_stops_mid_page_on_match() {
    let directory = site_directory(120, 3);

    let found = find_account_id(&directory, "USER105@Example.com")
        .await
        .unwrap();

    assert_eq!(found.as_deref(), Some("acc-105"));
}

/// This test ensures that a matching user without an account id is skipped and the scan continues.
#[tokio::test]
async fn test_find_account_skips_match_without_account_id() {
    let mut directory = MockDirectory::new();
    directory
        .expect_users_page()
        .times(4)
        .returning(|start_at, _| {
            Ok(match start_at {
                0 => vec![User {
                    account_id: String::new(),
                    display_name: "Hidden".into(),
                    email_address: "t@example.com".into(),
                }],
                50 => vec![User {
                    account_id: "real".into(),
                    display_name: "Target".into(),
                    email_address: "T@example.com".into(),
                }],
                _ => Vec::new(),
            })
        });
    let mut admin = MockAccessAdmin::new();
    admin
        .expect_restore_access()
        .times(1)
        .returning(|account_id| {
            assert_eq!(account_id, "real");
            Ok(AdminResponse {
                status: 204,
                body: ResponseBody::Text(String::new()),
            })
        });

    let found = find_account_id(&directory, "t@example.com").await.unwrap();
    assert_eq!(found.as_deref(), Some("real"));

    let outcome = restore_user_access(&directory, &admin, "t@example.com", None)
        .await
        .unwrap();
    assert!(matches!(outcome, RestoreOutcome::Restored { ref account_id, .. } if account_id == "real"));
}

/// This test ensures that an unknown email scans until the first empty page.
#[tokio::test]
async fn test_find_account_returns_none_after_empty_page() {
    let directory = site_directory(120, 4);

    let found = find_account_id(&directory, "nobody@example.com").await.unwrap();

    assert_eq!(found, None);
}

/// This test ensures that a missing account is an explicit outcome, not an error, and no restore is attempted.
#[tokio::test]
async fn test_restore_reports_not_found_with_ticket_link() {
    let directory = site_directory(10, 2);
    let mut admin = MockAccessAdmin::new();
    admin.expect_restore_access().never();

    let outcome = restore_user_access(
        &directory,
        &admin,
        "external@partner.com",
        Some("https://example.atlassian.net/servicedesk/customer/portal/6"),
    )
    .await
    .unwrap();

    let RestoreOutcome::NotFound { message } = &outcome else {
        panic!("expected NotFound, got {outcome:?}");
    };
    assert!(message.contains("external@partner.com"));
    assert!(message.contains("hidden"));
    assert!(message.contains("[log a ticket](https://example.atlassian.net/servicedesk/customer/portal/6)"));
    assert_eq!(outcome.lines(), vec![message.clone()]);
}

/// This test ensures that a found account is restored and the status and JSON body are reported.
#[tokio::test]
async fn test_restore_reports_status_and_json_body() {
    let directory = site_directory(60, 2);
    let mut admin = MockAccessAdmin::new();
    admin
        .expect_restore_access()
        .times(1)
        .returning(|account_id| {
            assert_eq!(account_id, "acc-55");
            Ok(AdminResponse {
                status: 200,
                body: ResponseBody::Json(json!({"message": "restored"})),
            })
        });

    let outcome = restore_user_access(&directory, &admin, "user55@example.com", None)
        .await
        .unwrap();

    assert_eq!(
        outcome.lines(),
        vec![
            "Found accountId: acc-55".to_string(),
            "Response Status: 200".to_string(),
            r#"Response JSON: {"message":"restored"}"#.to_string(),
        ]
    );
}

/// This test ensures that a non-success restore status is reported rather than raised.
#[tokio::test]
async fn test_restore_reports_failure_status_as_text() {
    let directory = site_directory(5, 1);
    let mut admin = MockAccessAdmin::new();
    admin.expect_restore_access().returning(|_| {
        Ok(AdminResponse {
            status: 403,
            body: ResponseBody::Text("Forbidden".into()),
        })
    });

    let outcome = restore_user_access(&directory, &admin, "user0@example.com", None)
        .await
        .unwrap();

    let lines = outcome.lines();
    assert_eq!(lines[1], "Response Status: 403");
    assert_eq!(lines[2], "Response Text: Forbidden");
}
