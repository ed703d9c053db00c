//! End-to-end runs of the poll cycle against fake mail and chat services.

mod common;

use std::time::Duration;

use common::{mail, TestHarness, LINKED_AT};
use subscrip_notify::db::parse_timestamp;
use subscrip_notify::PollSettings;

const BILLING_QUERY: &str = "from:billing@service.example";
const BILLING_SEARCH: &str = "from:billing@service.example newer_than:2d";

#[tokio::test]
async fn billing_example_sends_once() {
    let h = TestHarness::new();
    h.link_account("A", "U-A");
    let filter_id = h.add_filter("A", "請求", BILLING_QUERY, true);
    h.mailbox.deliver(
        &TestHarness::refresh_token("A"),
        BILLING_SEARCH,
        vec![mail("M1", "ご請求のお知らせ", "billing@service.example", "今月のご請求額は")],
    );

    let first = h.poll().await;
    assert_eq!(first.processed, 1);
    let row = h.sent("A", "M1").expect("M1 should be recorded");
    assert_eq!(row.filter_id, filter_id);
    assert_eq!(
        h.messenger.pushes_to("U-A"),
        vec!["【請求】\n件名: ご請求のお知らせ\n差出人: billing@service.example\n日時: Wed, 4 Mar 2026 08:30:00 +0900\n概要: 今月のご請求額は".to_string()]
    );

    let second = h.poll().await;
    assert_eq!(second.processed, 0);
    assert_eq!(h.sent_count("A"), 1);
    assert_eq!(h.messenger.pushes().len(), 1);
}

#[tokio::test]
async fn failed_push_is_retried_next_cycle() {
    let h = TestHarness::new();
    h.link_account("A", "U-A");
    h.add_filter("A", "Billing", BILLING_QUERY, true);
    h.mailbox.deliver(
        &TestHarness::refresh_token("A"),
        BILLING_SEARCH,
        vec![mail("M1", "Invoice", "billing@service.example", "")],
    );

    h.messenger.set_unreachable("U-A", true);
    assert_eq!(h.poll().await.processed, 0);
    assert!(h.sent("A", "M1").is_none());

    h.messenger.set_unreachable("U-A", false);
    assert_eq!(h.poll().await.processed, 1);
    assert!(h.sent("A", "M1").is_some());
}

#[tokio::test]
async fn revoked_credential_is_isolated_to_its_account() {
    let h = TestHarness::new();
    for id in ["A", "B", "C"] {
        h.link_account(id, &format!("U-{}", id));
        h.add_filter(id, "Billing", BILLING_QUERY, true);
        h.mailbox.deliver(
            &TestHarness::refresh_token(id),
            BILLING_SEARCH,
            vec![mail(&format!("M-{}", id), "Invoice", "billing@service.example", "")],
        );
    }
    h.oauth.revoke(&TestHarness::refresh_token("B"));

    let report = h.poll().await;

    assert_eq!(report.processed, 2);
    assert_eq!(report.accounts_total, 3);
    assert_eq!(report.accounts_failed, 1);
    assert_eq!(h.messenger.pushes_to("U-A").len(), 1);
    assert!(h.messenger.pushes_to("U-B").is_empty());
    assert_eq!(h.messenger.pushes_to("U-C").len(), 1);
    assert_eq!(h.account("B").last_checked_at.as_deref(), Some(LINKED_AT));
}

#[tokio::test]
async fn checkpoint_advances_without_matches() {
    let h = TestHarness::new();
    h.link_account("A", "U-A");
    h.add_filter("A", "Billing", BILLING_QUERY, true);

    let report = h.poll().await;

    assert_eq!(report.processed, 0);
    let checked = h.account("A").last_checked().unwrap();
    assert!(checked > parse_timestamp(LINKED_AT).unwrap());
}

#[tokio::test]
async fn disabled_filters_are_not_searched() {
    let h = TestHarness::new();
    h.link_account("A", "U-A");
    h.add_filter("A", "Off", "label:off", false);
    h.add_filter("A", "Billing", BILLING_QUERY, true);

    h.poll().await;

    assert_eq!(h.mailbox.searches(), vec![BILLING_SEARCH.to_string()]);
}

#[tokio::test]
async fn access_credential_is_reused_across_cycles() {
    let h = TestHarness::new();
    h.link_account("A", "U-A");
    h.add_filter("A", "Billing", BILLING_QUERY, true);

    h.poll().await;
    h.poll().await;

    assert_eq!(h.oauth.refresh_count(), 1);
    assert!(h.account("A").access_token_enc.is_some());
}

#[tokio::test]
async fn custom_recency_window_and_cap() {
    let h = TestHarness::with_settings(PollSettings {
        recency_window: "newer_than:1d".to_string(),
        max_results: 2,
        ..PollSettings::default()
    });
    h.link_account("A", "U-A");
    h.add_filter("A", "Billing", BILLING_QUERY, true);
    h.mailbox.deliver(
        &TestHarness::refresh_token("A"),
        "from:billing@service.example newer_than:1d",
        vec![
            mail("M1", "one", "billing@service.example", ""),
            mail("M2", "two", "billing@service.example", ""),
            mail("M3", "three", "billing@service.example", ""),
        ],
    );

    assert_eq!(h.poll().await.processed, 2);
}

#[tokio::test]
async fn many_accounts_with_bounded_concurrency() {
    let h = TestHarness::with_settings(PollSettings {
        concurrency: 3,
        account_timeout: Duration::from_secs(5),
        ..PollSettings::default()
    });
    for n in 0..10 {
        let id = format!("acct-{}", n);
        h.link_account(&id, &format!("U-{}", n));
        h.add_filter(&id, "Billing", BILLING_QUERY, true);
        h.mailbox.deliver(
            &TestHarness::refresh_token(&id),
            BILLING_SEARCH,
            vec![mail("same-id", "Invoice", "billing@service.example", "")],
        );
    }

    let report = h.poll().await;

    assert_eq!(report.processed, 10);
    assert_eq!(report.accounts_failed, 0);
    for n in 0..10 {
        assert_eq!(h.sent_count(&format!("acct-{}", n)), 1);
    }
}
