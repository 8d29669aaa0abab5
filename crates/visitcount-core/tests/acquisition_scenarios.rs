//! End-to-end page-load scenarios: session gate, remote chain, cache and
//! estimate wired together with a recording display target.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use visitcount_core::storage::{session_scope, LOCAL_SCOPE};
use visitcount_core::{
    Animator, CountAcquirer, CounterKey, CounterSource, CounterWidget, Estimator, HttpTransport,
    OpStyle, Operation, Origin, PersistentCache, RecordingTarget, SessionGatekeeper,
    SourceChainResolver, SqliteStore,
};

type Widget = CounterWidget<HttpTransport, SqliteStore, SqliteStore, Arc<RecordingTarget>>;

// ============================================================================
// Test Helpers
// ============================================================================

struct Browser {
    _dir: tempfile::TempDir,
    local: SqliteStore,
    session: SqliteStore,
}

impl Browser {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let local = SqliteStore::open_at(&dir.path().join("visitcount.db"), LOCAL_SCOPE).unwrap();
        let session = local.scoped(&session_scope("tab-1"));
        Self {
            _dir: dir,
            local,
            session,
        }
    }

    fn widget(&self, base_url: &str, target: &Arc<RecordingTarget>) -> Widget {
        let source = CounterSource {
            name: "primary".into(),
            base_url: base_url.into(),
            fields: vec!["value".into()],
            requires_proxy: false,
            style: OpStyle::VerbPath {
                read_verb: "get".into(),
                increment_verb: "hit".into(),
            },
        };
        let resolver = SourceChainResolver::new(HttpTransport::new(), vec![source], vec![])
            .with_timeout(Duration::from_millis(1000));
        let launch = NaiveDate::from_ymd_opt(2025, 7, 2).unwrap();
        let acquirer = CountAcquirer::new(
            SessionGatekeeper::new(self.session.clone()),
            resolver,
            PersistentCache::new(self.local.clone()),
            Estimator::deterministic(launch),
        );
        CounterWidget::new(acquirer, Animator::new(Some(Arc::clone(target))), 40).with_seed(1)
    }
}

fn site() -> CounterKey {
    CounterKey::new("example.com", "site-total")
}

const DEAD: &str = "http://127.0.0.1:1";

// ============================================================================
// Page loads
// ============================================================================

#[tokio::test]
async fn first_visit_increments_and_animates_up() {
    let mut server = mockito::Server::new_async().await;
    let hit = server
        .mock("GET", "/hit/example.com/site-total")
        .with_status(200)
        .with_body(r#"{"value": 101}"#)
        .expect(1)
        .create_async()
        .await;

    let browser = Browser::new();
    let target = Arc::new(RecordingTarget::new());
    let widget = browser.widget(&server.url(), &target);

    let load = widget.load(&site(), None).await;

    hit.assert_async().await;
    assert_eq!(load.acquisition.value, 101);
    assert_eq!(load.acquisition.operation, Operation::Increment);
    assert!(load.start < 101);

    let frames = target.frames();
    assert_eq!(frames[0], "…");
    let first_number: u64 = frames[1].parse().unwrap();
    assert!(first_number < 101);
    assert_eq!(target.last().as_deref(), Some("101"));

    assert!(!widget.acquirer().gatekeeper().should_increment(&site()));
    assert_eq!(widget.acquirer().cache().load(&site()), Some(101));
}

#[tokio::test]
async fn second_view_in_session_reads() {
    let mut server = mockito::Server::new_async().await;
    let hit = server
        .mock("GET", "/hit/example.com/site-total")
        .with_status(200)
        .with_body(r#"{"value": 101}"#)
        .expect(1)
        .create_async()
        .await;
    let get = server
        .mock("GET", "/get/example.com/site-total")
        .with_status(200)
        .with_body(r#"{"value": 104}"#)
        .expect(1)
        .create_async()
        .await;

    let browser = Browser::new();
    let target = Arc::new(RecordingTarget::new());

    browser.widget(&server.url(), &target).load(&site(), None).await;
    let second = browser.widget(&server.url(), &target).load(&site(), None).await;

    hit.assert_async().await;
    get.assert_async().await;
    assert_eq!(second.acquisition.operation, Operation::Read);
    assert_eq!(second.acquisition.value, 104);
}

#[tokio::test]
async fn offline_read_shows_cached_value() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/hit/example.com/site-total")
        .with_status(200)
        .with_body(r#"{"value": 77}"#)
        .create_async()
        .await;

    let browser = Browser::new();
    let target = Arc::new(RecordingTarget::new());
    browser.widget(&server.url(), &target).load(&site(), None).await;

    let offline_target = Arc::new(RecordingTarget::new());
    let offline = browser.widget(DEAD, &offline_target);
    let load = offline.load(&site(), None).await;

    assert_eq!(load.acquisition.operation, Operation::Read);
    assert_eq!(load.acquisition.origin, Origin::Cache);
    assert_eq!(load.acquisition.value, 77);
    assert_eq!(offline_target.last().as_deref(), Some("77"));
    assert_eq!(offline.acquirer().cache().load(&site()), Some(77));
}

#[tokio::test]
async fn offline_first_visit_counts_locally() {
    let browser = Browser::new();
    let target = Arc::new(RecordingTarget::new());
    let widget = browser.widget(DEAD, &target);

    let load = widget.load(&site(), None).await;

    assert_eq!(load.acquisition.operation, Operation::Increment);
    assert_eq!(load.acquisition.origin, Origin::LocalIncrement);
    assert_eq!(load.acquisition.value, 1);
    assert_eq!(target.last().as_deref(), Some("1"));
    // the session is not consumed by an unverified local count
    assert!(widget.acquirer().gatekeeper().should_increment(&site()));
}

#[tokio::test]
async fn offline_read_with_nothing_cached_falls_back_to_estimate() {
    let browser = Browser::new();
    let target = Arc::new(RecordingTarget::new());
    let widget = browser.widget(DEAD, &target);
    widget.acquirer().gatekeeper().mark_incremented(&site());

    let load = widget.load(&site(), None).await;

    assert_eq!(load.acquisition.origin, Origin::Estimate);
    assert!(load.acquisition.value >= 1);
}

#[tokio::test]
async fn missing_display_target_still_acquires() {
    let browser = Browser::new();
    let launch = NaiveDate::from_ymd_opt(2025, 7, 2).unwrap();
    let acquirer = CountAcquirer::new(
        SessionGatekeeper::new(browser.session.clone()),
        SourceChainResolver::new(HttpTransport::new(), vec![], vec![]),
        PersistentCache::new(browser.local.clone()),
        Estimator::deterministic(launch),
    );
    let widget = CounterWidget::new(acquirer, Animator::<RecordingTarget>::new(None), 40);

    let load = widget.load(&site(), None).await;

    assert_eq!(load.acquisition.value, 1);
    assert_eq!(widget.animator().current(), None);
}

#[tokio::test]
async fn page_tracking_runs_detached_after_display() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/hit/example.com/site-total")
        .with_status(200)
        .with_body(r#"{"value": 10}"#)
        .create_async()
        .await;
    let page_hit = server
        .mock("GET", "/hit/example.com/page-blog-hello")
        .with_status(200)
        .with_body(r#"{"value": 2}"#)
        .expect(1)
        .create_async()
        .await;

    let browser = Browser::new();
    let target = Arc::new(RecordingTarget::new());
    let widget = browser.widget(&server.url(), &target);
    let page = CounterKey::for_page("example.com", "/blog/hello/");

    let load = widget.load(&site(), Some(page.clone())).await;
    assert_eq!(target.last().as_deref(), Some("10"));

    load.tracking.unwrap().await.unwrap();
    page_hit.assert_async().await;
    assert!(!widget.acquirer().gatekeeper().should_increment(&page));
}
