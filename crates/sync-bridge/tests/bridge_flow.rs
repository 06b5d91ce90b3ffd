//! Whole-bridge flows: pick, notify, restore, toggle, delete.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use dom_adapter::{PageHandle, PageHost};
use pagehush_annotation_store::{AnnotationStore, MemoryAnnotationStore};
use pagehush_core_types::{
    AnnotationRecord, CapturedElement, LocatorSet, PageUrl, RecordId, TabId,
};
use pick_session::ChannelInspector;
use sync_bridge::{
    BackgroundContext, CommandRouter, FixedTabQuery, InjectedContext, MemoryBadgeSurface,
    MemoryNotificationSurface, NotifyCfg, PageCommand, PanelContext, BADGE_TEXT,
};
use visibility_applier::{RetryCfg, RetryOutcome};

const DOC: &str = r#"<html><body>
    <div id="ad-banner" class="ad">Buy now!</div>
    <p class="content">Article text</p>
</body></html>"#;

const TAB: TabId = TabId(1);

fn page_url() -> PageUrl {
    PageUrl::parse("https://news.example/story?id=42").unwrap()
}

struct Rig {
    page: PageHandle,
    inspector: Arc<ChannelInspector>,
    store: Arc<MemoryAnnotationStore>,
    router: Arc<CommandRouter>,
    badge: Arc<MemoryBadgeSurface>,
    notifier: Arc<MemoryNotificationSurface>,
    background: Arc<BackgroundContext>,
    injected: Arc<InjectedContext>,
}

async fn launch(
    doc: &str,
    store: Arc<MemoryAnnotationStore>,
    retry: RetryCfg,
    notify: NotifyCfg,
) -> Rig {
    let page = PageHost::launch(doc).unwrap();
    let inspector = ChannelInspector::new();
    let router = CommandRouter::new();
    let badge = Arc::new(MemoryBadgeSurface::new());
    let notifier = Arc::new(MemoryNotificationSurface::new());
    let background =
        BackgroundContext::spawn(&router, badge.clone(), notifier.clone(), notify);

    let store_dyn: Arc<dyn AnnotationStore> = store.clone();
    let injected = InjectedContext::attach(
        TAB,
        page_url(),
        page.clone(),
        inspector.clone(),
        store_dyn,
        Arc::clone(&router),
        retry,
    )
    .await;

    Rig {
        page,
        inspector,
        store,
        router,
        badge,
        notifier,
        background,
        injected,
    }
}

async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    if waited.is_err() {
        panic!("timed out waiting for {what}");
    }
}

fn seeded_record(css: &str, captured_at_ms: i64) -> AnnotationRecord {
    AnnotationRecord {
        record_id: RecordId::new(),
        element: CapturedElement {
            tag_name: "div".into(),
            id: Some(css.trim_start_matches('#').to_string()),
            class_name: None,
            text_preview: None,
            attributes: BTreeMap::new(),
            selectors: LocatorSet {
                css: css.into(),
                xpath: format!("//*[@id=\"{}\"]", css.trim_start_matches('#')),
                tag_class: None,
                attribute: Some(format!("[id=\"{}\"]", css.trim_start_matches('#'))),
            },
            is_hidden: true,
        },
        page_url: page_url(),
        captured_at_ms,
    }
}

#[tokio::test]
async fn pick_hides_persists_and_notifies() {
    let rig = launch(
        DOC,
        MemoryAnnotationStore::new(),
        RetryCfg::default(),
        NotifyCfg::default(),
    )
    .await;

    let ack = rig
        .router
        .send_command(TAB, PageCommand::StartPicking)
        .await
        .unwrap();
    assert!(ack.success);
    assert!(rig.injected.is_picking());

    let node = rig.page.first_match("#ad-banner").await.unwrap().unwrap();
    let click = rig.inspector.emit_click(node).unwrap();

    wait_until("record to be persisted", || rig.store.record_count() == 1).await;
    assert!(click.default_prevented());
    assert!(click.propagation_stopped());
    assert!(!rig.injected.is_picking());

    let records = rig.store.list_by_page(&page_url()).await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.element.selectors.css, "#ad-banner");
    assert_eq!(record.element.selectors.xpath, "//*[@id=\"ad-banner\"]");
    assert!(record.element.is_hidden);
    assert_eq!(record.page_url, page_url());

    // hidden and non-interactive on the live page
    assert_eq!(
        rig.page
            .style_of("#ad-banner", "visibility")
            .await
            .unwrap()
            .as_deref(),
        Some("hidden")
    );
    assert_eq!(
        rig.page
            .style_of("#ad-banner", "pointer-events")
            .await
            .unwrap()
            .as_deref(),
        Some("none")
    );

    // exactly one completion indicator for this tab
    wait_until("completion indicator", || rig.notifier.live_count() == 1).await;
    assert_eq!(rig.badge.badge_text(TAB).as_deref(), Some(BADGE_TEXT));
    assert_eq!(rig.background.pending_count(), 1);
}

#[tokio::test]
async fn undismissed_indicator_auto_clears() {
    let rig = launch(
        DOC,
        MemoryAnnotationStore::new(),
        RetryCfg::default(),
        NotifyCfg { auto_clear_ms: 80 },
    )
    .await;

    rig.router
        .send_command(TAB, PageCommand::StartPicking)
        .await
        .unwrap();
    let node = rig.page.first_match("#ad-banner").await.unwrap().unwrap();
    rig.inspector.emit_click(node).unwrap();

    wait_until("completion indicator", || rig.notifier.live_count() == 1).await;
    wait_until("indicator auto-clear", || {
        rig.notifier.live_count() == 0 && rig.badge.badge_text(TAB).is_none()
    })
    .await;
    assert_eq!(rig.background.pending_count(), 0);
}

#[tokio::test]
async fn two_picks_get_independent_records_and_indicators() {
    let rig = launch(
        DOC,
        MemoryAnnotationStore::new(),
        RetryCfg::default(),
        NotifyCfg::default(),
    )
    .await;

    rig.router
        .send_command(TAB, PageCommand::StartPicking)
        .await
        .unwrap();
    let banner = rig.page.first_match("#ad-banner").await.unwrap().unwrap();
    rig.inspector.emit_click(banner).unwrap();
    wait_until("first record", || rig.store.record_count() == 1).await;

    rig.router
        .send_command(TAB, PageCommand::StartPicking)
        .await
        .unwrap();
    let content = rig.page.first_match("p.content").await.unwrap().unwrap();
    rig.inspector.emit_click(content).unwrap();
    wait_until("second record", || rig.store.record_count() == 2).await;

    let records = rig.store.list_by_page(&page_url()).await.unwrap();
    assert_ne!(records[0].record_id, records[1].record_id);

    wait_until("both indicators", || rig.notifier.live_count() == 2).await;
    let ids = rig.notifier.live_ids();

    rig.background.dismiss(&ids[0]).await;
    assert!(!rig.notifier.is_live(&ids[0]));
    assert!(rig.notifier.is_live(&ids[1]));
    // the other pick still owns the badge
    assert_eq!(rig.badge.badge_text(TAB).as_deref(), Some(BADGE_TEXT));
}

#[tokio::test]
async fn stored_hides_reapply_on_load_even_for_late_mounts() {
    let store = MemoryAnnotationStore::new();
    store.upsert_new(seeded_record("#late-ad", 100)).await.unwrap();

    let rig = launch(
        DOC,
        store,
        RetryCfg {
            max_attempts: 10,
            delay_ms: 40,
        },
        NotifyCfg::default(),
    )
    .await;

    // the annotated element mounts a few retry intervals after load
    let page = rig.page.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(130)).await;
        page.mount_fragment_at("body", r#"<div id="late-ad">late ad</div>"#)
            .await
            .unwrap();
    });

    let outcomes = rig.injected.await_restore().await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].0, "#late-ad");
    assert_eq!(outcomes[0].1, Some(RetryOutcome::Applied { matched: 1 }));

    assert_eq!(
        rig.page
            .style_of("#late-ad", "visibility")
            .await
            .unwrap()
            .as_deref(),
        Some("hidden")
    );
}

#[tokio::test]
async fn restore_gives_up_when_the_element_never_mounts() {
    let store = MemoryAnnotationStore::new();
    store.upsert_new(seeded_record("#never", 100)).await.unwrap();

    let rig = launch(
        DOC,
        store,
        RetryCfg {
            max_attempts: 3,
            delay_ms: 10,
        },
        NotifyCfg::default(),
    )
    .await;

    let outcomes = rig.injected.await_restore().await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].1, Some(RetryOutcome::Exhausted));
}

#[tokio::test]
async fn panel_lists_live_additions_without_double_rendering_toggles() {
    let rig = launch(
        DOC,
        MemoryAnnotationStore::new(),
        RetryCfg::default(),
        NotifyCfg::default(),
    )
    .await;

    let tabs = FixedTabQuery::new(TAB, page_url());
    let store_dyn: Arc<dyn AnnotationStore> = rig.store.clone();
    let panel = PanelContext::open(
        &tabs,
        store_dyn,
        Arc::clone(&rig.router),
        &rig.background,
    )
    .await
    .unwrap();
    assert!(panel.records().is_empty());

    panel.start_picking().await.unwrap();
    let node = rig.page.first_match("#ad-banner").await.unwrap().unwrap();
    rig.inspector.emit_click(node).unwrap();

    wait_until("panel to see the addition", || panel.records().len() == 1).await;

    // toggling mutates, and mutations must not re-render as new rows
    let found = panel.set_record_hidden("#ad-banner", false).await.unwrap();
    assert!(found);
    tokio::time::sleep(Duration::from_millis(30)).await;
    let records = panel.records();
    assert_eq!(records.len(), 1);
    assert!(!records[0].element.is_hidden);
    assert_eq!(
        rig.page
            .style_of("#ad-banner", "visibility")
            .await
            .unwrap()
            .as_deref(),
        Some("visible")
    );

    panel.close();
}

#[tokio::test]
async fn opening_the_panel_acknowledges_the_tab_indicator() {
    let rig = launch(
        DOC,
        MemoryAnnotationStore::new(),
        RetryCfg::default(),
        NotifyCfg::default(),
    )
    .await;

    rig.router
        .send_command(TAB, PageCommand::StartPicking)
        .await
        .unwrap();
    let node = rig.page.first_match("#ad-banner").await.unwrap().unwrap();
    rig.inspector.emit_click(node).unwrap();
    wait_until("completion indicator", || rig.notifier.live_count() == 1).await;

    let tabs = FixedTabQuery::new(TAB, page_url());
    let store_dyn: Arc<dyn AnnotationStore> = rig.store.clone();
    let panel = PanelContext::open(
        &tabs,
        store_dyn,
        Arc::clone(&rig.router),
        &rig.background,
    )
    .await
    .unwrap();

    assert_eq!(rig.notifier.live_count(), 0);
    assert_eq!(rig.badge.badge_text(TAB), None);
    panel.close();
}

#[tokio::test]
async fn deleting_a_hidden_record_restores_first_and_stays_gone_on_reload() {
    let store = MemoryAnnotationStore::new();
    store
        .upsert_new(seeded_record("#ad-banner", 100))
        .await
        .unwrap();

    let rig = launch(
        DOC,
        store.clone(),
        RetryCfg {
            max_attempts: 3,
            delay_ms: 10,
        },
        NotifyCfg::default(),
    )
    .await;

    // the element is present, so the load pass hides it immediately
    let outcomes = rig.injected.await_restore().await;
    assert_eq!(outcomes[0].1, Some(RetryOutcome::Applied { matched: 1 }));

    let tabs = FixedTabQuery::new(TAB, page_url());
    let store_dyn: Arc<dyn AnnotationStore> = store.clone();
    let panel = PanelContext::open(
        &tabs,
        store_dyn,
        Arc::clone(&rig.router),
        &rig.background,
    )
    .await
    .unwrap();

    assert!(panel.delete_record("#ad-banner").await.unwrap());
    assert_eq!(
        rig.page
            .style_of("#ad-banner", "visibility")
            .await
            .unwrap()
            .as_deref(),
        Some("visible")
    );
    assert_eq!(store.record_count(), 0);
    assert!(panel.records().is_empty());
    panel.close();
    rig.injected.detach();

    // a reload finds nothing to re-hide
    let store_dyn: Arc<dyn AnnotationStore> = store.clone();
    let reloaded = InjectedContext::attach(
        TAB,
        page_url(),
        rig.page.clone(),
        ChannelInspector::new(),
        store_dyn,
        Arc::clone(&rig.router),
        RetryCfg::default(),
    )
    .await;
    assert!(reloaded.await_restore().await.is_empty());
    assert_eq!(
        rig.page
            .style_of("#ad-banner", "visibility")
            .await
            .unwrap()
            .as_deref(),
        Some("visible")
    );
}

#[tokio::test]
async fn set_visibility_acks_reflect_match_presence() {
    let rig = launch(
        DOC,
        MemoryAnnotationStore::new(),
        RetryCfg::default(),
        NotifyCfg::default(),
    )
    .await;

    let ack = rig
        .router
        .send_command(
            TAB,
            PageCommand::SetVisibility {
                css_locator: "#ad-banner".into(),
                hidden: true,
            },
        )
        .await
        .unwrap();
    assert!(ack.success);

    let ack = rig
        .router
        .send_command(
            TAB,
            PageCommand::SetVisibility {
                css_locator: "#missing".into(),
                hidden: true,
            },
        )
        .await
        .unwrap();
    assert!(!ack.success);
}
