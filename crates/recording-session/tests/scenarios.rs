use std::sync::Arc;
use std::time::Duration;

use actiontrail_core_types::{
    ActionType, Clock, ContextKey, ContextMessage, CoordinatorPort, EventPayload, ObserverEvent,
    ReplyStatus, SummaryEvent, TypedEvent,
};
use actiontrail_event_bus::{EventBus, InMemoryBus};
use dom_model::{Document, NodeSpec};
use pretty_assertions::assert_eq;
use recording_session::{
    ContextHandle, ContextRuntime, HostCapabilities, ObservationContext, SessionConfig,
    TransitionOutcome,
};
use snapshot_sanitizer::SnapshotAdapter;
use tokio::time::sleep;
use trail_coordinator::{
    CollectorSettings, CoordinatorConfig, CoordinatorHandle, CoordinatorRuntime, MemoryTransport,
    StaticSettings, FORWARD_BACK_QUALIFIER,
};

struct Harness {
    context: ContextHandle,
    coordinator: CoordinatorHandle,
    transport: Arc<MemoryTransport>,
    bus: Arc<InMemoryBus<ObserverEvent>>,
}

fn harness(spec: NodeSpec) -> Harness {
    let clock = Clock::anchored(1_700_000_000_000);
    let transport = Arc::new(MemoryTransport::new());
    let bus = InMemoryBus::<ObserverEvent>::new(64);
    let (coordinator, _) = CoordinatorRuntime::new(
        CoordinatorConfig::default(),
        Arc::new(StaticSettings::new(CollectorSettings::default())),
        transport.clone(),
        bus.clone(),
    )
    .with_clock(clock)
    .spawn();

    let doc = Document::from_spec("https://shop.test/", &spec).unwrap();
    let context = ObservationContext::new(
        ContextKey::from("tab-1"),
        doc,
        HostCapabilities::default(),
        SessionConfig::default(),
        SnapshotAdapter::default(),
    )
    .unwrap();
    let (context, _) =
        ContextRuntime::spawn(context, Arc::new(coordinator.clone()), bus.clone(), clock);
    Harness {
        context,
        coordinator,
        transport,
        bus,
    }
}

fn actions(delivered: &[SummaryEvent]) -> Vec<ActionType> {
    delivered.iter().map(|summary| summary.action).collect()
}

#[tokio::test(start_paused = true)]
async fn click_on_wrapper_is_attributed_to_inner_button() {
    let h = harness(
        NodeSpec::element("html").child(
            NodeSpec::element("body").child(
                NodeSpec::element("div")
                    .id("card")
                    .child(NodeSpec::element("button").id("buy").child(NodeSpec::text("Buy"))),
            ),
        ),
    );
    let mut observer = h.bus.subscribe();
    h.context.start(Some("shopping".into())).await.unwrap();
    let card = h.context.find_by_id("card").await.unwrap().unwrap();

    h.context.click(card).unwrap();
    sleep(Duration::from_millis(100)).await;
    h.context
        .mutate(move |doc| {
            let tooltip = doc.create_element("span");
            doc.append_child(card, tooltip)
        })
        .await
        .unwrap();

    let delivered = h.transport.wait_for(2).await;
    assert_eq!(actions(&delivered), vec![ActionType::TaskStart, ActionType::Click]);
    let click = &delivered[1];
    assert_eq!(click.event_target.target_id, "buy");
    assert_eq!(click.all_events.events().len(), 1);
    assert!(matches!(click.all_events.events()[0], TypedEvent::NodesAdded { .. }));
    assert_eq!(click.task_id, delivered[0].task_id);

    let mut saw_typed = false;
    while let Some(event) = observer.try_recv() {
        saw_typed |= matches!(event, ObserverEvent::Typed { .. });
    }
    assert!(saw_typed);
}

#[tokio::test(start_paused = true)]
async fn click_inside_nested_anchor_reports_link_once() {
    let h = harness(
        NodeSpec::element("html").child(
            NodeSpec::element("body").child(
                NodeSpec::element("a").id("docs").attr("href", "/docs").child(
                    NodeSpec::element("span")
                        .child(NodeSpec::element("span").id("label").child(NodeSpec::text("Docs"))),
                ),
            ),
        ),
    );
    h.context.start(None).await.unwrap();
    let label = h.context.find_by_id("label").await.unwrap().unwrap();
    h.context.click(label).unwrap();

    sleep(Duration::from_secs(3)).await;
    let delivered = h.transport.delivered();
    assert_eq!(actions(&delivered), vec![ActionType::TaskStart, ActionType::Click]);
    assert_eq!(delivered[1].event_target.target_id, "docs");
    assert_eq!(delivered[1].all_events, EventPayload::empty());
}

#[tokio::test(start_paused = true)]
async fn task_id_is_kept_across_pause_and_cleared_on_finish() {
    let h = harness(NodeSpec::element("html").child(NodeSpec::element("body")));
    assert_eq!(
        h.context.start(Some("compare prices".into())).await.unwrap(),
        TransitionOutcome::Started
    );
    sleep(Duration::from_millis(10)).await;
    let task_id = h.context.current_task_id().await.unwrap().unwrap();

    h.context.pause().await.unwrap();
    assert_eq!(
        h.context.resume(None).await.unwrap(),
        TransitionOutcome::Resumed {
            needs_task_id: false
        }
    );
    sleep(Duration::from_millis(10)).await;
    assert_eq!(h.context.current_task_id().await.unwrap(), Some(task_id.clone()));

    assert_eq!(h.context.finish().await.unwrap(), TransitionOutcome::Finished);
    assert_eq!(h.context.current_task_id().await.unwrap(), None);

    let delivered = h.transport.wait_for(2).await;
    assert_eq!(actions(&delivered), vec![ActionType::TaskStart, ActionType::TaskFinish]);
    assert!(delivered
        .iter()
        .all(|summary| summary.task_id.as_ref() == Some(&task_id)));
    assert_eq!(
        delivered[1].event_target.value.as_deref(),
        Some("compare prices")
    );
}

#[tokio::test(start_paused = true)]
async fn blur_long_after_link_click_reports_value_change() {
    let h = harness(
        NodeSpec::element("html").child(
            NodeSpec::element("body")
                .child(NodeSpec::element("a").id("next").attr("href", "/next"))
                .child(NodeSpec::element("input").id("name").attr("value", "foo")),
        ),
    );
    h.context.start(None).await.unwrap();
    let link = h.context.find_by_id("next").await.unwrap().unwrap();
    let input = h.context.find_by_id("name").await.unwrap().unwrap();

    h.context.click(link).unwrap();
    h.context.click(input).unwrap();
    h.context
        .mutate(move |doc| doc.set_value(input, "bar"))
        .await
        .unwrap();
    sleep(Duration::from_millis(2_000)).await;
    h.context.blur(input).unwrap();

    let delivered = h.transport.wait_for(3).await;
    assert_eq!(
        actions(&delivered),
        vec![ActionType::TaskStart, ActionType::Click, ActionType::InputChange]
    );
    assert_eq!(
        delivered[2].all_events,
        EventPayload::InputValue {
            old_value: "foo".into(),
            new_value: "bar".into(),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn blur_right_after_link_click_is_suppressed() {
    let h = harness(
        NodeSpec::element("html").child(
            NodeSpec::element("body")
                .child(NodeSpec::element("a").id("next").attr("href", "/next"))
                .child(NodeSpec::element("input").id("name")),
        ),
    );
    h.context.start(None).await.unwrap();
    let link = h.context.find_by_id("next").await.unwrap().unwrap();
    let input = h.context.find_by_id("name").await.unwrap().unwrap();

    h.context.click(input).unwrap();
    h.context
        .mutate(move |doc| doc.set_value(input, "typed"))
        .await
        .unwrap();
    h.context.click(link).unwrap();
    sleep(Duration::from_millis(100)).await;
    h.context.blur(input).unwrap();

    sleep(Duration::from_secs(2)).await;
    assert_eq!(
        actions(&h.transport.delivered()),
        vec![ActionType::TaskStart, ActionType::Click]
    );
}

#[tokio::test(start_paused = true)]
async fn history_traversal_right_after_resume_uses_fresh_page() {
    let h = harness(
        NodeSpec::element("html").child(
            NodeSpec::element("body")
                .child(NodeSpec::element("p").id("intro").child(NodeSpec::text("Welcome back"))),
        ),
    );
    h.context.start(None).await.unwrap();
    sleep(Duration::from_millis(10)).await;
    h.context.pause().await.unwrap();
    h.context.resume(None).await.unwrap();

    let reply = h
        .coordinator
        .dispatch(
            h.context.key(),
            ContextMessage::NavigationCommitted {
                url: "https://shop.test/previous".into(),
                qualifiers: vec![FORWARD_BACK_QUALIFIER.into()],
            },
        )
        .await
        .unwrap();
    assert_eq!(reply.status, ReplyStatus::Success);

    let delivered = h.transport.wait_for(2).await;
    assert_eq!(
        actions(&delivered),
        vec![ActionType::TaskStart, ActionType::GoBackOrForward]
    );
    assert!(delivered[1].page_html_content.contains("Welcome back"));
    assert_eq!(delivered[1].task_id, delivered[0].task_id);
}
