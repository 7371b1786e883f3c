use std::collections::BTreeMap;
use std::sync::Arc;

use actiontrail_core_types::{
    ActionTarget, ActionType, ContextKey, ContextMessage, CoordinatorPort, EventPayload,
    FieldValue, ObserverEvent, ReplyStatus, SummaryEvent,
};
use actiontrail_event_bus::{EventBus, InMemoryBus};
use pretty_assertions::assert_eq;
use trail_coordinator::{
    CollectorSettings, CoordinatorConfig, CoordinatorRuntime, MemoryTransport, StaticSettings,
};

fn summary(action: ActionType, at: u64, payload: EventPayload) -> SummaryEvent {
    SummaryEvent::new(action, at, ActionTarget::default(), payload, "<body>page</body>".into())
}

#[tokio::test]
async fn stamps_forwards_and_publishes() {
    let transport = Arc::new(MemoryTransport::new());
    let bus = InMemoryBus::<ObserverEvent>::new(16);
    let mut observer = bus.subscribe();
    let settings = Arc::new(StaticSettings::new(CollectorSettings {
        host: "collector.local".into(),
        port: 8080,
        mask_sensitive_data: false,
    }));
    let (handle, _task) = CoordinatorRuntime::new(
        CoordinatorConfig::default(),
        settings,
        transport.clone(),
        bus.clone(),
    )
    .spawn();

    let tab = ContextKey::from("tab-1");
    let started = handle
        .dispatch(
            &tab,
            ContextMessage::TaskStart(summary(ActionType::TaskStart, 100, EventPayload::empty())),
        )
        .await
        .unwrap();
    assert_eq!(started.status, ReplyStatus::Success);
    let task_id = started.task_id.unwrap();

    handle.dispatch(
        &tab,
        ContextMessage::Summary(summary(ActionType::Click, 200, EventPayload::empty())),
    );
    let asked = handle.dispatch(&tab, ContextMessage::GetTaskId).await.unwrap();
    assert_eq!(asked.task_id.as_ref(), Some(&task_id));

    let delivered = transport.wait_for(2).await;
    assert_eq!(
        delivered.iter().map(|s| s.action).collect::<Vec<_>>(),
        vec![ActionType::TaskStart, ActionType::Click]
    );
    assert!(delivered.iter().all(|s| s.task_id.as_ref() == Some(&task_id)));
    assert_eq!(
        transport.endpoints()[0].as_str(),
        "http://collector.local:8080/action-data"
    );

    let Some(ObserverEvent::Summary { context, summary }) = observer.recv().await else {
        panic!("expected a summary on the bus");
    };
    assert_eq!(context, tab);
    assert_eq!(summary.action, ActionType::TaskStart);
}

#[tokio::test]
async fn masks_when_enabled_after_settings_update() {
    let transport = Arc::new(MemoryTransport::new());
    let settings = Arc::new(StaticSettings::new(CollectorSettings::default()));
    let (handle, _task) = CoordinatorRuntime::new(
        CoordinatorConfig::default(),
        settings.clone(),
        transport.clone(),
        InMemoryBus::<ObserverEvent>::new(4),
    )
    .spawn();
    let tab = ContextKey::from("tab-2");

    let mut fields = BTreeMap::new();
    fields.insert("password".to_string(), FieldValue::Text("hunter2".into()));
    fields.insert("city".to_string(), FieldValue::Text("Oslo".into()));
    let submit = summary(ActionType::Submit, 10, EventPayload::FormFields(fields));

    handle.dispatch(&tab, ContextMessage::Submit(submit.clone())).await.unwrap();
    settings.replace(CollectorSettings {
        mask_sensitive_data: true,
        ..CollectorSettings::default()
    });
    handle.settings_updated();
    handle.dispatch(&tab, ContextMessage::Submit(submit)).await.unwrap();

    let delivered = transport.wait_for(2).await;
    let field = |index: usize, name: &str| match &delivered[index].all_events {
        EventPayload::FormFields(fields) => fields[name].clone(),
        other => panic!("unexpected payload {other:?}"),
    };
    assert_eq!(field(0, "password"), FieldValue::Text("hunter2".into()));
    assert_eq!(field(1, "password"), FieldValue::Text("***".into()));
    assert_eq!(field(1, "city"), FieldValue::Text("Oslo".into()));
}

#[tokio::test]
async fn missing_settings_fall_back_to_defaults() {
    let transport = Arc::new(MemoryTransport::new());
    let (handle, _task) = CoordinatorRuntime::new(
        CoordinatorConfig::default(),
        Arc::new(StaticSettings::empty()),
        transport.clone(),
        InMemoryBus::<ObserverEvent>::new(4),
    )
    .spawn();
    let tab = ContextKey::from("tab-3");
    handle
        .dispatch(
            &tab,
            ContextMessage::LinkClick(summary(ActionType::Click, 5_000, EventPayload::empty())),
        )
        .await
        .unwrap();
    let duplicate = handle
        .dispatch(
            &tab,
            ContextMessage::LinkClick(summary(ActionType::Click, 5_100, EventPayload::empty())),
        )
        .await
        .unwrap();
    assert_eq!(duplicate.status, ReplyStatus::Ignored);

    transport.wait_for(1).await;
    assert_eq!(
        transport.endpoints()[0].as_str(),
        "http://127.0.0.1:4934/action-data"
    );
}
