//! Drives a [`Scenario`] through a context runtime and a coordinator.

use std::sync::Arc;
use std::time::Duration;

use actiontrail_core_types::{
    Clock, ContextKey, ContextMessage, CoordinatorPort, ObserverEvent, ReplyStatus, SummaryEvent,
};
use actiontrail_event_bus::{EventBus, InMemoryBus};
use anyhow::{Context, Result};
use dom_model::{Document, NodeKey};
use recording_session::{ContextHandle, ContextRuntime, HostCapabilities, ObservationContext};
use snapshot_sanitizer::{SanitizerPolicyHandle, SnapshotAdapter};
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};
use trail_coordinator::{
    CollectorTransport, CoordinatorHandle, CoordinatorRuntime, StaticSettings,
    FORWARD_BACK_QUALIFIER,
};

use crate::config::Config;
use crate::scenario::{Scenario, StepAction};

/// Extra time after the last after-window before shutting down.
const SETTLE_MARGIN_MS: u64 = 100;

#[derive(Debug, Default)]
pub struct ReplayReport {
    pub steps_applied: usize,
    pub steps_skipped: usize,
    pub typed_events: usize,
    /// Navigation commits the coordinator ignored or rejected.
    pub unaccepted_navigations: usize,
    /// Summaries accepted by the coordinator, in publication order.
    pub summaries: Vec<SummaryEvent>,
}

pub struct Replayer {
    config: Config,
    transport: Arc<dyn CollectorTransport>,
}

impl Replayer {
    pub fn new(config: Config, transport: Arc<dyn CollectorTransport>) -> Self {
        Self { config, transport }
    }

    pub async fn run(&self, scenario: &Scenario) -> Result<ReplayReport> {
        let clock = Clock::new();
        let bus = InMemoryBus::<ObserverEvent>::new(self.config.observer_capacity);
        let mut observer = bus.subscribe();
        let policy = SanitizerPolicyHandle::new(self.config.sanitizer.clone());

        let (coordinator, coordinator_task) = CoordinatorRuntime::new(
            self.config.coordinator.clone(),
            Arc::new(StaticSettings::new(self.config.collector.clone())),
            Arc::clone(&self.transport),
            bus.clone(),
        )
        .with_policy(policy.clone())
        .with_clock(clock)
        .spawn();

        let doc = Document::from_spec(scenario.url.clone(), &scenario.document)
            .context("Failed to build scenario document")?;
        let key = ContextKey::from(scenario.context.as_str());
        let context = ObservationContext::new(
            key.clone(),
            doc,
            HostCapabilities::default(),
            self.config.session.clone(),
            SnapshotAdapter::new(policy),
        )?;
        let (handle, context_task) =
            ContextRuntime::spawn(context, Arc::new(coordinator.clone()), bus.clone(), clock);

        info!(
            scenario = scenario.name.as_deref().unwrap_or("unnamed"),
            context = %key,
            steps = scenario.steps.len(),
            "Replaying scenario"
        );
        let mut report = ReplayReport::default();
        let started = Instant::now();
        for step in &scenario.steps {
            sleep_until(started + Duration::from_millis(step.at_ms)).await;
            if self.apply(&handle, &coordinator, &step.action, &mut report).await? {
                report.steps_applied += 1;
            } else {
                report.steps_skipped += 1;
            }
        }

        let correlator = &self.config.session.correlator;
        sleep(Duration::from_millis(
            correlator.click_delay_ms + correlator.window_ms + SETTLE_MARGIN_MS,
        ))
        .await;

        handle.close()?;
        drop(handle);
        context_task.await.context("Context runtime panicked")?;
        drop(coordinator);
        coordinator_task.await.context("Coordinator panicked")?;

        while let Some(event) = observer.try_recv() {
            match event {
                ObserverEvent::Typed { .. } => report.typed_events += 1,
                ObserverEvent::Summary { summary, .. } => report.summaries.push(summary),
            }
        }
        info!(
            applied = report.steps_applied,
            skipped = report.steps_skipped,
            summaries = report.summaries.len(),
            "Replay finished"
        );
        Ok(report)
    }

    /// Returns false when the step referenced an unknown element.
    async fn apply(
        &self,
        handle: &ContextHandle,
        coordinator: &CoordinatorHandle,
        action: &StepAction,
        report: &mut ReplayReport,
    ) -> Result<bool> {
        debug!(step = action.name(), "applying step");
        match action {
            StepAction::Start { description } => {
                let outcome = handle.start(description.clone()).await?;
                debug!(?outcome, "start");
            }
            StepAction::Pause => {
                handle.pause().await?;
            }
            StepAction::Resume { description } => {
                handle.resume(description.clone()).await?;
            }
            StepAction::Finish => {
                handle.finish().await?;
            }
            StepAction::Click { target } => match resolve(handle, target).await? {
                Some(node) => handle.click(node)?,
                None => return Ok(false),
            },
            StepAction::Dblclick { target } => match resolve(handle, target).await? {
                Some(node) => handle.dblclick(node)?,
                None => return Ok(false),
            },
            StepAction::Submit { target } => match resolve(handle, target).await? {
                Some(node) => handle.submit(node)?,
                None => return Ok(false),
            },
            StepAction::Blur { target } => match resolve(handle, target).await? {
                Some(node) => handle.blur(node)?,
                None => return Ok(false),
            },
            StepAction::Popstate => handle.popstate()?,
            StepAction::Append { parent, node } => {
                let Some(parent) = resolve(handle, parent).await? else {
                    return Ok(false);
                };
                let spec = node.clone();
                handle
                    .mutate(move |doc| doc.build(parent, &spec).map(|_| ()))
                    .await?;
            }
            StepAction::Remove { target } => {
                let Some(node) = resolve(handle, target).await? else {
                    return Ok(false);
                };
                handle.mutate(move |doc| doc.remove(node)).await?;
            }
            StepAction::SetAttribute {
                target,
                name,
                value,
            } => {
                let Some(node) = resolve(handle, target).await? else {
                    return Ok(false);
                };
                let (name, value) = (name.clone(), value.clone());
                handle
                    .mutate(move |doc| doc.set_attribute(node, &name, &value))
                    .await?;
            }
            StepAction::RemoveAttribute { target, name } => {
                let Some(node) = resolve(handle, target).await? else {
                    return Ok(false);
                };
                let name = name.clone();
                handle
                    .mutate(move |doc| doc.remove_attribute(node, &name))
                    .await?;
            }
            StepAction::SetText { target, text } => {
                let Some(node) = resolve(handle, target).await? else {
                    return Ok(false);
                };
                let text = text.clone();
                handle
                    .mutate(move |doc| doc.set_text_content(node, &text))
                    .await?;
            }
            StepAction::SetValue { target, value } => {
                let Some(node) = resolve(handle, target).await? else {
                    return Ok(false);
                };
                let value = value.clone();
                handle.mutate(move |doc| doc.set_value(node, value)).await?;
            }
            StepAction::SetChecked { target, checked } => {
                let Some(node) = resolve(handle, target).await? else {
                    return Ok(false);
                };
                let checked = *checked;
                handle
                    .mutate(move |doc| doc.set_checked(node, checked))
                    .await?;
            }
            StepAction::Navigate { url, forward_back } => {
                handle.navigate(url.clone())?;
                let qualifiers = if *forward_back {
                    vec![FORWARD_BACK_QUALIFIER.to_string()]
                } else {
                    Vec::new()
                };
                let reply = coordinator.dispatch(
                    handle.key(),
                    ContextMessage::NavigationCommitted {
                        url: url.clone(),
                        qualifiers,
                    },
                );
                match reply.await {
                    Ok(reply) if reply.status == ReplyStatus::Success => {
                        debug!(url = url.as_str(), "navigation commit handled");
                    }
                    Ok(reply) => {
                        report.unaccepted_navigations += 1;
                        let message = reply.message.as_deref().unwrap_or("");
                        if reply.status == ReplyStatus::Error {
                            warn!(url = url.as_str(), reason = message, "navigation commit rejected");
                        } else {
                            debug!(url = url.as_str(), reason = message, "navigation commit ignored");
                        }
                    }
                    Err(_) => {
                        report.unaccepted_navigations += 1;
                        warn!(url = url.as_str(), "coordinator dropped navigation reply");
                    }
                }
            }
            StepAction::Wait => {}
        }
        Ok(true)
    }
}

async fn resolve(handle: &ContextHandle, id: &str) -> Result<Option<NodeKey>> {
    let node = handle.find_by_id(id).await?;
    if node.is_none() {
        warn!(id, "scenario references an unknown element, step skipped");
    }
    Ok(node)
}
