use std::sync::Arc;

use actiontrail_core_types::{
    Clock, ContextKey, ContextMessage, CoordinatorPort, CoordinatorReply, ObserverEvent,
    ReplyReceiver, SummaryEvent,
};
use actiontrail_event_bus::EventBus;
use snapshot_sanitizer::{SanitizerPolicyHandle, SensitiveDataMasker};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};
use url::Url;

use crate::settings::{CollectorSettings, SettingsStore};
use crate::state::{CoordinatorConfig, CoordinatorState};
use crate::transport::CollectorTransport;

pub type ObserverBus = Arc<dyn EventBus<ObserverEvent>>;

enum Command {
    Dispatch {
        context: ContextKey,
        message: ContextMessage,
        reply: oneshot::Sender<CoordinatorReply>,
    },
    SettingsUpdated,
}

/// Cheap, cloneable entry point into the coordinator task.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl CoordinatorHandle {
    /// Drop the cached settings; the next forward reloads them.
    pub fn settings_updated(&self) {
        if self.tx.send(Command::SettingsUpdated).is_err() {
            warn!(target: "coordinator", "settings update after coordinator stopped");
        }
    }
}

impl CoordinatorPort for CoordinatorHandle {
    fn dispatch(&self, context: &ContextKey, message: ContextMessage) -> ReplyReceiver {
        let (reply, rx) = oneshot::channel();
        let command = Command::Dispatch {
            context: context.clone(),
            message,
            reply,
        };
        if let Err(mpsc::error::SendError(command)) = self.tx.send(command) {
            if let Command::Dispatch { reply, message, .. } = command {
                warn!(target: "coordinator", message = message.name(), "coordinator stopped");
                let _ = reply.send(CoordinatorReply::error("coordinator stopped"));
            }
        }
        rx
    }
}

/// Owns the coordinator state and its outbound ports.
pub struct CoordinatorRuntime {
    state: CoordinatorState,
    settings: Arc<dyn SettingsStore>,
    cached: Option<CollectorSettings>,
    transport: Arc<dyn CollectorTransport>,
    bus: ObserverBus,
    policy: SanitizerPolicyHandle,
    clock: Clock,
    deliveries: JoinSet<()>,
}

impl CoordinatorRuntime {
    pub fn new(
        config: CoordinatorConfig,
        settings: Arc<dyn SettingsStore>,
        transport: Arc<dyn CollectorTransport>,
        bus: ObserverBus,
    ) -> Self {
        Self {
            state: CoordinatorState::new(config),
            settings,
            cached: None,
            transport,
            bus,
            policy: SanitizerPolicyHandle::default(),
            clock: Clock::new(),
            deliveries: JoinSet::new(),
        }
    }

    pub fn with_policy(mut self, policy: SanitizerPolicyHandle) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Start the coordinator task. It stops once every handle is dropped and
    /// in-flight deliveries have finished.
    pub fn spawn(self) -> (CoordinatorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(rx));
        (CoordinatorHandle { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        info!(target: "coordinator", "coordinator started");
        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Dispatch { context, message, reply }) => {
                        self.dispatch(context, message, reply).await
                    }
                    Some(Command::SettingsUpdated) => {
                        debug!(target: "coordinator", "settings cache invalidated");
                        self.cached = None;
                    }
                    None => break,
                },
                Some(_) = self.deliveries.join_next(), if !self.deliveries.is_empty() => {}
            }
        }
        while self.deliveries.join_next().await.is_some() {}
        info!(target: "coordinator", "coordinator stopped");
    }

    async fn dispatch(
        &mut self,
        context: ContextKey,
        message: ContextMessage,
        reply: oneshot::Sender<CoordinatorReply>,
    ) {
        let name = message.name();
        let handled = self.state.handle(&context, message, self.clock.now_ms());
        debug!(
            target: "coordinator",
            %context,
            message = name,
            status = ?handled.reply.status,
            "message handled"
        );
        if reply.send(handled.reply).is_err() {
            debug!(target: "coordinator", %context, message = name, "sender dropped reply");
        }
        if let Some(summary) = handled.forward {
            self.forward(context, summary).await;
        }
    }

    async fn forward(&mut self, context: ContextKey, mut summary: SummaryEvent) {
        let settings = self.settings().await;
        if settings.mask_sensitive_data {
            SensitiveDataMasker::from_policy(&self.policy.snapshot()).mask_summary(&mut summary);
        }

        match settings.endpoint() {
            Ok(endpoint) => self.deliver(endpoint, summary.clone()),
            Err(err) => {
                warn!(target: "transport", %err, "summary not delivered");
            }
        }

        let event = ObserverEvent::Summary { context, summary };
        if let Err(err) = self.bus.publish(event).await {
            warn!(target: "coordinator", %err, "observer publish failed");
        }
    }

    fn deliver(&mut self, endpoint: Url, summary: SummaryEvent) {
        let transport = Arc::clone(&self.transport);
        self.deliveries.spawn(async move {
            match transport.deliver(&endpoint, &summary).await {
                Ok(()) => debug!(
                    target: "transport",
                    action = summary.action.as_str(),
                    at = summary.action_timestamp,
                    "summary delivered"
                ),
                Err(err) => warn!(
                    target: "transport",
                    %endpoint,
                    action = summary.action.as_str(),
                    %err,
                    "summary delivery failed"
                ),
            }
        });
    }

    async fn settings(&mut self) -> CollectorSettings {
        if let Some(settings) = &self.cached {
            return settings.clone();
        }
        let settings = match self.settings.load().await {
            Ok(settings) => settings,
            Err(err) => {
                warn!(target: "coordinator", %err, "using default collector settings");
                CollectorSettings::default()
            }
        };
        self.cached = Some(settings.clone());
        settings
    }
}
