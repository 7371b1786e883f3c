use std::collections::HashMap;
use std::sync::Arc;

use actiontrail_core_types::{
    Clock, ContextKey, ContextMessage, CoordinatorPort, ObserverEvent, TaskId,
};
use actiontrail_event_bus::EventBus;
use dom_model::{Document, DomResult, NodeId, NodeKey};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::context::{Effect, ObservationContext, TimerKind};
use crate::errors::{RuntimeError, RuntimeResult};
use crate::state::{SessionCommand, TransitionOutcome};

type ReadFn = Box<dyn FnOnce(&ObservationContext) + Send>;
type MutateFn = Box<dyn FnOnce(&mut Document) -> DomResult<()> + Send>;

enum ContextCommand {
    Control {
        command: SessionCommand,
        reply: oneshot::Sender<TransitionOutcome>,
    },
    Click(NodeKey),
    DblClick(NodeKey),
    Submit(NodeKey),
    Blur(NodeKey),
    Popstate,
    Navigate(String),
    Mutate {
        change: MutateFn,
        reply: oneshot::Sender<DomResult<()>>,
    },
    Read(ReadFn),
    NodeId {
        node: NodeKey,
        reply: oneshot::Sender<NodeId>,
    },
    Timer {
        timer: TimerKind,
        generation: u64,
    },
    TaskAssigned(Option<TaskId>),
    Close,
}

struct ArmedTimer {
    generation: u64,
    task: JoinHandle<()>,
}

/// Client side of a running context.
#[derive(Clone)]
pub struct ContextHandle {
    key: ContextKey,
    tx: mpsc::UnboundedSender<ContextCommand>,
}

impl ContextHandle {
    pub fn key(&self) -> &ContextKey {
        &self.key
    }

    fn send(&self, command: ContextCommand) -> RuntimeResult<()> {
        self.tx.send(command).map_err(|_| RuntimeError::Stopped)
    }

    async fn control(&self, command: SessionCommand) -> RuntimeResult<TransitionOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(ContextCommand::Control { command, reply })?;
        rx.await.map_err(|_| RuntimeError::Stopped)
    }

    pub async fn start(&self, description: Option<String>) -> RuntimeResult<TransitionOutcome> {
        self.control(SessionCommand::Start { description }).await
    }

    pub async fn pause(&self) -> RuntimeResult<TransitionOutcome> {
        self.control(SessionCommand::Pause).await
    }

    pub async fn resume(&self, description: Option<String>) -> RuntimeResult<TransitionOutcome> {
        self.control(SessionCommand::Resume { description }).await
    }

    pub async fn finish(&self) -> RuntimeResult<TransitionOutcome> {
        self.control(SessionCommand::Finish).await
    }

    pub fn click(&self, node: NodeKey) -> RuntimeResult<()> {
        self.send(ContextCommand::Click(node))
    }

    pub fn dblclick(&self, node: NodeKey) -> RuntimeResult<()> {
        self.send(ContextCommand::DblClick(node))
    }

    pub fn submit(&self, node: NodeKey) -> RuntimeResult<()> {
        self.send(ContextCommand::Submit(node))
    }

    pub fn blur(&self, node: NodeKey) -> RuntimeResult<()> {
        self.send(ContextCommand::Blur(node))
    }

    pub fn popstate(&self) -> RuntimeResult<()> {
        self.send(ContextCommand::Popstate)
    }

    /// Update the document URL after a navigation in this context.
    pub fn navigate(&self, url: impl Into<String>) -> RuntimeResult<()> {
        self.send(ContextCommand::Navigate(url.into()))
    }

    /// Apply a change to the observed tree; its records are buffered at once.
    pub async fn mutate<F>(&self, change: F) -> RuntimeResult<()>
    where
        F: FnOnce(&mut Document) -> DomResult<()> + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        self.send(ContextCommand::Mutate {
            change: Box::new(change),
            reply,
        })?;
        rx.await.map_err(|_| RuntimeError::Stopped)?.map_err(RuntimeError::from)
    }

    /// Run `query` against the context and return its result.
    pub async fn read<F, R>(&self, query: F) -> RuntimeResult<R>
    where
        F: FnOnce(&ObservationContext) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        self.send(ContextCommand::Read(Box::new(move |ctx| {
            let _ = reply.send(query(ctx));
        })))?;
        rx.await.map_err(|_| RuntimeError::Stopped)
    }

    pub async fn find_by_id(&self, id: &str) -> RuntimeResult<Option<NodeKey>> {
        let id = id.to_string();
        self.read(move |ctx| ctx.document().find_by_id(&id)).await
    }

    pub async fn current_task_id(&self) -> RuntimeResult<Option<TaskId>> {
        self.read(|ctx| ctx.current_task_id().cloned()).await
    }

    pub async fn page_content(&self) -> RuntimeResult<String> {
        self.read(|ctx| ctx.page_content()).await
    }

    pub async fn node_id(&self, node: NodeKey) -> RuntimeResult<NodeId> {
        let (reply, rx) = oneshot::channel();
        self.send(ContextCommand::NodeId { node, reply })?;
        rx.await.map_err(|_| RuntimeError::Stopped)
    }

    pub async fn highlight(&self, id: NodeId) -> RuntimeResult<Option<Effect>> {
        self.read(move |ctx| ctx.highlight(id)).await
    }

    pub async fn inspect(&self, id: NodeId) -> RuntimeResult<Option<Effect>> {
        self.read(move |ctx| ctx.inspect(id)).await
    }

    /// Tell the coordinator the context is gone and stop the runtime.
    pub fn close(&self) -> RuntimeResult<()> {
        self.send(ContextCommand::Close)
    }
}

/// Drives one [`ObservationContext`] from a tokio task.
pub struct ContextRuntime {
    context: ObservationContext,
    coordinator: Arc<dyn CoordinatorPort>,
    bus: Arc<dyn EventBus<ObserverEvent>>,
    clock: Clock,
    timers: HashMap<TimerKind, ArmedTimer>,
    next_generation: u64,
    inbox: mpsc::WeakUnboundedSender<ContextCommand>,
}

impl ContextRuntime {
    pub fn spawn(
        context: ObservationContext,
        coordinator: Arc<dyn CoordinatorPort>,
        bus: Arc<dyn EventBus<ObserverEvent>>,
        clock: Clock,
    ) -> (ContextHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ContextHandle {
            key: context.key().clone(),
            tx: tx.clone(),
        };
        let runtime = Self {
            context,
            coordinator,
            bus,
            clock,
            timers: HashMap::new(),
            next_generation: 0,
            inbox: tx.downgrade(),
        };
        drop(tx);
        let task = tokio::spawn(runtime.run(rx));
        (handle, task)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ContextCommand>) {
        let key = self.context.key().clone();
        info!(target: "recording.session", context = %key, "context runtime started");
        while let Some(command) = rx.recv().await {
            if !self.handle(command).await {
                break;
            }
        }
        for (_, timer) in self.timers.drain() {
            timer.task.abort();
        }
        info!(target: "recording.session", context = %key, "context runtime stopped");
    }

    async fn handle(&mut self, command: ContextCommand) -> bool {
        let now = self.clock.now_ms();
        let effects = match command {
            ContextCommand::Control { command, reply } => {
                let (outcome, effects) = self.context.control(command, now);
                let _ = reply.send(outcome);
                effects
            }
            ContextCommand::Click(node) => self.context.click(node, now),
            ContextCommand::DblClick(node) => self.context.dblclick(node, now),
            ContextCommand::Submit(node) => self.context.submit(node, now),
            ContextCommand::Blur(node) => self.context.blur(node, now),
            ContextCommand::Popstate => self.context.popstate(now),
            ContextCommand::Navigate(url) => {
                self.context.set_url(url);
                Vec::new()
            }
            ContextCommand::Mutate { change, reply } => {
                let _ = reply.send(self.context.mutate(now, change));
                Vec::new()
            }
            ContextCommand::Read(query) => {
                query(&self.context);
                Vec::new()
            }
            ContextCommand::NodeId { node, reply } => {
                let _ = reply.send(self.context.node_id(node));
                Vec::new()
            }
            ContextCommand::Timer { timer, generation } => {
                match self.timers.get(&timer) {
                    Some(armed) if armed.generation == generation => {
                        self.timers.remove(&timer);
                        self.context.timer_fired(timer, now)
                    }
                    _ => {
                        debug!(target: "recording.session", ?timer, generation, "stale timer ignored");
                        Vec::new()
                    }
                }
            }
            ContextCommand::TaskAssigned(task_id) => {
                self.context.task_assigned(task_id);
                Vec::new()
            }
            ContextCommand::Close => {
                let _ = self
                    .coordinator
                    .dispatch(self.context.key(), ContextMessage::Closed);
                return false;
            }
        };
        for effect in effects {
            self.apply(effect).await;
        }
        true
    }

    async fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Send(message) => self.send(message),
            Effect::Publish(event) => {
                if let Err(err) = self.bus.publish(event).await {
                    warn!(target: "recording.session", %err, "observer publish failed");
                }
            }
            Effect::Schedule { timer, at } => self.schedule(timer, at),
            Effect::Cancel(timer) => {
                if let Some(armed) = self.timers.remove(&timer) {
                    armed.task.abort();
                }
            }
            Effect::Highlight { node, selector } => {
                info!(target: "recording.session", node = node.0, %selector, "highlight");
            }
            Effect::Inspect { node, selector, .. } => {
                info!(target: "recording.session", node = node.0, %selector, "inspect");
            }
        }
    }

    fn send(&self, message: ContextMessage) {
        let wants_task_id = message.wants_task_id();
        let reply = self.coordinator.dispatch(self.context.key(), message);
        if !wants_task_id {
            return;
        }
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            match reply.await {
                Ok(reply) => {
                    if let Some(tx) = inbox.upgrade() {
                        let _ = tx.send(ContextCommand::TaskAssigned(reply.task_id));
                    }
                }
                Err(_) => warn!(target: "recording.session", "coordinator dropped task id reply"),
            }
        });
    }

    fn schedule(&mut self, timer: TimerKind, at: u64) {
        if let Some(previous) = self.timers.remove(&timer) {
            previous.task.abort();
        }
        self.next_generation += 1;
        let generation = self.next_generation;
        let deadline = self.clock.instant_at(at);
        let inbox = self.inbox.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(tx) = inbox.upgrade() {
                let _ = tx.send(ContextCommand::Timer { timer, generation });
            }
        });
        self.timers.insert(timer, ArmedTimer { generation, task });
    }
}
