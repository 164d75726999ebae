//! The pairing session runtime.
//!
//! A [`PairingSession`] is a cheap, cloneable handle to one supervising task.
//! That task owns the [`PairingMachine`] and is the only thing that ever
//! touches it. Everything else talks to it through a single bounded queue:
//!
//! - handle calls send a trigger with a reply channel and wait for the verdict
//! - listener, sensor and exchange tasks send their results as reports
//!
//! Events are applied strictly one at a time. After each one the loop runs the
//! resulting actions, publishes a fresh [`SessionSnapshot`] on a watch
//! channel, then broadcasts the resulting [`SessionEvent`]s.
//!
//! The loop ends on [`PairingSession::shutdown`] or when the last handle is
//! dropped. Either way every listener and in-flight task is aborted.

use std::sync::Arc;

use beampair_core::{
    Action, EnvironmentReading, Event, Feed, PairingMachine, SessionEvent, SessionSnapshot,
    TriggerError,
};
use beampair_types::SessionId;
use futures_util::stream::{BoxStream, StreamExt};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::collaborators::{Collaborators, EnvironmentError, FeedError};
use crate::config::{ConfigError, PairingConfig};
use crate::exchange::ExchangeCoordinator;

/// Errors returned by session handle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The trigger is not valid in the current state.
    #[error("rejected: {0}")]
    Rejected(#[from] TriggerError),

    /// The session has shut down.
    #[error("session closed")]
    Closed,
}

enum Envelope {
    Trigger {
        event: Event,
        reply: oneshot::Sender<Result<(), TriggerError>>,
    },
    Report(Event),
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running pairing session.
///
/// Clones share the same session. The session shuts down when
/// [`shutdown`](Self::shutdown) is called or the last clone is dropped.
#[derive(Clone)]
pub struct PairingSession {
    session_id: SessionId,
    queue: mpsc::Sender<Envelope>,
    snapshot: watch::Receiver<SessionSnapshot>,
    events: broadcast::Sender<SessionEvent>,
    _alive: Arc<oneshot::Sender<()>>,
}

impl PairingSession {
    /// Spawn a session in the Idle state on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `config` fails validation.
    pub fn spawn(
        config: &PairingConfig,
        collaborators: Collaborators,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let machine = PairingMachine::new(
            config.local_beacon(),
            config.local_profile(),
            Arc::clone(&collaborators.convention),
        );
        let session_id = machine.session_id();

        let (queue, inbox) = mpsc::channel(config.session.event_queue_capacity);
        let (snapshot_tx, snapshot) = watch::channel(machine.snapshot());
        let (events, _) = broadcast::channel(config.session.notification_capacity);
        let (alive, dropped) = oneshot::channel();

        let exchange = ExchangeCoordinator::new(Arc::clone(&collaborators.transport))
            .with_timeout(config.exchange_timeout());

        let session_loop = SessionLoop {
            machine,
            collaborators,
            exchange,
            queue: queue.clone(),
            snapshot: snapshot_tx,
            events: events.clone(),
            beacon_listener: None,
            peer_listener: None,
            environment_read: None,
            tasks: Vec::new(),
        };
        tokio::spawn(session_loop.run(inbox, dropped));

        Ok(Self {
            session_id,
            queue,
            snapshot,
            events,
            _alive: Arc::new(alive),
        })
    }

    /// Session identifier.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Start the discovery feeds. Restarts any feed that has ended.
    pub async fn start(&self) -> Result<(), SessionError> {
        self.trigger(Event::StartRequested).await
    }

    /// Ask to share with the closest device.
    pub async fn share_intent(&self) -> Result<(), SessionError> {
        self.trigger(Event::ShareRequested).await
    }

    /// Confirm the pending offer and start the exchange.
    pub async fn confirm_intent(&self) -> Result<(), SessionError> {
        self.trigger(Event::ConfirmRequested).await
    }

    /// Dismiss the pending offer.
    pub async fn cancel_intent(&self) -> Result<(), SessionError> {
        self.trigger(Event::CancelRequested).await
    }

    /// Copy of the current session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver that sees every published snapshot.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Subscribe to notifications published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Stop the session and every task it owns.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session already stopped.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        let (reply, done) = oneshot::channel();
        self.queue
            .send(Envelope::Shutdown { reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        done.await.map_err(|_| SessionError::Closed)
    }

    async fn trigger(&self, event: Event) -> Result<(), SessionError> {
        let (reply, verdict) = oneshot::channel();
        self.queue
            .send(Envelope::Trigger { event, reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        verdict.await.map_err(|_| SessionError::Closed)??;
        Ok(())
    }
}

impl std::fmt::Debug for PairingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairingSession")
            .field("session_id", &self.session_id)
            .field("phase", &self.snapshot.borrow().state.phase())
            .finish()
    }
}

// ===========================================
// Supervising task
// ===========================================

struct SessionLoop {
    machine: PairingMachine,
    collaborators: Collaborators,
    exchange: ExchangeCoordinator,
    queue: mpsc::Sender<Envelope>,
    snapshot: watch::Sender<SessionSnapshot>,
    events: broadcast::Sender<SessionEvent>,
    beacon_listener: Option<JoinHandle<()>>,
    peer_listener: Option<JoinHandle<()>>,
    environment_read: Option<JoinHandle<()>>,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionLoop {
    async fn run(
        mut self,
        mut inbox: mpsc::Receiver<Envelope>,
        mut dropped: oneshot::Receiver<()>,
    ) {
        let session_id = self.machine.session_id();
        info!(
            "Pairing session {} started (beacon {}, advertising as {})",
            session_id,
            self.machine.snapshot().local_beacon,
            self.machine.local_identifier()
        );

        loop {
            tokio::select! {
                envelope = inbox.recv() => match envelope {
                    Some(Envelope::Trigger { event, reply }) => {
                        let result = self.on_trigger(event);
                        let _ = reply.send(result);
                    }
                    Some(Envelope::Report(event)) => self.on_report(event),
                    Some(Envelope::Shutdown { reply }) => {
                        self.teardown();
                        let _ = reply.send(());
                        return;
                    }
                    None => break,
                },
                _ = &mut dropped => break,
            }
        }

        self.teardown();
    }

    fn on_trigger(&mut self, event: Event) -> Result<(), TriggerError> {
        let label = trigger_name(&event);
        match self.dispatch(event) {
            Ok(()) => {
                debug!("{} accepted", label);
                Ok(())
            }
            Err(e) => {
                info!("{} rejected: {}", label, e);
                Err(e)
            }
        }
    }

    fn on_report(&mut self, event: Event) {
        let is_result = matches!(
            event,
            Event::EnvironmentRead { .. }
                | Event::ExchangeSucceeded { .. }
                | Event::ExchangeFailed { .. }
        );
        let phase = self.machine.state().phase();

        // Reports are never rejected.
        let _ = self.dispatch(event);

        if is_result && self.machine.state().phase() == phase {
            debug!("Ignoring stale result in {}", phase);
        }
    }

    fn dispatch(&mut self, event: Event) -> Result<(), TriggerError> {
        let actions = self.machine.apply(event)?;

        let mut notifications = Vec::new();
        for action in actions {
            match action {
                Action::Emit(notification) => notifications.push(notification),
                other => self.execute(other),
            }
        }

        self.snapshot.send_replace(self.machine.snapshot());
        for notification in notifications {
            log_notification(&notification);
            // No subscribers is fine.
            let _ = self.events.send(notification);
        }
        Ok(())
    }

    fn execute(&mut self, action: Action) {
        match action {
            Action::StartBeaconFeed { beacon } => {
                let stream = self.collaborators.proximity.start(beacon);
                let listener = spawn_listener(
                    stream,
                    Feed::Beacons,
                    |beacons| Event::BeaconsObserved { beacons },
                    self.queue.clone(),
                );
                if let Some(old) = self.beacon_listener.replace(listener) {
                    old.abort();
                }
            }
            Action::StartPeerFeed { local_identifier } => {
                let stream = self.collaborators.peers.start(&local_identifier);
                let listener = spawn_listener(
                    stream,
                    Feed::Peers,
                    |peer| Event::PeerDiscovered { peer },
                    self.queue.clone(),
                );
                if let Some(old) = self.peer_listener.replace(listener) {
                    old.abort();
                }
            }
            Action::ReadEnvironment { intent } => {
                let environment = Arc::clone(&self.collaborators.environment);
                let queue = self.queue.clone();
                let read = tokio::spawn(async move {
                    let (horizontal, covered) =
                        tokio::join!(environment.is_horizontal(), environment.sensed_proximity());
                    let reading = EnvironmentReading {
                        is_horizontal: sampled("orientation", horizontal),
                        sensed_proximity: sampled("proximity", covered),
                    };
                    let _ = queue
                        .send(Envelope::Report(Event::EnvironmentRead { intent, reading }))
                        .await;
                });
                if let Some(old) = self.environment_read.replace(read) {
                    old.abort();
                }
            }
            Action::CancelEnvironmentRead => {
                if let Some(read) = self.environment_read.take() {
                    debug!("Abandoning environment read");
                    read.abort();
                }
            }
            Action::StartExchange { profile, peer } => {
                info!("Exchanging profiles with {}", peer);
                let exchange = self.exchange.clone();
                let queue = self.queue.clone();
                self.track(tokio::spawn(async move {
                    let event = match exchange.exchange(&profile, &peer).await {
                        Ok(profile) => Event::ExchangeSucceeded { profile },
                        Err(error) => Event::ExchangeFailed { error },
                    };
                    let _ = queue.send(Envelope::Report(event)).await;
                }));
            }
            Action::Emit(_) => {}
        }
    }

    fn track(&mut self, task: JoinHandle<()>) {
        self.tasks.retain(|t| !t.is_finished());
        self.tasks.push(task);
    }

    fn teardown(&mut self) {
        for task in [
            self.beacon_listener.take(),
            self.peer_listener.take(),
            self.environment_read.take(),
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("Pairing session {} closed", self.machine.session_id());
    }
}

fn spawn_listener<T: Send + 'static>(
    mut stream: BoxStream<'static, Result<T, FeedError>>,
    feed: Feed,
    to_event: fn(T) -> Event,
    queue: mpsc::Sender<Envelope>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let error = loop {
            match stream.next().await {
                Some(Ok(item)) => {
                    if queue.send(Envelope::Report(to_event(item))).await.is_err() {
                        return;
                    }
                }
                Some(Err(e)) => break Some(e.to_string()),
                None => break None,
            }
        };
        let _ = queue
            .send(Envelope::Report(Event::FeedEnded { feed, error }))
            .await;
    })
}

fn sampled(sensor: &str, reading: Result<bool, EnvironmentError>) -> Option<bool> {
    match reading {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to read {} sensor: {}", sensor, e);
            None
        }
    }
}

fn trigger_name(event: &Event) -> &'static str {
    match event {
        Event::StartRequested => "start",
        Event::ShareRequested => "share",
        Event::ConfirmRequested => "confirm",
        Event::CancelRequested => "cancel",
        _ => "report",
    }
}

fn log_notification(notification: &SessionEvent) {
    match notification {
        SessionEvent::StateChanged { state } => debug!("State -> {}", state.phase()),
        SessionEvent::BeaconsUpdated { count } => debug!("{} beacon(s) in view", count),
        SessionEvent::PeerDiscovered { peer } => debug!("Discovered peer {}", peer),
        SessionEvent::FeedEnded {
            feed,
            error: Some(e),
        } => warn!("{:?} feed ended: {}", feed, e),
        SessionEvent::FeedEnded { feed, error: None } => info!("{:?} feed ended", feed),
    }
}
