//! Public signaling channel API.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parley_common::{new_correlation_id, SignalingError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::connection::{connection_loop, open_socket, LoopContext};
use super::handler::{Handler, HandlerId, HandlerRegistry, Subscription};
use super::types::{ConnectionStatus, FailureReason, SignalingConfig};
use crate::identity::Identity;
use crate::protocol::{InboundEvent, OutboundEvent};

/// Outbound frames buffered between `send` and the socket writer.
const OUTBOUND_QUEUE: usize = 256;

/// How long `disconnect` waits for the loop to close the socket.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

type ConnectFuture = Shared<BoxFuture<'static, Result<(), SignalingError>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The running connection loop.
struct Link {
    outbound: mpsc::Sender<String>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl Link {
    async fn stop(self) {
        self.shutdown.cancel();
        let mut task = self.task;
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
            warn!("Signaling loop did not stop in time, aborting");
            task.abort();
        }
    }
}

struct ChannelInner {
    config: SignalingConfig,
    handlers: Arc<HandlerRegistry>,
    status: Arc<watch::Sender<ConnectionStatus>>,
    link: Mutex<Option<Link>>,
    in_flight: Mutex<Option<ConnectFuture>>,
    identity: Mutex<Option<Identity>>,
    /// Bumped by `disconnect` so an in-flight connect knows it was overtaken.
    epoch: AtomicU64,
}

impl ChannelInner {
    fn publish(&self, status: ConnectionStatus) {
        debug!(status = %status, "Signaling status changed");
        self.status.send_replace(status);
    }

    async fn establish(self: Arc<Self>, token: String) -> Result<(), SignalingError> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let attempt = new_correlation_id();

        // A loop that gave up (or is still retrying) is replaced.
        let stale = lock(&self.link).take();
        if let Some(stale) = stale {
            stale.stop().await;
        }

        self.publish(ConnectionStatus::Connecting);
        let ws = match open_socket(&self.config, &token).await {
            Ok(ws) => ws,
            Err(e) => {
                let reason = match e {
                    SignalingError::Auth(_) => FailureReason::AuthFailed,
                    _ => FailureReason::ServerUnreachable,
                };
                warn!(attempt = %attempt, error = %e, "Signaling connect failed");
                self.publish(ConnectionStatus::Failed(reason));
                return Err(e);
            }
        };

        if self.epoch.load(Ordering::SeqCst) != epoch {
            drop(ws);
            return Err(SignalingError::Connect(
                "disconnected while connecting".to_string(),
            ));
        }

        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
        let shutdown = CancellationToken::new();
        let ctx = LoopContext {
            config: self.config.clone(),
            handlers: Arc::clone(&self.handlers),
            status: Arc::clone(&self.status),
        };
        let task = tokio::spawn(connection_loop(
            ctx,
            ws,
            outbound_rx,
            shutdown.clone(),
            token,
        ));
        *lock(&self.link) = Some(Link {
            outbound,
            shutdown,
            task,
        });

        info!(attempt = %attempt, "Signaling channel connected");
        self.publish(ConnectionStatus::Connected);
        Ok(())
    }
}

impl Drop for ChannelInner {
    fn drop(&mut self) {
        if let Some(link) = lock(&self.link).take() {
            link.shutdown.cancel();
        }
    }
}

// ---------------------------------------------------------------------------
// SignalingChannel
// ---------------------------------------------------------------------------

/// One logical connection to the signaling server.
///
/// Cheap to clone; clones share the connection, handlers and status.
#[derive(Clone)]
pub struct SignalingChannel {
    inner: Arc<ChannelInner>,
}

impl SignalingChannel {
    pub fn new(config: SignalingConfig) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            inner: Arc::new(ChannelInner {
                config,
                handlers: Arc::new(HandlerRegistry::default()),
                status: Arc::new(status),
                link: Mutex::new(None),
                in_flight: Mutex::new(None),
                identity: Mutex::new(None),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Connect with the identity's access token.
    ///
    /// Returns immediately when already connected. Concurrent calls share
    /// one attempt and observe the same result.
    pub async fn connect(&self, identity: &Identity) -> Result<(), SignalingError> {
        let Some(token) = identity.token().map(str::to_owned) else {
            warn!(user_id = %identity.user_id, "No access token, cannot connect");
            self.inner
                .publish(ConnectionStatus::Failed(FailureReason::AuthFailed));
            return Err(SignalingError::Auth("no access token available".to_string()));
        };
        *lock(&self.inner.identity) = Some(identity.clone());

        if self.status().is_connected() {
            return Ok(());
        }

        let attempt = {
            let mut slot = lock(&self.inner.in_flight);
            match slot.as_ref() {
                Some(attempt) => attempt.clone(),
                None => {
                    let inner = Arc::clone(&self.inner);
                    let attempt = async move {
                        let result = Arc::clone(&inner).establish(token).await;
                        *lock(&inner.in_flight) = None;
                        result
                    }
                    .boxed()
                    .shared();
                    *slot = Some(attempt.clone());
                    attempt
                }
            }
        };
        attempt.await
    }

    /// Close the connection. Safe to call repeatedly or before `connect`.
    pub async fn disconnect(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        let link = lock(&self.inner.link).take();
        if let Some(link) = link {
            link.stop().await;
            info!("Signaling channel disconnected");
        }
        self.inner.publish(ConnectionStatus::Disconnected);
    }

    /// Drop the current connection and connect again with the last
    /// identity passed to `connect`.
    pub async fn reconnect(&self) -> Result<(), SignalingError> {
        let identity = lock(&self.inner.identity).clone();
        let Some(identity) = identity else {
            return Err(SignalingError::Auth(
                "no credentials from a previous connect".to_string(),
            ));
        };
        self.disconnect().await;
        self.connect(&identity).await
    }

    /// Queue an event for the server. Returns false (and logs) when the
    /// channel is not connected.
    pub fn send(&self, event: &OutboundEvent) -> bool {
        let status = self.status();
        if !status.is_connected() {
            warn!(event = event.name(), status = %status, "Signaling not connected, event dropped");
            return false;
        }

        let frame = match serde_json::to_string(event) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(event = event.name(), error = %e, "Failed to encode signaling event");
                return false;
            }
        };

        let link = lock(&self.inner.link);
        let Some(link) = link.as_ref() else {
            return false;
        };
        match link.outbound.try_send(frame) {
            Ok(()) => {
                debug!(event = event.name(), "Queued signaling event");
                true
            }
            Err(e) => {
                warn!(event = event.name(), error = %e, "Signaling queue rejected event");
                false
            }
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status.subscribe()
    }

    /// Register a handler for an inbound event name.
    pub fn on<F>(&self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&InboundEvent) + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        self.inner.handlers.on(event, handler)
    }

    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        self.inner.handlers.off(event, id)
    }

    /// Forward the named events into a queue. The handlers stay registered
    /// until the returned subscription is dropped.
    pub fn subscribe(
        &self,
        events: &[&str],
    ) -> (Subscription, mpsc::UnboundedReceiver<InboundEvent>) {
        Subscription::forward(&self.inner.handlers, events)
    }

    /// Feed the named events, in arrival order, to `handle` on one task.
    pub fn pump<F, Fut>(&self, events: &[&str], mut handle: F) -> Pump
    where
        F: FnMut(InboundEvent) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (subscription, mut queue) = self.subscribe(events);
        let task = tokio::spawn(async move {
            while let Some(event) = queue.recv().await {
                handle(event).await;
            }
        });
        Pump {
            _subscription: subscription,
            task,
        }
    }
}

/// A session's signaling consumer. Dropping it unregisters the handlers and
/// stops the task.
pub struct Pump {
    _subscription: Subscription,
    task: JoinHandle<()>,
}

impl Drop for Pump {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ---------------------------------------------------------------------------
// SignalSender
// ---------------------------------------------------------------------------

/// The slice of the signaling channel the sessions depend on.
pub trait SignalSender: Send + Sync {
    fn send(&self, event: &OutboundEvent) -> bool;

    fn is_connected(&self) -> bool;
}

impl SignalSender for SignalingChannel {
    fn send(&self, event: &OutboundEvent) -> bool {
        SignalingChannel::send(self, event)
    }

    fn is_connected(&self) -> bool {
        self.status().is_connected()
    }
}
