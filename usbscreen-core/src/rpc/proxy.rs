//! Server side of the remote display.
//!
//! [`RemoteProxy`] republishes a local [`ControlDevice`] over TCP. Its
//! listener is bound to a start/stop lifecycle:
//!
//! - [`start`](RemoteProxy::start) binds and spawns the accept loop.
//! - [`stop`](RemoteProxy::stop) stops accepting, lets every in-flight
//!   request finish, and waits for connection tasks up to a deadline.
//! - [`closed`](RemoteProxy::closed) resolves when the accept loop ends,
//!   with an error if the listener itself failed.
//!
//! Accept errors that leave the listener usable (aborted handshakes,
//! descriptor exhaustion) are retried with a capped exponential backoff.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, watch};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::device::ControlDevice;
use crate::error::ScreenError;
use crate::rpc::{COMMAND_RESTART, COMMAND_SHUTDOWN, COMMAND_STARTUP, Call, Message, RpcCodec};

// ── ProxyService ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum PowerCommand {
    Startup,
    Shutdown,
    Restart,
}

impl PowerCommand {
    fn parse(name: &str) -> Result<Self, ScreenError> {
        match name {
            COMMAND_STARTUP => Ok(Self::Startup),
            COMMAND_SHUTDOWN => Ok(Self::Shutdown),
            COMMAND_RESTART => Ok(Self::Restart),
            other => Err(ScreenError::UnknownCommand(other.to_string())),
        }
    }
}

/// Dispatches decoded calls to the wrapped device.
///
/// The device sits behind an async mutex, so calls from different
/// connections are serialized and their frames never interleave.
#[derive(Clone)]
pub struct ProxyService {
    device: Arc<Mutex<Box<dyn ControlDevice>>>,
}

impl ProxyService {
    pub fn new(device: Box<dyn ControlDevice>) -> Self {
        Self {
            device: Arc::new(Mutex::new(device)),
        }
    }

    /// Run one call. Unknown commands and undecodable images are
    /// rejected before the device is touched.
    pub async fn dispatch(&self, call: Call) -> Result<(), ScreenError> {
        match call {
            Call::Command(name) => {
                let command = PowerCommand::parse(&name)?;
                let mut device = self.device.lock().await;
                match command {
                    PowerCommand::Startup => device.startup().await,
                    PowerCommand::Shutdown => device.shutdown().await,
                    PowerCommand::Restart => device.restart().await,
                }
            }
            Call::SetLight(light) => self.device.lock().await.set_light(light).await,
            Call::SetMirror(mirror) => self.device.lock().await.set_mirror(mirror).await,
            Call::SetRotate(req) => {
                self.device
                    .lock()
                    .await
                    .set_rotate(req.landscape, req.invert)
                    .await
            }
            Call::DrawBitmap(req) => {
                let image = req.decode_image()?;
                self.device
                    .lock()
                    .await
                    .draw_bitmap(req.x, req.y, &image)
                    .await
            }
        }
    }
}

// ── RemoteProxy ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum ListenerState {
    Idle,
    Listening,
    Stopped,
    Failed(io::ErrorKind, String),
}

/// TCP front end for a [`ProxyService`].
pub struct RemoteProxy {
    service: ProxyService,
    addr: String,
    local_addr: Option<SocketAddr>,
    cancel: CancellationToken,
    tracker: TaskTracker,
    state: watch::Sender<ListenerState>,
}

impl RemoteProxy {
    /// A proxy for `device` that will listen on `addr` once started.
    pub fn new(device: Box<dyn ControlDevice>, addr: impl Into<String>) -> Self {
        let (state, _) = watch::channel(ListenerState::Idle);
        Self {
            service: ProxyService::new(device),
            addr: addr.into(),
            local_addr: None,
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
            state,
        }
    }

    /// The bound address, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Bind the listener and spawn the accept loop.
    pub async fn start(&mut self) -> Result<SocketAddr, ScreenError> {
        if *self.state.borrow() != ListenerState::Idle {
            return Err(ScreenError::AlreadyStarted);
        }

        let listener = TcpListener::bind(&self.addr).await?;
        let local = listener.local_addr()?;
        self.local_addr = Some(local);
        self.state.send_replace(ListenerState::Listening);
        info!(addr = %local, "remote proxy listening");

        let service = self.service.clone();
        let cancel = self.cancel.clone();
        let tracker = self.tracker.clone();
        let state = self.state.clone();
        self.tracker.spawn(async move {
            let outcome = accept_loop(listener, service, cancel, tracker).await;
            state.send_replace(outcome);
        });

        Ok(local)
    }

    /// Resolves when the accept loop has ended. Returns the listener
    /// error if it failed rather than being stopped.
    ///
    /// Never resolves for a proxy that was not started.
    pub async fn closed(&self) -> Result<(), ScreenError> {
        let mut rx = self.state.subscribe();
        let state = rx
            .wait_for(|s| matches!(s, ListenerState::Stopped | ListenerState::Failed(..)))
            .await
            .map_err(|_| ScreenError::ChannelClosed)?
            .clone();

        match state {
            ListenerState::Failed(kind, msg) => {
                Err(ScreenError::Io(io::Error::new(kind, msg)))
            }
            _ => Ok(()),
        }
    }

    /// Stop accepting, drain in-flight requests and wait for every
    /// connection task, at most `deadline`.
    pub async fn stop(&mut self, deadline: Duration) -> Result<(), ScreenError> {
        self.cancel.cancel();
        self.tracker.close();

        match tokio::time::timeout(deadline, self.tracker.wait()).await {
            Ok(()) => {
                info!("remote proxy stopped");
                Ok(())
            }
            Err(_) => {
                warn!(?deadline, "remote proxy did not drain in time");
                Err(ScreenError::Timeout(deadline))
            }
        }
    }
}

impl Drop for RemoteProxy {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Accept loop ──────────────────────────────────────────────────

const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// `ENFILE` and `EMFILE`.
#[cfg(unix)]
const FD_EXHAUSTED: &[i32] = &[23, 24];
/// `WSAEMFILE`.
#[cfg(windows)]
const FD_EXHAUSTED: &[i32] = &[10024];
#[cfg(not(any(unix, windows)))]
const FD_EXHAUSTED: &[i32] = &[];

/// Source of inbound connections.
#[async_trait]
trait Accept: Send + Sync {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)>;
}

#[async_trait]
impl Accept for TcpListener {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }
}

/// Whether the listener survives `e` and accepting should continue.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    ) || e.raw_os_error().is_some_and(|code| FD_EXHAUSTED.contains(&code))
}

async fn accept_loop<A: Accept>(
    listener: A,
    service: ProxyService,
    cancel: CancellationToken,
    tracker: TaskTracker,
) -> ListenerState {
    let mut backoff = ACCEPT_BACKOFF_MIN;
    loop {
        let accepted = tokio::select! {
            _ = cancel.cancelled() => return ListenerState::Stopped,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer)) => {
                backoff = ACCEPT_BACKOFF_MIN;
                info!(%peer, "client connected");
                let _ = stream.set_nodelay(true);
                tracker.spawn(serve_connection(
                    stream,
                    peer,
                    service.clone(),
                    cancel.clone(),
                ));
            }
            Err(e) if is_transient(&e) => {
                warn!(?backoff, "accept failed, retrying: {e}");
                tokio::select! {
                    _ = cancel.cancelled() => return ListenerState::Stopped,
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(ACCEPT_BACKOFF_MAX);
            }
            Err(e) => {
                error!("listener failed: {e}");
                return ListenerState::Failed(e.kind(), e.to_string());
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    service: ProxyService,
    cancel: CancellationToken,
) {
    let mut framed = Framed::new(stream, RpcCodec);

    loop {
        // Cancellation is only observed between requests, so a request
        // that has been read is always answered.
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = framed.next() => next,
        };

        let (id, call) = match next {
            None => break,
            Some(Ok(Message::Request { id, call })) => (id, call),
            Some(Ok(Message::Response { id, .. })) => {
                warn!(%peer, id, "ignoring response sent by client");
                continue;
            }
            Some(Err(e)) => {
                warn!(%peer, "read error: {e}");
                break;
            }
        };

        let method = call.method();
        let result = service.dispatch(call).await;
        match &result {
            Ok(()) => debug!(%peer, id, method, "call ok"),
            Err(e) => warn!(%peer, id, method, "call failed: {e}"),
        }

        let reply = Message::Response {
            id,
            error: result.err().map(|e| e.to_string()),
        };
        if let Err(e) = framed.send(reply).await {
            warn!(%peer, "write error: {e}");
            break;
        }
    }

    info!(%peer, "client disconnected");
}

// ── Tests ────────────────────────────────────────────────────────
