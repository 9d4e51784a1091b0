//! WebSocket hub connection
//!
//! One background driver task owns the socket: it writes queued frames,
//! pings on an interval, routes inbound frames and, when the link drops,
//! walks the reconnect schedule before giving up.

use crate::dispatch::{Flow, FrameHandler, PendingInvocations};
use crate::negotiate::{negotiate, socket_url};
use crate::{
    Connection, ConnectionState, Connector, Inbound, InboundSender, ReconnectPolicy,
    TransportError, TransportResult,
};
use async_trait::async_trait;
use deck_protocol::handshake::check_response;
use deck_protocol::{Command, HandshakeRequest, HubMessage, Parser};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use reqwest::Client;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Hub connection settings
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Hub endpoint, e.g. `http://localhost:5000/hubs/presentation`
    pub url: String,
    /// Connect straight to the socket without `POST /negotiate`
    pub skip_negotiation: bool,
    pub reconnect: ReconnectPolicy,
    /// How often to ping the server
    pub keep_alive_interval: Duration,
    /// Drop the link after this long without hearing from the server
    pub server_timeout: Duration,
    pub handshake_timeout: Duration,
}

impl HubConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            skip_negotiation: false,
            reconnect: ReconnectPolicy::default(),
            keep_alive_interval: Duration::from_secs(15),
            server_timeout: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_skip_negotiation(mut self, skip: bool) -> Self {
        self.skip_negotiation = skip;
        self
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn with_timeouts(mut self, keep_alive_interval: Duration, server_timeout: Duration) -> Self {
        self.keep_alive_interval = keep_alive_interval;
        self.server_timeout = server_timeout;
        self
    }
}

/// Opens [`WebSocketConnection`]s to one hub
pub struct WebSocketConnector {
    config: Arc<HubConfig>,
    http: Client,
}

impl WebSocketConnector {
    pub fn new(config: HubConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Share an HTTP client (used for negotiation)
    pub fn with_client(config: HubConfig, http: Client) -> Self {
        Self {
            config: Arc::new(config),
            http,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, inbound: InboundSender) -> TransportResult<Arc<dyn Connection>> {
        let link = open_link(&self.config, &self.http).await?;
        info!(
            url = %self.config.url,
            connection_id = ?link.connection_id,
            "Connected to hub"
        );

        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            state: RwLock::new(ConnectionState::Connected),
            connection_id: RwLock::new(link.connection_id.clone()),
            pending: PendingInvocations::new(),
            outgoing: outgoing_tx,
            next_invocation: AtomicU64::new(0),
        });

        let driver = Driver {
            config: self.config.clone(),
            http: self.http.clone(),
            shared: shared.clone(),
            inbound,
            outgoing: outgoing_rx,
            stop: stop_rx,
        };
        let handle = tokio::spawn(driver.run(link));

        Ok(Arc::new(WebSocketConnection {
            shared,
            stop_tx,
            driver: Mutex::new(Some(handle)),
        }))
    }
}

/// State shared between the connection handle and its driver
struct Shared {
    state: RwLock<ConnectionState>,
    connection_id: RwLock<Option<String>>,
    pending: PendingInvocations,
    outgoing: mpsc::UnboundedSender<String>,
    next_invocation: AtomicU64,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }
}

/// A started hub connection over WebSocket
pub struct WebSocketConnection {
    shared: Arc<Shared>,
    stop_tx: watch::Sender<bool>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl Connection for WebSocketConnection {
    fn state(&self) -> ConnectionState {
        *self.shared.state.read()
    }

    fn connection_id(&self) -> Option<String> {
        self.shared.connection_id.read().clone()
    }

    async fn invoke(&self, command: Command) -> TransportResult<Value> {
        if self.state() != ConnectionState::Connected {
            return Err(TransportError::NotConnected);
        }

        let invocation_id = self
            .shared
            .next_invocation
            .fetch_add(1, Ordering::Relaxed)
            .to_string();
        let frame = command.to_message(invocation_id.clone())?.to_text()?;

        let waiter = self.shared.pending.register(&invocation_id);
        if self.shared.outgoing.send(frame).is_err() {
            self.shared.pending.cancel(&invocation_id);
            return Err(TransportError::ConnectionLost);
        }
        debug!(invocation_id = %invocation_id, target = command.target(), "Invocation sent");

        waiter.await.unwrap_or(Err(TransportError::ConnectionLost))
    }

    async fn stop(&self) {
        let _ = self.stop_tx.send(true);
        let driver = self.driver.lock().take();
        if let Some(handle) = driver {
            let _ = handle.await;
        }
        self.shared.set_state(ConnectionState::Disconnected);
        self.shared.pending.fail_all(TransportError::ConnectionLost);
    }
}

/// An open, handshaken socket
struct Link {
    sink: WsSink,
    source: WsSource,
    /// Holds anything that arrived right behind the handshake answer
    parser: Parser,
    connection_id: Option<String>,
}

async fn open_link(config: &HubConfig, http: &Client) -> TransportResult<Link> {
    let (token, connection_id) = if config.skip_negotiation {
        (None, None)
    } else {
        let session = negotiate(http, &config.url).await?;
        (Some(session.connection_token), Some(session.connection_id))
    };

    let url = socket_url(&config.url, token.as_deref())?;
    debug!(url = %url, "Opening socket");
    let (stream, _) = connect_async(url.as_str())
        .await
        .map_err(|e| TransportError::Start(e.to_string()))?;
    let (mut sink, mut source) = stream.split();

    sink.send(Message::Text(HandshakeRequest::json().to_text()?))
        .await
        .map_err(|e| TransportError::Handshake(e.to_string()))?;
    let parser = tokio::time::timeout(config.handshake_timeout, read_handshake(&mut source))
        .await
        .map_err(|_| TransportError::Handshake("timed out".into()))??;

    Ok(Link {
        sink,
        source,
        parser,
        connection_id,
    })
}

async fn read_handshake(source: &mut WsSource) -> TransportResult<Parser> {
    let mut parser = Parser::new();
    loop {
        match source.next().await {
            Some(Ok(Message::Text(text))) => parser.feed(text.as_bytes())?,
            Some(Ok(Message::Binary(data))) => parser.feed(&data)?,
            Some(Ok(Message::Close(_))) | None => {
                return Err(TransportError::Handshake("socket closed".into()))
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(TransportError::Handshake(e.to_string())),
        }

        if let Some(frame) = parser.next_frame()? {
            check_response(&frame).map_err(|e| TransportError::Handshake(e.to_string()))?;
            return Ok(parser);
        }
    }
}

/// Why a session ended
enum SessionEnd {
    Stopped,
    Lost(String),
    Closed {
        error: Option<String>,
        allow_reconnect: bool,
    },
}

struct Driver {
    config: Arc<HubConfig>,
    http: Client,
    shared: Arc<Shared>,
    inbound: InboundSender,
    outgoing: mpsc::UnboundedReceiver<String>,
    stop: watch::Receiver<bool>,
}

impl Driver {
    async fn run(mut self, mut link: Link) {
        loop {
            let end = self.session(link).await;
            self.shared.pending.fail_all(TransportError::ConnectionLost);
            // Frames queued for the dead socket belong to failed invocations
            while self.outgoing.try_recv().is_ok() {}

            let error = match end {
                SessionEnd::Stopped => {
                    self.shared.set_state(ConnectionState::Disconnected);
                    return;
                }
                SessionEnd::Closed {
                    error,
                    allow_reconnect: false,
                } => {
                    info!(error = ?error, "Server closed the connection");
                    self.finish(error);
                    return;
                }
                SessionEnd::Closed { error, .. } => error,
                SessionEnd::Lost(error) => Some(error),
            };

            warn!(error = ?error, "Connection lost, reconnecting");
            self.shared.set_state(ConnectionState::Reconnecting);
            let _ = self.inbound.send(Inbound::Reconnecting {
                error: error.clone(),
            });

            match self.reconnect(error).await {
                Ok(Some(next)) => {
                    info!(connection_id = ?next.connection_id, "Reconnected to hub");
                    *self.shared.connection_id.write() = next.connection_id.clone();
                    self.shared.set_state(ConnectionState::Connected);
                    let _ = self.inbound.send(Inbound::Reconnected {
                        connection_id: next.connection_id.clone(),
                    });
                    link = next;
                }
                Ok(None) => {
                    self.shared.set_state(ConnectionState::Disconnected);
                    return;
                }
                Err(error) => {
                    warn!(error = %error, "Giving up on reconnect");
                    self.finish(Some(error));
                    return;
                }
            }
        }
    }

    fn finish(&self, error: Option<String>) {
        self.shared.set_state(ConnectionState::Disconnected);
        self.shared.pending.fail_all(TransportError::ConnectionLost);
        let _ = self.inbound.send(Inbound::Closed { error });
    }

    /// Walk the reconnect schedule. `Ok(None)` means stop was requested.
    async fn reconnect(&mut self, error: Option<String>) -> Result<Option<Link>, String> {
        let mut last_error = error.unwrap_or_else(|| "connection lost".to_string());
        let mut attempt = 0;

        while let Some(delay) = self.config.reconnect.next_delay(attempt) {
            attempt += 1;
            debug!(attempt, delay_ms = delay.as_millis() as u64, "Reconnect scheduled");

            tokio::select! {
                _ = self.stop.changed() => return Ok(None),
                _ = tokio::time::sleep(delay) => {}
            }

            let opened = tokio::select! {
                _ = self.stop.changed() => return Ok(None),
                opened = open_link(&self.config, &self.http) => opened,
            };
            match opened {
                Ok(link) => return Ok(Some(link)),
                Err(e) => {
                    warn!(attempt, error = %e, "Reconnect attempt failed");
                    last_error = e.to_string();
                }
            }
        }

        Err(last_error)
    }

    async fn session(&mut self, link: Link) -> SessionEnd {
        let Link {
            mut sink,
            mut source,
            parser,
            ..
        } = link;
        let mut handler = FrameHandler::with_parser(parser, self.inbound.clone());

        // Frames that arrived together with the handshake answer
        if let Flow::Close {
            error,
            allow_reconnect,
        } = handler.process(&[], &self.shared.pending)
        {
            return SessionEnd::Closed {
                error,
                allow_reconnect,
            };
        }

        let ping = match HubMessage::ping().to_text() {
            Ok(text) => text,
            Err(e) => return SessionEnd::Lost(e.to_string()),
        };
        let mut keep_alive = tokio::time::interval(self.config.keep_alive_interval);
        keep_alive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        keep_alive.tick().await;
        let mut deadline = Instant::now() + self.config.server_timeout;

        loop {
            tokio::select! {
                _ = self.stop.changed() => {
                    let _ = sink.send(Message::Close(None)).await;
                    let _ = sink.close().await;
                    return SessionEnd::Stopped;
                }
                Some(frame) = self.outgoing.recv() => {
                    if let Err(e) = sink.send(Message::Text(frame)).await {
                        return SessionEnd::Lost(e.to_string());
                    }
                }
                _ = keep_alive.tick() => {
                    if let Err(e) = sink.send(Message::Text(ping.clone())).await {
                        return SessionEnd::Lost(e.to_string());
                    }
                }
                _ = tokio::time::sleep_until(deadline) => {
                    return SessionEnd::Lost("server timeout elapsed".into());
                }
                message = source.next() => {
                    deadline = Instant::now() + self.config.server_timeout;
                    let flow = match message {
                        Some(Ok(Message::Text(text))) => {
                            handler.process(text.as_bytes(), &self.shared.pending)
                        }
                        Some(Ok(Message::Binary(data))) => handler.process(&data, &self.shared.pending),
                        Some(Ok(Message::Close(_))) | None => {
                            return SessionEnd::Lost("socket closed".into());
                        }
                        Some(Ok(_)) => Flow::Continue,
                        Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
                    };

                    if let Flow::Close { error, allow_reconnect } = flow {
                        let _ = sink.close().await;
                        return SessionEnd::Closed { error, allow_reconnect };
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_config_defaults() {
        let config = HubConfig::new("http://localhost:5000/hubs/presentation");

        assert!(!config.skip_negotiation);
        assert_eq!(config.keep_alive_interval, Duration::from_secs(15));
        assert_eq!(config.server_timeout, Duration::from_secs(30));
        assert_eq!(config.reconnect, ReconnectPolicy::default());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let connector = WebSocketConnector::new(
            HubConfig::new(format!("http://{}/hub", addr)).with_skip_negotiation(true),
        );
        let (tx, _rx) = mpsc::unbounded_channel();

        assert!(matches!(
            connector.connect(tx).await,
            Err(TransportError::Start(_))
        ));
    }
}
