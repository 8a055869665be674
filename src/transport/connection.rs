//! WebSocket connector and event loop.
//!
//! This module dials the Mercury notification socket with
//! `tokio-tungstenite` and translates socket activity into
//! [`TransportEvent`]s.
//!
//! # Event Loop
//!
//! Each connect spawns one tokio task that handles:
//!
//! - Dialing (reported as `Open` or `Error`)
//! - Outgoing frames from the channel
//! - Incoming text frames
//! - Remote close and socket errors

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::{Connector, EventSender, Transport, TransportEvent};

// ============================================================================
// SocketCommand
// ============================================================================

/// Internal commands for the event loop.
enum SocketCommand {
    /// Write a text frame.
    Send(String),
    /// Close the socket.
    Shutdown,
}

// ============================================================================
// WsConnector
// ============================================================================

/// Dials a WebSocket URL.
///
/// # Example
///
/// ```ignore
/// let connector = WsConnector::new(Url::parse("ws://localhost:8080/api/listen")?);
/// ```
#[derive(Debug, Clone)]
pub struct WsConnector {
    /// Target URL (`ws://` or `wss://`).
    url: Url,
}

impl WsConnector {
    /// Creates a connector for the given URL.
    #[inline]
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    /// Returns the target URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Connector for WsConnector {
    fn connect(&self, events: EventSender) -> Box<dyn Transport> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_event_loop(self.url.clone(), command_rx, events));

        Box::new(WsTransport { command_tx })
    }
}

// ============================================================================
// WsTransport
// ============================================================================

/// Handle to a socket owned by the event loop task.
struct WsTransport {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<SocketCommand>,
}

impl Transport for WsTransport {
    fn send(&self, frame: String) -> Result<()> {
        self.command_tx
            .send(SocketCommand::Send(frame))
            .map_err(|_| Error::ConnectionClosed)
    }

    fn close(&self) {
        let _ = self.command_tx.send(SocketCommand::Shutdown);
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Dials the socket, then pumps frames both ways until it ends.
async fn run_event_loop(
    url: Url,
    mut command_rx: mpsc::UnboundedReceiver<SocketCommand>,
    events: EventSender,
) {
    debug!(%url, "Dialing notification socket");

    // Frames written before the handshake completes
    let mut early = Vec::new();
    let dial = connect_async(url.as_str());
    tokio::pin!(dial);

    let ws_stream = loop {
        tokio::select! {
            result = &mut dial => match result {
                Ok((stream, _response)) => break stream,
                Err(e) => {
                    error!(%url, error = %e, "WebSocket connect failed");
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    return;
                }
            },

            command = command_rx.recv() => match command {
                Some(SocketCommand::Send(frame)) => early.push(frame),
                Some(SocketCommand::Shutdown) => {
                    debug!(%url, "Dial abandoned by local close");
                    let _ = events.send(TransportEvent::Close(Some("closed locally".into())));
                    return;
                }
                None => {
                    debug!(%url, "Dial abandoned, transport dropped");
                    let _ = events.send(TransportEvent::Close(None));
                    return;
                }
            },
        }
    };

    let (mut ws_write, mut ws_read) = ws_stream.split();
    let _ = events.send(TransportEvent::Open);

    for frame in early {
        if let Err(e) = ws_write.send(Message::Text(frame.into())).await {
            warn!(error = %e, "Failed to write frame");
            let _ = events.send(TransportEvent::Error(e.to_string()));
            return;
        }
    }

    loop {
        tokio::select! {
            // Incoming frames from the server
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(len = text.len(), "Frame received");
                        let _ = events.send(TransportEvent::Message(text.as_str().to_owned()));
                    }

                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "WebSocket closed by remote");
                        let reason = frame.map(|f| f.reason.as_str().to_owned());
                        let _ = events.send(TransportEvent::Close(reason));
                        break;
                    }

                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                        break;
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        let _ = events.send(TransportEvent::Close(None));
                        break;
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            // Commands from the channel
            command = command_rx.recv() => {
                match command {
                    Some(SocketCommand::Send(frame)) => {
                        if let Err(e) = ws_write.send(Message::Text(frame.into())).await {
                            warn!(error = %e, "Failed to write frame");
                            let _ = events.send(TransportEvent::Error(e.to_string()));
                            break;
                        }
                        trace!("Frame sent");
                    }

                    Some(SocketCommand::Shutdown) => {
                        debug!("Shutdown command received");
                        let _ = ws_write.close().await;
                        let _ = events.send(TransportEvent::Close(Some("closed locally".into())));
                        break;
                    }

                    None => {
                        debug!("Command channel closed");
                        let _ = ws_write.close().await;
                        let _ = events.send(TransportEvent::Close(None));
                        break;
                    }
                }
            }
        }
    }

    debug!("Socket event loop terminated");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use tokio_tungstenite::accept_async;

    const STEP: Duration = Duration::from_secs(5);

    async fn bind_local() -> (TcpListener, Url) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let url = Url::parse(&format!("ws://127.0.0.1:{port}")).expect("url");
        (listener, url)
    }

    #[tokio::test]
    async fn test_open_send_receive_close() {
        let (listener, url) = bind_local().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("upgrade");

            let first = ws.next().await.expect("frame").expect("ok");
            assert_eq!(first.into_text().expect("text").as_str(), "hello");

            ws.send(Message::Text(String::from(r#"{"type":"NewMailAvailable"}"#).into()))
                .await
                .expect("send");
            ws.close(None).await.expect("close");
        });

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let transport = WsConnector::new(url).connect(events_tx);

        let open = timeout(STEP, events_rx.recv()).await.expect("timely");
        assert_eq!(open, Some(TransportEvent::Open));

        transport.send("hello".to_string()).expect("send");

        let message = timeout(STEP, events_rx.recv()).await.expect("timely");
        assert_eq!(
            message,
            Some(TransportEvent::Message(r#"{"type":"NewMailAvailable"}"#.into()))
        );

        let closed = timeout(STEP, events_rx.recv()).await.expect("timely");
        assert!(matches!(closed, Some(TransportEvent::Close(_))));

        server.await.expect("server task");
    }

    #[tokio::test]
    async fn test_dial_failure_reports_error() {
        let (listener, url) = bind_local().await;
        drop(listener);

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let _transport = WsConnector::new(url).connect(events_tx);

        let event = timeout(STEP, events_rx.recv()).await.expect("timely");
        assert!(matches!(event, Some(TransportEvent::Error(_))));
    }

    #[tokio::test]
    async fn test_local_close_reports_close() {
        let (listener, url) = bind_local().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("upgrade");
            while let Some(Ok(_)) = ws.next().await {}
        });

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let transport = WsConnector::new(url).connect(events_tx);

        let open = timeout(STEP, events_rx.recv()).await.expect("timely");
        assert_eq!(open, Some(TransportEvent::Open));

        transport.close();

        let closed = timeout(STEP, events_rx.recv()).await.expect("timely");
        assert!(matches!(closed, Some(TransportEvent::Close(_))));

        // Loop is gone, writes now fail
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(matches!(
            transport.send("late".into()),
            Err(Error::ConnectionClosed)
        ));

        let _ = timeout(STEP, server).await;
    }

    #[tokio::test]
    async fn test_close_during_stalled_handshake() {
        let (listener, url) = bind_local().await;

        // Accepts TCP but never answers the upgrade request
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            tokio::time::sleep(Duration::from_secs(60)).await;
            drop(stream);
        });

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let transport = WsConnector::new(url).connect(events_tx);

        tokio::time::sleep(Duration::from_millis(50)).await;
        transport.close();

        let closed = timeout(STEP, events_rx.recv()).await.expect("timely");
        assert_eq!(
            closed,
            Some(TransportEvent::Close(Some("closed locally".into())))
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(matches!(
            transport.send("late".into()),
            Err(Error::ConnectionClosed)
        ));

        server.abort();
    }
}
