//! WebSocket transport bridged onto the frame loop.
//!
//! The socket lives on a dedicated thread running a current-thread tokio
//! runtime. Pull requests and inbound frames cross the thread boundary over
//! channels, so nothing on the I/O thread touches session state.

use std::{
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
    thread,
};

use anyhow::{anyhow, Context, Result};
use futures_util::{SinkExt, StreamExt};
use spectator_session::{Inbound, Transport, TransportError};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Transport speaking the replay stream protocol over a WebSocket.
///
/// An empty text frame asks the producer for the next message.
#[derive(Debug)]
pub(crate) struct WsTransport {
    requests: UnboundedSender<()>,
    inbound: Receiver<Inbound>,
    closed: bool,
}

impl WsTransport {
    /// Connects to `url` and blocks until the handshake completes.
    pub(crate) fn connect(url: &str) -> Result<Self> {
        let (request_tx, request_rx) = unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to build the websocket runtime")?;
        let target = url.to_owned();
        let _ = thread::Builder::new()
            .name("spectator-ws".to_owned())
            .spawn(move || {
                runtime.block_on(pump_socket(target, request_rx, inbound_tx, ready_tx));
            })
            .context("failed to spawn the websocket thread")?;

        ready_rx
            .recv()
            .map_err(|_| anyhow!("websocket thread exited before connecting"))?
            .map_err(|reason| anyhow!(reason))
            .with_context(|| format!("failed to connect to {url}"))?;
        info!(url, "connected to replay stream");

        Ok(Self {
            requests: request_tx,
            inbound: inbound_rx,
            closed: false,
        })
    }
}

impl Transport for WsTransport {
    fn request_more(&mut self) -> Result<(), TransportError> {
        self.requests
            .send(())
            .map_err(|_| TransportError::Send("websocket thread has exited".to_owned()))
    }

    fn poll(&mut self) -> Option<Inbound> {
        if self.closed {
            return None;
        }
        let inbound = match self.inbound.try_recv() {
            Ok(inbound) => inbound,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Inbound::Closed,
        };
        if inbound == Inbound::Closed {
            self.closed = true;
        }
        Some(inbound)
    }
}

/// Appends the replay identifier to the stream endpoint.
pub(crate) fn stream_url(base: &str, id: Option<&str>) -> String {
    match id {
        Some(id) => {
            let separator = if base.contains('?') { '&' } else { '?' };
            format!("{base}{separator}id={id}")
        }
        None => base.to_owned(),
    }
}

async fn pump_socket(
    url: String,
    mut requests: UnboundedReceiver<()>,
    inbound: Sender<Inbound>,
    ready: mpsc::SyncSender<Result<(), String>>,
) {
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(err) => {
            let _ = ready.send(Err(err.to_string()));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let (mut write, mut read) = stream.split();
    loop {
        tokio::select! {
            request = requests.recv() => {
                let Some(()) = request else {
                    debug!("transport dropped; closing socket");
                    let _ = write.send(Message::Close(None)).await;
                    break;
                };
                if let Err(err) = write.send(Message::Text(String::new())).await {
                    warn!(error = %err, "failed to send pull request");
                    break;
                }
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if inbound.send(Inbound::Message(text)).is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => {
                        if inbound.send(Inbound::Message(text)).is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!(error = %err, "dropping non UTF-8 frame"),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(error = %err, "websocket read failed");
                    break;
                }
            },
        }
    }

    let _ = inbound.send(Inbound::Closed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_url_appends_identifier() {
        assert_eq!(
            stream_url("ws://localhost:8080/replay/stream", Some("42")),
            "ws://localhost:8080/replay/stream?id=42"
        );
        assert_eq!(
            stream_url("ws://host/stream?speed=2", Some("7")),
            "ws://host/stream?speed=2&id=7"
        );
        assert_eq!(stream_url("ws://host/stream", None), "ws://host/stream");
    }

    #[test]
    fn closed_is_reported_once_after_the_socket_ends() {
        let (request_tx, _request_rx) = unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel();
        let mut transport = WsTransport {
            requests: request_tx,
            inbound: inbound_rx,
            closed: false,
        };

        inbound_tx
            .send(Inbound::Message("{}".to_owned()))
            .expect("send");
        drop(inbound_tx);

        assert_eq!(transport.poll(), Some(Inbound::Message("{}".to_owned())));
        assert_eq!(transport.poll(), Some(Inbound::Closed));
        assert_eq!(transport.poll(), None);
    }

    #[test]
    fn requests_fail_once_the_io_thread_is_gone() {
        let (request_tx, request_rx) = unbounded_channel();
        let (_inbound_tx, inbound_rx) = mpsc::channel();
        let mut transport = WsTransport {
            requests: request_tx,
            inbound: inbound_rx,
            closed: false,
        };

        transport.request_more().expect("receiver alive");
        drop(request_rx);
        assert!(matches!(
            transport.request_more(),
            Err(TransportError::Send(_))
        ));
    }
}
