//! Requesting side of the transport

use super::codec::{self, MessageReader};
use super::message::{channels, ProtocolMessage, Request, Response};
use super::registry::{ListenerGuard, ListenerRegistry};
use crate::error::{Result, SoundboyError};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

/// Handle to a connected transport
///
/// Cheap to clone. Every clone shares the outbound queue and the listener
/// registry, so responses are routed to whichever clone sent the request.
#[derive(Clone)]
pub struct IpcClient {
    outbound: mpsc::UnboundedSender<ProtocolMessage>,
    listeners: ListenerRegistry,
}

impl IpcClient {
    /// Attach to a byte stream pair
    ///
    /// Spawns the writer and the response router, so this must run inside
    /// a Tokio runtime.
    pub fn connect<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let outbound = codec::spawn_writer(writer);
        let listeners = ListenerRegistry::default();
        tokio::spawn(route_responses(reader, listeners.clone()));

        Self {
            outbound,
            listeners,
        }
    }

    /// Whether the outbound side still accepts messages
    pub fn is_connected(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// Number of requests still waiting for a response
    pub fn pending(&self) -> usize {
        self.listeners.len()
    }

    /// Fire-and-forget send
    ///
    /// Returns the response channel the request was tagged with.
    pub fn send(&self, channel: &str, mut request: Request) -> Result<String> {
        let id = request.ensure_response_channel(channel);
        self.post(channel, request)?;
        Ok(id)
    }

    /// Send a request and wait for its first response
    pub async fn fetch(&self, channel: &str, mut request: Request) -> Result<Response> {
        let id = request.ensure_response_channel(channel);

        // Listen before sending so a fast reply cannot slip past
        let rx = self.listeners.register_once(&id);
        let _guard = ListenerGuard::new(self.listeners.clone(), id);

        self.post(channel, request)?;

        let payload = rx.await.map_err(|_| SoundboyError::TransportClosed)?;
        Ok(serde_json::from_str(&payload)?)
    }

    /// `fetch` bounded by `timeout`
    ///
    /// The listener is detached when the timeout fires, so a late reply is
    /// dropped.
    pub async fn fetch_timeout(
        &self,
        channel: &str,
        request: Request,
        timeout: Duration,
    ) -> Result<Response> {
        match tokio::time::timeout(timeout, self.fetch(channel, request)).await {
            Ok(response) => response,
            Err(_) => {
                log::warn!("No response on {} within {:?}", channel, timeout);
                Err(SoundboyError::Timeout {
                    channel: channel.to_string(),
                })
            }
        }
    }

    /// Send a request and receive every response up to and including the
    /// first one marked `done`
    pub fn stream(&self, channel: &str, mut request: Request) -> Result<ResponseStream> {
        let id = request.ensure_response_channel(channel);
        let rx = self.listeners.register_stream(&id);

        let stream = ResponseStream {
            id,
            rx,
            listeners: self.listeners.clone(),
            outbound: self.outbound.clone(),
            finished: false,
        };

        self.post(channel, request)?;
        Ok(stream)
    }

    fn post(&self, channel: &str, request: Request) -> Result<()> {
        log::debug!(
            "-> {} ({})",
            channel,
            request.response_channel.as_deref().unwrap_or("-")
        );
        self.outbound
            .send(ProtocolMessage::request(channel, request))
            .map_err(|_| SoundboyError::TransportClosed)
    }
}

async fn route_responses<R: AsyncRead + Unpin>(reader: R, listeners: ListenerRegistry) {
    let mut messages = MessageReader::new(reader);

    loop {
        match messages.next().await {
            Ok(Some(message)) => {
                let ProtocolMessage {
                    channel, params, ..
                } = message;
                let payload = params.into_iter().next().unwrap_or_else(|| "{}".to_string());
                if !listeners.deliver(&channel, payload) {
                    log::debug!("No listener on {}, dropping response", channel);
                }
            }
            Ok(None) => break,
            Err(e) => {
                log::warn!("Transport read failed: {}", e);
                break;
            }
        }
    }

    log::debug!("Response router stopped");
    listeners.close_all();
}

/// Responses to a streaming request, in arrival order
///
/// Ends after the first `done` response. Dropping the stream before that
/// detaches the listener and asks the responder to cancel the request.
pub struct ResponseStream {
    id: String,
    rx: mpsc::UnboundedReceiver<String>,
    listeners: ListenerRegistry,
    outbound: mpsc::UnboundedSender<ProtocolMessage>,
    finished: bool,
}

impl ResponseStream {
    /// Response channel this stream listens on
    pub fn response_channel(&self) -> &str {
        &self.id
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) {
        self.finished = true;
        self.listeners.remove(&self.id);
        self.rx.close();
    }
}

impl Stream for ResponseStream {
    type Item = Result<Response>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(payload)) => match serde_json::from_str::<Response>(&payload) {
                Ok(response) => {
                    if response.done {
                        this.finish();
                    }
                    Poll::Ready(Some(Ok(response)))
                }
                Err(e) => Poll::Ready(Some(Err(e.into()))),
            },
            Poll::Ready(None) => {
                // Connection went away before the terminal message
                this.finish();
                Poll::Ready(Some(Err(SoundboyError::TransportClosed)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ResponseStream {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.listeners.remove(&self.id);

        log::debug!("Stream {} dropped early, requesting cancellation", self.id);
        let cancel = ProtocolMessage {
            channel: channels::CANCEL_REQUEST.to_string(),
            response_channel: None,
            params: vec![self.id.clone()],
        };
        let _ = self.outbound.send(cancel);
    }
}
