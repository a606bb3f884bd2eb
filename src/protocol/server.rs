//! Responding side of the transport

use super::codec::{self, MessageReader};
use super::message::{channels, ProtocolMessage, Response};
use crate::bridge::AnalysisBridge;
use crate::error::{ErrorInfo, Result, SoundboyError};
use crate::model::{AnalysisRequest, SoundMetadata, SoundQuery};
use crate::pool::{CancelToken, WorkerPool};
use crate::store::SoundStore;
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

/// Sends responses for one request
#[derive(Clone)]
pub struct Reply {
    channel: String,
    outbound: mpsc::UnboundedSender<ProtocolMessage>,
}

impl Reply {
    pub fn new(channel: impl Into<String>, outbound: mpsc::UnboundedSender<ProtocolMessage>) -> Self {
        Self {
            channel: channel.into(),
            outbound,
        }
    }

    /// Response channel this reply targets
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn send(&self, response: &Response) -> Result<()> {
        let message = ProtocolMessage::response(&self.channel, response)?;
        self.outbound
            .send(message)
            .map_err(|_| SoundboyError::TransportClosed)
    }
}

/// Cancel tokens of the analysis batches running on one connection
#[derive(Clone, Default)]
struct ActiveBatches {
    tokens: Arc<Mutex<HashMap<String, CancelToken>>>,
}

impl ActiveBatches {
    fn start(&self, id: &str) -> CancelToken {
        let token = CancelToken::new();
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), token.clone());
        token
    }

    fn finish(&self, id: &str) {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    fn cancel(&self, id: &str) -> bool {
        let tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        match tokens.get(id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn cancel_all(&self) {
        let tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        for token in tokens.values() {
            token.cancel();
        }
    }
}

/// Serves the sound channels over a byte stream pair
///
/// Each request runs on its own task, so a long analysis never blocks
/// single-shot requests on the same connection.
pub struct Responder {
    store: Arc<dyn SoundStore>,
    bridge: AnalysisBridge,
}

impl Responder {
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self {
            store: Arc::clone(pool.store()),
            bridge: AnalysisBridge::new(pool),
        }
    }

    /// Handle requests until the peer closes its side
    ///
    /// Batches still running when the connection closes are cancelled.
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let outbound = codec::spawn_writer(writer);
        let active = ActiveBatches::default();
        let mut messages = MessageReader::new(reader);

        log::info!("Responder listening");

        let result = loop {
            let message = match messages.next().await {
                Ok(Some(message)) => message,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            };

            if message.channel == channels::CANCEL_REQUEST {
                for id in &message.params {
                    if active.cancel(id) {
                        log::info!("Cancelling analysis {}", id);
                    }
                }
                continue;
            }

            let Some(response_channel) = message.response_channel.clone() else {
                log::warn!(
                    "Dropping request on {} without a response channel",
                    message.channel
                );
                continue;
            };

            // Register before the next message is read so a cancel that
            // follows right behind the request finds its token
            let cancel = (message.channel == channels::ANALYZE_SOUNDS)
                .then(|| active.start(&response_channel));
            let tracked = cancel.as_ref().map(|_| response_channel.clone());

            let reply = Reply::new(response_channel, outbound.clone());
            let responder = Arc::clone(&self);
            let active = active.clone();
            tokio::spawn(async move {
                responder.handle(message, reply, cancel).await;
                if let Some(id) = tracked {
                    active.finish(&id);
                }
            });
        };

        active.cancel_all();
        log::info!("Responder connection closed");
        result
    }

    async fn handle(&self, message: ProtocolMessage, reply: Reply, cancel: Option<CancelToken>) {
        log::debug!("<- {} ({})", message.channel, reply.channel());

        let result = match message.channel.as_str() {
            channels::CLEAR_SOUNDS => self.clear_sounds(&reply).await,
            channels::INSERT_SOUND => self.insert_sound(&message, &reply).await,
            channels::FETCH_SOUNDS => self.fetch_sounds(&message, &reply).await,
            channels::ANALYZE_SOUNDS => {
                self.analyze_sounds(&message, &reply, cancel.unwrap_or_default())
                    .await
            }
            other => Err(SoundboyError::UnknownChannel(other.to_string())),
        };

        match result {
            Ok(()) => {}
            Err(SoundboyError::TransportClosed) => {
                log::debug!("Peer gone before {} was answered", reply.channel());
            }
            Err(e) => {
                log::warn!("Request on {} failed: {}", message.channel, e);
                let _ = reply.send(&Response::error(ErrorInfo::from(&e)).with_done());
            }
        }
    }

    async fn clear_sounds(&self, reply: &Reply) -> Result<()> {
        let store = Arc::clone(&self.store);
        let removed = blocking(move || store.clear()).await?;
        log::info!("Cleared {} sounds", removed);
        reply.send(&Response::result(json!({ "removed": removed })))
    }

    async fn insert_sound(&self, message: &ProtocolMessage, reply: &Reply) -> Result<()> {
        let payload = message.payload().ok_or_else(|| {
            SoundboyError::InvalidRequest("insert_sound expects a serialized record".to_string())
        })?;
        let record: SoundMetadata = serde_json::from_str(payload)?;

        let store = Arc::clone(&self.store);
        let stored = record.clone();
        blocking(move || store.insert(&stored)).await?;

        reply.send(&Response::result(serde_json::to_value(&record)?))
    }

    async fn fetch_sounds(&self, message: &ProtocolMessage, reply: &Reply) -> Result<()> {
        let query = match message.payload() {
            Some(payload) if !payload.trim().is_empty() => serde_json::from_str(payload)?,
            _ => SoundQuery::all(),
        };

        let store = Arc::clone(&self.store);
        let records = blocking(move || store.query(&query)).await?;
        log::debug!("fetch_sounds matched {} records", records.len());

        reply.send(&Response::result(serde_json::to_value(&records)?))
    }

    async fn analyze_sounds(
        &self,
        message: &ProtocolMessage,
        reply: &Reply,
        cancel: CancelToken,
    ) -> Result<()> {
        let request = parse_analysis_request(message.payload())?;
        log::info!("Analysis requested for {:?}", request.root_folder);

        self.bridge.run(request, reply, cancel).await.map(|_| ())
    }
}

/// Accepts `{"rootFolder": "..."}` or a bare path
fn parse_analysis_request(payload: Option<&str>) -> Result<AnalysisRequest> {
    let payload = payload
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            SoundboyError::InvalidRequest("analyze_sounds expects a root folder".to_string())
        })?;

    if payload.starts_with('{') {
        return Ok(serde_json::from_str(payload)?);
    }
    Ok(AnalysisRequest::new(PathBuf::from(payload)))
}

/// Run store work off the async threads
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| SoundboyError::persistence(format!("store task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_parse_json_request() {
        let request = parse_analysis_request(Some(r#"{"rootFolder":"/music"}"#)).unwrap();
        assert_eq!(request.root_folder, Path::new("/music"));
    }

    #[test]
    fn test_parse_bare_path() {
        let request = parse_analysis_request(Some("/samples/kicks")).unwrap();
        assert_eq!(request.root_folder, Path::new("/samples/kicks"));
    }

    #[test]
    fn test_parse_missing_folder() {
        assert!(matches!(
            parse_analysis_request(None),
            Err(SoundboyError::InvalidRequest(_))
        ));
        assert!(matches!(
            parse_analysis_request(Some("  ")),
            Err(SoundboyError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_active_batches_cancel() {
        let active = ActiveBatches::default();
        let token = active.start("r1");

        assert!(!active.cancel("r2"));
        assert!(active.cancel("r1"));
        assert!(token.is_cancelled());

        active.finish("r1");
        assert!(!active.cancel("r1"));
    }
}
