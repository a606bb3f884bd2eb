//! Typed client for the sound channels

use crate::error::{ErrorInfo, Result, SoundboyError};
use crate::model::{AnalysisRequest, SoundMetadata, SoundQuery};
use crate::protocol::{channels, transport, IpcClient, Request, Response, ResponseStream};
use futures::StreamExt;
use serde::Deserialize;
use std::path::Path;

/// What `analyze_with` saw before the batch finished
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisReport {
    /// Files analyzed successfully
    pub analyzed: usize,
    /// Failed files with their errors
    pub failed: Vec<(String, ErrorInfo)>,
}

impl AnalysisReport {
    pub fn total(&self) -> usize {
        self.analyzed + self.failed.len()
    }
}

#[derive(Deserialize)]
struct ClearResult {
    removed: usize,
}

/// Calls the sound channels over an `IpcClient`
#[derive(Clone)]
pub struct SoundClient {
    ipc: IpcClient,
}

impl SoundClient {
    pub fn new(ipc: IpcClient) -> Self {
        Self { ipc }
    }

    /// Client bound to the process-wide transport
    pub fn from_transport() -> Result<Self> {
        Ok(Self::new(transport::current()?))
    }

    pub fn ipc(&self) -> &IpcClient {
        &self.ipc
    }

    /// Remove every stored record; returns how many were removed
    pub async fn clear_sounds(&self) -> Result<usize> {
        let response = self.ipc.fetch(channels::CLEAR_SOUNDS, Request::new()).await?;
        let cleared: ClearResult = response.into_result()?;
        Ok(cleared.removed)
    }

    /// Store one record
    pub async fn insert_sound(&self, record: &SoundMetadata) -> Result<SoundMetadata> {
        let request = Request::new().with_json_param(record)?;
        self.ipc
            .fetch(channels::INSERT_SOUND, request)
            .await?
            .into_result()
    }

    /// Records matching `query`
    pub async fn fetch_sounds(&self, query: &SoundQuery) -> Result<Vec<SoundMetadata>> {
        let request = Request::new().with_json_param(query)?;
        self.ipc
            .fetch(channels::FETCH_SOUNDS, request)
            .await?
            .into_result()
    }

    /// Start analyzing every sound file under `folder`
    ///
    /// Yields one response per file in completion order, then `{ done: true }`.
    pub fn analyze(&self, folder: &Path) -> Result<ResponseStream> {
        let request = Request::new().with_json_param(&AnalysisRequest::new(folder))?;
        self.ipc.stream(channels::ANALYZE_SOUNDS, request)
    }

    /// Analyze `folder`, calling `on_response` for each file
    ///
    /// Failed files are logged and collected in the report. A failure of the
    /// whole batch (for example a missing folder) is returned as `Err`.
    pub async fn analyze_with<F>(&self, folder: &Path, mut on_response: F) -> Result<AnalysisReport>
    where
        F: FnMut(&Response),
    {
        let mut stream = self.analyze(folder)?;
        let mut report = AnalysisReport::default();

        while let Some(item) = stream.next().await {
            let response = item?;

            if response.done {
                if let Some(error) = response.error {
                    return Err(SoundboyError::Remote(error));
                }
                break;
            }

            match &response.error {
                Some(error) => {
                    let filename = response.filename().unwrap_or("<unknown>").to_string();
                    log::error!("Error analyzing '{}'", filename);
                    log::error!("{}", error);
                    report.failed.push((filename, error.clone()));
                }
                None => report.analyzed += 1,
            }
            on_response(&response);
        }

        Ok(report)
    }
}
