use std::path::PathBuf;

use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use tracing::info;

use crate::error::SourceError;
use crate::model::{Bar, HistoryRequest};
use crate::source::{PriceSource, within_range};

/// Bars read from a JSON array of [`Bar`] objects on disk.
///
/// The file holds a single symbol; the request's symbol only labels errors
/// and logs.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PriceSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    fn fetch_bars(
        &self,
        request: &HistoryRequest,
    ) -> BoxFuture<'_, Result<Vec<Bar>, Report<SourceError>>> {
        let request = request.clone();
        Box::pin(async move {
            let content = tokio::fs::read_to_string(&self.path)
                .await
                .change_context(SourceError::Io)
                .attach_with(|| format!("path: {}", self.path.display()))?;

            let bars: Vec<Bar> = serde_json::from_str(&content)
                .change_context(SourceError::ResponseParse {
                    source_name: "file".into(),
                })
                .attach_with(|| format!("path: {}", self.path.display()))?;

            info!(
                symbol = %request.symbol,
                path = %self.path.display(),
                read = bars.len(),
                "bar file loaded"
            );

            within_range(bars, &request)
        })
    }
}
