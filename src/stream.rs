//! Streaming conversion API: emit documents as they complete.
//!
//! Unlike [`crate::convert::convert_batch`], which returns only after every
//! input is done, [`convert_stream`] yields each [`DocumentOutput`] through a
//! `Stream` as soon as it is rendered. Documents may arrive out of input
//! order; a failure is yielded as an `Err` item and the stream carries on.

use crate::config::ConversionConfig;
use crate::convert::convert_document;
use crate::error::DocumentError;
use crate::output::DocumentOutput;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::{info, warn};

/// A boxed stream of converted documents.
pub type DocumentStream = Pin<Box<dyn Stream<Item = Result<DocumentOutput, DocumentError>> + Send>>;

/// Convert `inputs` concurrently, streaming documents as they are ready.
///
/// At most `config.concurrency` documents are in flight. Progress callbacks
/// are not invoked; the stream itself reports progress.
pub fn convert_stream<I, S>(inputs: I, config: &ConversionConfig) -> DocumentStream
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let sources: Vec<String> = inputs.into_iter().map(Into::into).collect();
    info!("Starting streaming conversion of {} documents", sources.len());

    let concurrency = config.concurrency;
    let config_clone = config.clone();

    let s = stream::iter(sources.into_iter().map(move |source| {
        let cfg = config_clone.clone();
        async move {
            convert_document(&source, &cfg).await.map_err(|e| {
                warn!("Document {} failed: {}", source, e);
                DocumentError::from_fatal(&source, &e)
            })
        }
    }))
    .buffer_unordered(concurrency);

    Box::pin(s)
}
