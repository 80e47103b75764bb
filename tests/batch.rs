//! Integration tests for the file, URL and batch layer.
//!
//! All inputs are temporary files; nothing here touches the network.

use md2html::{
    convert, convert_batch, convert_document, convert_sync, convert_to_file,
    ConversionConfig, ConversionProgressCallback, DocumentError, Md2HtmlError,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Route library logs through the test harness (`RUST_LOG=md2html=debug`).
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn write_doc(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path.to_string_lossy().to_string()
}

#[derive(Default)]
struct RecordingCallback {
    started: AtomicUsize,
    completed: AtomicUsize,
    errors: Mutex<Vec<usize>>,
    finished: Mutex<Option<(usize, usize)>>,
}

impl ConversionProgressCallback for RecordingCallback {
    fn on_document_start(&self, _index: usize, _total: usize, _source: &str) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_document_complete(&self, _index: usize, _total: usize, _html_len: usize) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_document_error(&self, index: usize, _total: usize, _error: String) {
        self.errors.lock().unwrap().push(index);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        *self.finished.lock().unwrap() = Some((total, success_count));
    }
}

// ── Single documents ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_convert_document_matches_engine() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let body = "# Notes\n\n- a\n- b";
    let input = write_doc(dir.path(), "notes.md", body);

    let output = convert_document(&input, &ConversionConfig::default())
        .await
        .unwrap();
    assert_eq!(output.html, convert(body));
    assert_eq!(output.source, input);
    assert_eq!(output.stats.input_bytes, body.len());
    assert_eq!(output.stats.output_bytes, output.html.len());
}

#[tokio::test]
async fn test_missing_file_is_fatal() {
    let err = convert_document("/no/such/dir/missing.md", &ConversionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Md2HtmlError::FileNotFound { .. }), "got: {err}");
}

#[tokio::test]
async fn test_non_utf8_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latin1.md");
    std::fs::write(&path, b"caf\xE9").unwrap();

    let err = convert_document(path.to_string_lossy(), &ConversionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Md2HtmlError::NotUtf8 { offset: 3, .. }), "got: {err}");
}

#[tokio::test]
async fn test_convert_to_file_writes_html() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_doc(dir.path(), "in.md", "*hello*");
    let out = dir.path().join("nested/out.html");

    let stats = convert_to_file(&input, &out, &ConversionConfig::default())
        .await
        .unwrap();
    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written, "<p><em>hello</em></p>");
    assert_eq!(stats.output_bytes, written.len());

    // No temp files left next to the output.
    let siblings: Vec<_> = std::fs::read_dir(out.parent().unwrap())
        .unwrap()
        .collect();
    assert_eq!(siblings.len(), 1);
}

#[test]
fn test_standalone_document() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_doc(dir.path(), "page.md", "# Welcome\n\nHi.");
    let config = ConversionConfig::builder().standalone(true).build().unwrap();

    let output = tokio_test::block_on(convert_document(&input, &config)).unwrap();
    assert!(output.html.starts_with("<!DOCTYPE html>"));
    assert!(output.html.contains("<title>Welcome</title>"));
    assert!(output.html.contains("<h1>Welcome</h1>\n<p>Hi.</p>"));
}

#[test]
fn test_convert_sync() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_doc(dir.path(), "s.md", "~~gone~~");
    let output = convert_sync(&input, &ConversionConfig::default()).unwrap();
    assert_eq!(output.html, "<p><s>gone</s></p>");
}

// ── Batches ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_batch_partial_failure_keeps_order() {
    init_logging();
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let inputs = vec![
        write_doc(src.path(), "a.md", "# A"),
        "/no/such/file.md".to_string(),
        write_doc(src.path(), "c.md", "# C"),
    ];

    let cb = Arc::new(RecordingCallback::default());
    let config = ConversionConfig::builder()
        .concurrency(2)
        .progress_callback(cb.clone())
        .build()
        .unwrap();

    let batch = convert_batch(inputs.clone(), Some(out.path()), &config).await;

    let indices: Vec<usize> = batch.documents.iter().map(|d| d.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(batch.stats.total_documents, 3);
    assert_eq!(batch.stats.converted_documents, 2);
    assert_eq!(batch.stats.failed_documents, 1);

    assert!(batch.documents[0].is_success());
    assert!(matches!(
        batch.documents[1].error,
        Some(DocumentError::ReadFailed { .. })
    ));
    assert_eq!(batch.documents[1].source, inputs[1]);

    let a_html: PathBuf = out.path().join("a.html");
    assert_eq!(batch.documents[0].output_path.as_deref(), Some(a_html.as_path()));
    assert_eq!(std::fs::read_to_string(&a_html).unwrap(), "<h1>A</h1>");
    assert_eq!(
        std::fs::read_to_string(out.path().join("c.html")).unwrap(),
        "<h1>C</h1>"
    );

    assert_eq!(cb.started.load(Ordering::SeqCst), 3);
    assert_eq!(cb.completed.load(Ordering::SeqCst), 2);
    assert_eq!(*cb.errors.lock().unwrap(), vec![1]);
    assert_eq!(*cb.finished.lock().unwrap(), Some((3, 2)));
}

#[tokio::test]
async fn test_batch_without_out_dir_writes_nothing() {
    let src = tempfile::tempdir().unwrap();
    let inputs = vec![write_doc(src.path(), "only.md", "text")];

    let batch = convert_batch(inputs, None, &ConversionConfig::default()).await;
    assert_eq!(batch.documents[0].output_path, None);
    assert_eq!(batch.documents[0].html_len, "<p>text</p>".len());
    assert_eq!(std::fs::read_dir(src.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_batch_report_is_json_serialisable() {
    let src = tempfile::tempdir().unwrap();
    let inputs = vec![write_doc(src.path(), "j.md", "x")];
    let batch = convert_batch(inputs, None, &ConversionConfig::default()).await;

    let json = serde_json::to_string(&batch).unwrap();
    assert!(json.contains("\"converted_documents\":1"), "got: {json}");
}

#[tokio::test]
async fn test_empty_batch() {
    let batch = convert_batch(Vec::<String>::new(), None, &ConversionConfig::default()).await;
    assert!(batch.documents.is_empty());
    assert_eq!(batch.stats.total_documents, 0);
}

#[test]
fn test_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RecordingCallback>();
    assert_send_sync::<md2html::NoopProgressCallback>();
}
