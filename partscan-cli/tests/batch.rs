//! Batch runs against a stateless fake service.

use async_trait::async_trait;
use partscan_cli::batch::run_batch;
use partscan_gemini::{Credential, InferenceRequest, Part};
use partscan_pipeline::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Reads 5K0937087 off every image and confirms it.
struct Reader {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl InferenceService for Reader {
    async fn generate(
        &self,
        _credential: &Credential,
        request: &InferenceRequest,
    ) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = request
            .parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<String>();

        if let Some(rest) = prompt.strip_prefix("Your task is to find the number ") {
            let number = rest.split(" in the provided image").next().unwrap_or_default();
            return Ok(format!("<START>{number}<END>"));
        }
        if prompt.starts_with("Candidate part number:") {
            return Ok("<VALID>".to_string());
        }
        Ok("<START> 5K0937087 <END>".to_string())
    }
}

fn write_images(dir: &tempfile::TempDir, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let path = dir.path().join(format!("img{i}.jpg"));
            std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
            path
        })
        .collect()
}

fn config() -> PipelineConfig {
    PipelineConfig::default().with_retry(RetryPolicy::immediate())
}

#[tokio::test]
async fn test_batch_processes_every_image_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let images = write_images(&dir, 5);
    let calls = Arc::new(AtomicUsize::new(0));
    let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];

    let lines = run_batch(
        images.clone(),
        &keys,
        2,
        &BrandProfile::fallback("audi"),
        &config(),
        || Reader {
            calls: Arc::clone(&calls),
        },
    )
    .await
    .unwrap();

    assert_eq!(lines.len(), 5);
    for (line, path) in lines.iter().zip(&images) {
        assert_eq!(line.image, path.display().to_string());
        assert_eq!(line.result, "5K0 937 087");
        assert_eq!(line.attempts, 1);
        assert!(line.error.is_none());
    }
    assert_eq!(lines[0].worker, 0);
    assert_eq!(lines[1].worker, 1);
    // Extract, validate, finalize per image.
    assert_eq!(calls.load(Ordering::SeqCst), 15);
}

#[tokio::test]
async fn test_unreadable_image_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let mut images = write_images(&dir, 2);
    images.insert(1, dir.path().join("missing.jpg"));
    let calls = Arc::new(AtomicUsize::new(0));

    let lines = run_batch(
        images,
        &["only".to_string()],
        1,
        &BrandProfile::fallback("audi"),
        &config(),
        || Reader {
            calls: Arc::clone(&calls),
        },
    )
    .await
    .unwrap();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1].result, "NONE");
    assert!(lines[1].error.as_deref().unwrap().contains("missing.jpg"));
    assert_eq!(lines[2].result, "5K0 937 087");

    let json = serde_json::to_value(&lines[0]).unwrap();
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn test_batch_without_keys_fails() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let result = run_batch(
        write_images(&dir, 1),
        &[],
        1,
        &BrandProfile::fallback("audi"),
        &config(),
        || Reader {
            calls: Arc::clone(&calls),
        },
    )
    .await;

    assert!(matches!(result, Err(partscan_cli::CliError::Gemini(_))));
}
