use partscan_gemini::CredentialPool;
use partscan_pipeline::brand::BrandProfile;
use partscan_pipeline::config::PipelineConfig;
use partscan_pipeline::orchestrator::Orchestrator;
use partscan_pipeline::service::InferenceService;
use serde::Serialize;
use std::path::PathBuf;
use tokio::task::JoinSet;

use crate::errors::CliError;
use crate::images::load_image;

/// One line of batch output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchLine {
    /// Image path as given.
    pub image: String,
    /// Worker that processed it.
    pub worker: usize,
    /// Canonical part number, `!`-prefixed when torn, or `NONE`.
    pub result: String,
    /// Extraction attempts used.
    pub attempts: usize,
    /// Set when the image could not be processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Splits keys across workers so each pool is non-empty.
///
/// Key `i` goes to worker `i % workers`. Workers left without a key reuse
/// `keys[w % keys.len()]`.
#[must_use]
pub fn partition_keys(keys: &[String], workers: usize) -> Vec<Vec<String>> {
    let workers = workers.max(1);
    let mut pools: Vec<Vec<String>> = vec![Vec::new(); workers];
    for (i, key) in keys.iter().enumerate() {
        pools[i % workers].push(key.clone());
    }
    if !keys.is_empty() {
        for (w, pool) in pools.iter_mut().enumerate() {
            if pool.is_empty() {
                pool.push(keys[w % keys.len()].clone());
            }
        }
    }
    pools
}

/// Assigns image `i` to worker `i % workers`, keeping each image's input index.
#[must_use]
pub fn partition_images(images: Vec<PathBuf>, workers: usize) -> Vec<Vec<(usize, PathBuf)>> {
    let workers = workers.max(1);
    let mut queues: Vec<Vec<(usize, PathBuf)>> = vec![Vec::new(); workers];
    for (i, image) in images.into_iter().enumerate() {
        queues[i % workers].push((i, image));
    }
    queues
}

/// Runs independent pipelines in parallel, one per worker.
///
/// Each worker owns its credential pool, session and rejected set. Failures
/// on one image are reported in its line and do not stop the batch. Lines
/// are returned in input order.
///
/// # Errors
///
/// Returns `CliError` when keys are missing or a worker task fails.
pub async fn run_batch<S, F>(
    images: Vec<PathBuf>,
    keys: &[String],
    workers: usize,
    profile: &BrandProfile,
    config: &PipelineConfig,
    make_service: F,
) -> Result<Vec<BatchLine>, CliError>
where
    S: InferenceService + 'static,
    F: Fn() -> S,
{
    let workers = workers.clamp(1, images.len().max(1));
    let key_pools = partition_keys(keys, workers);
    let queues = partition_images(images, workers);

    let mut tasks = JoinSet::new();
    for (worker, (keys, queue)) in key_pools.into_iter().zip(queues).enumerate() {
        let credentials = CredentialPool::new(keys)?;
        let mut orchestrator =
            Orchestrator::new(make_service(), credentials, profile.clone(), config.clone());

        tasks.spawn(async move {
            tracing::info!(worker, images = queue.len(), "Worker started");
            let mut lines = Vec::with_capacity(queue.len());
            for (index, path) in queue {
                let line = process(&mut orchestrator, worker, &path).await;
                lines.push((index, line));
            }
            lines
        });
    }

    let mut lines = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        lines.extend(joined?);
    }
    lines.sort_by_key(|(index, _)| *index);
    Ok(lines.into_iter().map(|(_, line)| line).collect())
}

async fn process<S: InferenceService>(
    orchestrator: &mut Orchestrator<S>,
    worker: usize,
    path: &std::path::Path,
) -> BatchLine {
    let mut line = BatchLine {
        image: path.display().to_string(),
        worker,
        result: partscan_pipeline::protocol::NONE.to_string(),
        attempts: 0,
        error: None,
    };

    let image = match load_image(path).await {
        Ok(image) => image,
        Err(e) => {
            tracing::warn!(worker, path = %path.display(), error = %e, "Skipping image");
            line.error = Some(e.to_string());
            return line;
        }
    };

    match orchestrator.identify(&image).await {
        Ok(report) => {
            line.result = report.outcome.to_string();
            line.attempts = report.metrics.total_attempts;
        }
        Err(e) => {
            tracing::error!(worker, path = %path.display(), error = %e, "Identification failed");
            line.error = Some(e.to_string());
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("k{i}")).collect()
    }

    #[test]
    fn test_keys_spread_round_robin() {
        let pools = partition_keys(&keys(5), 2);
        assert_eq!(pools, vec![vec!["k0", "k2", "k4"], vec!["k1", "k3"]]);
    }

    #[test]
    fn test_more_workers_than_keys_share_keys() {
        let pools = partition_keys(&keys(2), 3);
        assert_eq!(pools, vec![vec!["k0"], vec!["k1"], vec!["k0"]]);
    }

    #[test]
    fn test_zero_workers_means_one() {
        assert_eq!(partition_keys(&keys(2), 0).len(), 1);
        assert_eq!(partition_images(vec![PathBuf::from("a")], 0).len(), 1);
    }

    #[test]
    fn test_images_keep_their_index() {
        let queues = partition_images(
            vec!["a".into(), "b".into(), "c".into()],
            2,
        );
        assert_eq!(queues[0], vec![(0, PathBuf::from("a")), (2, PathBuf::from("c"))]);
        assert_eq!(queues[1], vec![(1, PathBuf::from("b"))]);
    }
}
