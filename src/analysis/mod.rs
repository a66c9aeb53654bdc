//! Image analysis capabilities.
//!
//! Three narrow traits stand in for a future model: condition prediction,
//! concern heatmaps and before/after comparison. The shipped implementation
//! is [`MockAnalysisEngine`]. Calls are synchronous and may block for
//! seconds; the async helpers move them onto Tokio's blocking pool. A call
//! cannot be aborted once started.

pub mod image_data;
pub mod mock;
pub mod types;

use std::sync::Arc;

use thiserror::Error;

pub use image_data::{decode_image_data, DecodedImage};
pub use mock::MockAnalysisEngine;
pub use types::*;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid image payload: {0}")]
    InvalidImage(String),

    #[error("Image payload is empty")]
    EmptyImage,

    #[error("Analysis engine failed: {0}")]
    Engine(String),
}

pub trait Analyzer: Send + Sync {
    /// Candidate conditions, most likely first.
    fn predict(&self, image: &[u8]) -> Result<Vec<Prediction>, AnalysisError>;
}

pub trait HeatmapGenerator: Send + Sync {
    fn generate_heatmap(&self, image: &[u8]) -> Result<Heatmap, AnalysisError>;
}

pub trait ProgressAnalyzer: Send + Sync {
    fn analyze_progress(&self, before: &[u8], after: &[u8]) -> Result<ProgressAnalysis, AnalysisError>;
}

/// All three capabilities behind one object.
pub trait AnalysisEngine: Analyzer + HeatmapGenerator + ProgressAnalyzer {}

impl<T: Analyzer + HeatmapGenerator + ProgressAnalyzer> AnalysisEngine for T {}

/// Predictions plus heatmap for one captured image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAnalysis {
    pub predictions: Vec<Prediction>,
    pub heatmap: Heatmap,
}

/// Run prediction then heatmap generation on the blocking pool.
pub async fn analyze_image(
    engine: Arc<dyn AnalysisEngine>,
    image: Vec<u8>,
) -> Result<ImageAnalysis, AnalysisError> {
    run_blocking(move || {
        let predictions = engine.predict(&image)?;
        let heatmap = engine.generate_heatmap(&image)?;
        Ok(ImageAnalysis { predictions, heatmap })
    })
    .await
}

/// Compare two images on the blocking pool.
pub async fn compare_images(
    engine: Arc<dyn AnalysisEngine>,
    before: Vec<u8>,
    after: Vec<u8>,
) -> Result<ProgressAnalysis, AnalysisError> {
    run_blocking(move || engine.analyze_progress(&before, &after)).await
}

async fn run_blocking<T, F>(f: F) -> Result<T, AnalysisError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AnalysisError> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!("Analysis task failed: {e}");
        AnalysisError::Engine(e.to_string())
    })?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Arc<dyn AnalysisEngine> {
        Arc::new(MockAnalysisEngine::instant())
    }

    #[tokio::test]
    async fn analyze_image_returns_both_results() {
        let analysis = analyze_image(engine(), vec![1, 2, 3]).await.unwrap();
        assert_eq!(analysis.predictions.len(), 3);
        assert_eq!(analysis.heatmap.regions.len(), 4);
    }

    #[tokio::test]
    async fn compare_images_returns_progress() {
        let progress = compare_images(engine(), vec![1], vec![2]).await.unwrap();
        assert_eq!(progress.metrics.before, 145.0);
    }

    #[tokio::test]
    async fn errors_pass_through() {
        let result = analyze_image(engine(), Vec::new()).await;
        assert!(matches!(result, Err(AnalysisError::EmptyImage)));
    }

    struct PanickingEngine;

    impl Analyzer for PanickingEngine {
        fn predict(&self, _image: &[u8]) -> Result<Vec<Prediction>, AnalysisError> {
            panic!("model crashed")
        }
    }

    impl HeatmapGenerator for PanickingEngine {
        fn generate_heatmap(&self, _image: &[u8]) -> Result<Heatmap, AnalysisError> {
            Ok(Heatmap::default())
        }
    }

    impl ProgressAnalyzer for PanickingEngine {
        fn analyze_progress(&self, _b: &[u8], _a: &[u8]) -> Result<ProgressAnalysis, AnalysisError> {
            Err(AnalysisError::Engine("unsupported".into()))
        }
    }

    #[tokio::test]
    async fn panicking_engine_becomes_engine_error() {
        let result = analyze_image(Arc::new(PanickingEngine), vec![1]).await;
        assert!(matches!(result, Err(AnalysisError::Engine(_))));
    }
}
