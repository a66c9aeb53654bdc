use std::time::Duration;

use super::{
    AnalysisError, Analyzer, Heatmap, HeatmapGenerator, HeatmapRegion, Prediction,
    ProgressAnalysis, ProgressAnalyzer, ProgressMetrics,
};

pub const DEFAULT_PREDICT_DELAY: Duration = Duration::from_millis(1500);
pub const DEFAULT_HEATMAP_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_PROGRESS_DELAY: Duration = Duration::from_millis(2000);

/// Stand-in analysis engine returning fixed results after a fixed delay.
///
/// Output never depends on the image content; only empty input is rejected.
#[derive(Debug, Clone)]
pub struct MockAnalysisEngine {
    pub predict_delay: Duration,
    pub heatmap_delay: Duration,
    pub progress_delay: Duration,
}

impl Default for MockAnalysisEngine {
    fn default() -> Self {
        Self {
            predict_delay: DEFAULT_PREDICT_DELAY,
            heatmap_delay: DEFAULT_HEATMAP_DELAY,
            progress_delay: DEFAULT_PROGRESS_DELAY,
        }
    }
}

impl MockAnalysisEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// No simulated latency.
    pub fn instant() -> Self {
        Self {
            predict_delay: Duration::ZERO,
            heatmap_delay: Duration::ZERO,
            progress_delay: Duration::ZERO,
        }
    }
}

fn simulate(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

fn require_image(image: &[u8]) -> Result<(), AnalysisError> {
    if image.is_empty() {
        Err(AnalysisError::EmptyImage)
    } else {
        Ok(())
    }
}

fn prediction(condition: &str, confidence: f64, description: &str) -> Prediction {
    Prediction {
        condition: condition.into(),
        confidence,
        description: description.into(),
    }
}

fn region(x: f64, y: f64, intensity: f64, label: &str) -> HeatmapRegion {
    HeatmapRegion {
        x,
        y,
        intensity,
        label: label.into(),
    }
}

impl Analyzer for MockAnalysisEngine {
    fn predict(&self, image: &[u8]) -> Result<Vec<Prediction>, AnalysisError> {
        require_image(image)?;
        tracing::debug!(image_len = image.len(), "Running mock prediction");
        simulate(self.predict_delay);
        Ok(vec![
            prediction("Psoriasis", 0.87, "Raised, inflamed patches with silvery scales"),
            prediction("Eczema", 0.72, "Red, itchy inflammation of the skin"),
            prediction(
                "Contact Dermatitis",
                0.45,
                "Localized skin reaction to allergen or irritant",
            ),
        ])
    }
}

impl HeatmapGenerator for MockAnalysisEngine {
    fn generate_heatmap(&self, image: &[u8]) -> Result<Heatmap, AnalysisError> {
        require_image(image)?;
        tracing::debug!(image_len = image.len(), "Generating mock heatmap");
        simulate(self.heatmap_delay);
        Ok(Heatmap {
            regions: vec![
                region(120.0, 80.0, 0.9, "High concern area"),
                region(200.0, 150.0, 0.7, "Moderate concern"),
                region(300.0, 200.0, 0.5, "Mild concern"),
                region(150.0, 250.0, 0.3, "Low concern"),
            ],
        })
    }
}

impl ProgressAnalyzer for MockAnalysisEngine {
    fn analyze_progress(&self, before: &[u8], after: &[u8]) -> Result<ProgressAnalysis, AnalysisError> {
        require_image(before)?;
        require_image(after)?;
        tracing::debug!("Comparing images (mock)");
        simulate(self.progress_delay);
        Ok(ProgressAnalysis {
            improvement: 35.0,
            area_change: -28.0,
            summary: "Significant improvement observed. Affected area reduced by 28%. \
                      Inflammation markers decreased."
                .into(),
            metrics: ProgressMetrics {
                before: 145.0,
                after: 104.0,
                change_percent: -28.3,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const IMAGE: &[u8] = b"\x89PNG\r\n\x1a\n";

    #[test]
    fn predictions_are_ranked() {
        let predictions = MockAnalysisEngine::instant().predict(IMAGE).unwrap();
        let conditions: Vec<&str> = predictions.iter().map(|p| p.condition.as_str()).collect();
        assert_eq!(conditions, vec!["Psoriasis", "Eczema", "Contact Dermatitis"]);
        assert!(predictions.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn heatmap_has_four_regions() {
        let heatmap = MockAnalysisEngine::instant().generate_heatmap(IMAGE).unwrap();
        assert_eq!(heatmap.regions.len(), 4);
        assert_eq!(heatmap.regions[0], region(120.0, 80.0, 0.9, "High concern area"));
        assert_eq!(heatmap.regions[3].label, "Low concern");
    }

    #[test]
    fn progress_values() {
        let analysis = MockAnalysisEngine::instant()
            .analyze_progress(IMAGE, IMAGE)
            .unwrap();
        assert_eq!(analysis.improvement, 35.0);
        assert_eq!(analysis.area_change, -28.0);
        assert_eq!(analysis.metrics.change_percent, -28.3);
        assert_eq!(
            analysis.summary,
            "Significant improvement observed. Affected area reduced by 28%. Inflammation markers decreased."
        );
    }

    #[test]
    fn empty_image_rejected() {
        let engine = MockAnalysisEngine::instant();
        assert!(matches!(engine.predict(&[]), Err(AnalysisError::EmptyImage)));
        assert!(matches!(engine.generate_heatmap(&[]), Err(AnalysisError::EmptyImage)));
        assert!(matches!(
            engine.analyze_progress(IMAGE, &[]),
            Err(AnalysisError::EmptyImage)
        ));
    }

    #[test]
    fn default_delays_match_capture_flow() {
        let engine = MockAnalysisEngine::new();
        assert_eq!(engine.predict_delay, Duration::from_millis(1500));
        assert_eq!(engine.heatmap_delay, Duration::from_millis(1000));
        assert_eq!(engine.progress_delay, Duration::from_millis(2000));
    }

    #[test]
    fn configured_delay_is_observed() {
        let engine = MockAnalysisEngine {
            heatmap_delay: Duration::from_millis(30),
            ..MockAnalysisEngine::instant()
        };
        let started = Instant::now();
        engine.generate_heatmap(IMAGE).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
