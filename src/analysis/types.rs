use serde::{Deserialize, Serialize};

/// One candidate condition for an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub condition: String,
    /// 0.0 to 1.0.
    pub confidence: f64,
    pub description: String,
}

/// Regions of concern over an image, in image pixel coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Heatmap {
    pub regions: Vec<HeatmapRegion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapRegion {
    pub x: f64,
    pub y: f64,
    pub intensity: f64,
    pub label: String,
}

/// Before/after comparison of two images of the same area.
///
/// Serialized with camelCase keys, the shape stored in `comparison_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressAnalysis {
    /// Percentage points of improvement.
    pub improvement: f64,
    /// Relative change of the affected area, in percent.
    pub area_change: f64,
    pub summary: String,
    pub metrics: ProgressMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressMetrics {
    pub before: f64,
    pub after: f64,
    pub change_percent: f64,
}
