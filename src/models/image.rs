use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::analysis::{Heatmap, Prediction};

/// A captured skin image with its stored analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinImage {
    pub id: i64,
    pub visit_id: i64,
    /// Inline payload, usually a `data:image/...;base64,` URL.
    pub image_data: String,
    pub image_type: Option<String>,
    pub body_part: Option<String>,
    pub notes: Option<String>,
    /// JSON array of predictions.
    pub ai_analysis: Option<String>,
    /// JSON heatmap object.
    pub heatmap_data: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl SkinImage {
    /// Decode the stored predictions, if any were recorded.
    pub fn predictions(&self) -> Result<Option<Vec<Prediction>>, serde_json::Error> {
        self.ai_analysis
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
    }

    /// Decode the stored heatmap, if any was recorded.
    pub fn heatmap(&self) -> Result<Option<Heatmap>, serde_json::Error> {
        self.heatmap_data
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewImage {
    pub visit_id: i64,
    pub image_data: String,
    pub image_type: Option<String>,
    pub body_part: Option<String>,
    pub notes: Option<String>,
    pub ai_analysis: Option<String>,
    pub heatmap_data: Option<String>,
}

impl NewImage {
    /// Attach analysis results, serialized the way the image row stores them.
    pub fn with_analysis(
        mut self,
        predictions: &[Prediction],
        heatmap: &Heatmap,
    ) -> Result<Self, serde_json::Error> {
        self.ai_analysis = Some(serde_json::to_string(predictions)?);
        self.heatmap_data = Some(serde_json::to_string(heatmap)?);
        Ok(self)
    }
}
