//! New-visit capture and before/after progress comparison.
//!
//! Analysis never touches the store: a capture is analyzed first, then the
//! visit and its image are written in one short store step. The image row is
//! linked through the id of the visit row just inserted.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::{self, decode_image_data, AnalysisEngine, AnalysisError, ImageAnalysis, ProgressAnalysis};
use crate::authorization::{check_patient_access, require_role, Access, AuthorizationError};
use crate::db::{self, DatabaseError, Store};
use crate::models::{NewImage, NewProgressMetric, NewVisit, Role, SkinImage, METRIC_AFFECTED_AREA};
use crate::session::SessionRecord;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthorizationError),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Image {image_id} does not belong to patient {patient_id}")]
    ImageNotForPatient { image_id: i64, patient_id: i64 },
}

// ═══════════════════════════════════════════════════════════
// New visit
// ═══════════════════════════════════════════════════════════

/// Clinician-entered fields of a new visit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisitForm {
    pub patient_id: i64,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub treatment_plan: Option<String>,
}

/// A captured image together with its analysis results.
#[derive(Debug, Clone)]
pub struct AnalyzedCapture {
    /// Payload as captured, stored verbatim in the image row.
    pub payload: String,
    pub mime_type: Option<String>,
    pub body_part: Option<String>,
    pub analysis: ImageAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedVisit {
    pub visit_id: i64,
    pub image_id: Option<i64>,
}

/// Decode a captured payload and run prediction plus heatmap generation.
pub async fn analyze_capture(
    engine: Arc<dyn AnalysisEngine>,
    payload: String,
    body_part: Option<String>,
) -> Result<AnalyzedCapture, CaptureError> {
    let decoded = decode_image_data(&payload)?;
    let analysis = analysis::analyze_image(engine, decoded.bytes).await?;
    tracing::info!(
        predictions = analysis.predictions.len(),
        regions = analysis.heatmap.regions.len(),
        "Capture analyzed"
    );
    Ok(AnalyzedCapture {
        payload,
        mime_type: decoded.mime_type,
        body_part,
        analysis,
    })
}

/// Store a visit for a patient the clinician owns, plus the analyzed image if any.
pub fn save_visit(
    store: &mut Store,
    session: Option<&SessionRecord>,
    form: &VisitForm,
    capture: Option<&AnalyzedCapture>,
) -> Result<SavedVisit, CaptureError> {
    let clinician = require_role(session, Role::Clinician)?;
    check_patient_access(store, Some(clinician), form.patient_id, Access::Write)?;

    let visit_id = db::insert_visit(
        store,
        &NewVisit {
            patient_id: form.patient_id,
            clinician_id: clinician.id,
            diagnosis: form.diagnosis.clone(),
            notes: form.notes.clone(),
            treatment_plan: form.treatment_plan.clone(),
            ..NewVisit::default()
        },
    )?;

    let image_id = match capture {
        Some(capture) => {
            let image = NewImage {
                visit_id,
                image_data: capture.payload.clone(),
                image_type: capture.mime_type.clone(),
                body_part: capture.body_part.clone(),
                ..NewImage::default()
            }
            .with_analysis(&capture.analysis.predictions, &capture.analysis.heatmap)?;
            Some(db::insert_image(store, &image)?)
        }
        None => None,
    };

    tracing::info!(visit_id, patient_id = form.patient_id, ?image_id, "Visit saved");
    Ok(SavedVisit { visit_id, image_id })
}

// ═══════════════════════════════════════════════════════════
// Progress comparison
// ═══════════════════════════════════════════════════════════

/// Two stored images of one patient, decoded and ready for comparison.
#[derive(Debug, Clone)]
pub struct ComparisonInput {
    pub patient_id: i64,
    pub before: SkinImage,
    pub after: SkinImage,
    before_bytes: Vec<u8>,
    after_bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedProgress {
    pub metric_id: i64,
    pub analysis: ProgressAnalysis,
}

/// Load and check both images. The owning clinician only.
pub fn prepare_comparison(
    store: &mut Store,
    session: Option<&SessionRecord>,
    patient_id: i64,
    before_image_id: i64,
    after_image_id: i64,
) -> Result<ComparisonInput, CaptureError> {
    let clinician = require_role(session, Role::Clinician)?;
    check_patient_access(store, Some(clinician), patient_id, Access::Write)?;

    let before = load_patient_image(store, patient_id, before_image_id)?;
    let after = load_patient_image(store, patient_id, after_image_id)?;
    let before_bytes = decode_image_data(&before.image_data)?.bytes;
    let after_bytes = decode_image_data(&after.image_data)?.bytes;

    Ok(ComparisonInput {
        patient_id,
        before,
        after,
        before_bytes,
        after_bytes,
    })
}

fn load_patient_image(store: &mut Store, patient_id: i64, image_id: i64) -> Result<SkinImage, CaptureError> {
    let image = db::get_image(store, image_id)?.ok_or_else(|| DatabaseError::not_found("image", image_id))?;
    let owner = db::get_visit(store, image.visit_id)?.map(|v| v.patient_id);
    if owner != Some(patient_id) {
        return Err(CaptureError::ImageNotForPatient { image_id, patient_id });
    }
    Ok(image)
}

/// Run the progress analyzer over a prepared pair.
pub async fn run_comparison(
    engine: Arc<dyn AnalysisEngine>,
    input: &ComparisonInput,
) -> Result<ProgressAnalysis, CaptureError> {
    let analysis =
        analysis::compare_images(engine, input.before_bytes.clone(), input.after_bytes.clone()).await?;
    Ok(analysis)
}

/// Persist a comparison as an `affected_area` metric on the later image's visit.
pub fn record_progress(
    store: &mut Store,
    input: &ComparisonInput,
    analysis: ProgressAnalysis,
) -> Result<RecordedProgress, CaptureError> {
    let metric_id = db::insert_progress_metric(
        store,
        &NewProgressMetric {
            patient_id: input.patient_id,
            visit_id: input.after.visit_id,
            metric_type: Some(METRIC_AFFECTED_AREA.to_string()),
            metric_value: Some(analysis.metrics.change_percent),
            comparison_data: Some(serde_json::to_string(&analysis)?),
        },
    )?;
    tracing::info!(metric_id, patient_id = input.patient_id, "Progress recorded");
    Ok(RecordedProgress { metric_id, analysis })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::MockAnalysisEngine;
    use crate::db::test_support::test_store;
    use crate::models::NewPatient;

    const JPEG: &str = "data:image/jpeg;base64,/9j/4AAQSkZJRgABAQ==";

    fn engine() -> Arc<dyn AnalysisEngine> {
        Arc::new(MockAnalysisEngine::instant())
    }

    fn doctor() -> SessionRecord {
        SessionRecord {
            id: 1,
            email: "doctor@derma.app".into(),
            role: Role::Clinician,
        }
    }

    fn form() -> VisitForm {
        VisitForm {
            patient_id: 1,
            diagnosis: Some("Eczema".into()),
            notes: Some("Flare on left forearm".into()),
            treatment_plan: Some("Topical steroid, 2 weeks".into()),
        }
    }

    #[tokio::test]
    async fn capture_is_linked_to_inserted_visit() {
        let mut store = test_store();
        let capture = analyze_capture(engine(), JPEG.to_string(), Some("forearm".into()))
            .await
            .unwrap();
        assert_eq!(capture.mime_type.as_deref(), Some("image/jpeg"));

        let saved = save_visit(&mut store, Some(&doctor()), &form(), Some(&capture)).unwrap();
        let image_id = saved.image_id.unwrap();

        let image = db::get_image(&mut store, image_id).unwrap().unwrap();
        assert_eq!(image.visit_id, saved.visit_id);
        assert_eq!(image.image_data, JPEG);
        assert_eq!(image.body_part.as_deref(), Some("forearm"));
        assert_eq!(image.predictions().unwrap().unwrap().len(), 3);
        assert_eq!(image.heatmap().unwrap().unwrap().regions.len(), 4);

        let visit = db::get_visit(&mut store, saved.visit_id).unwrap().unwrap();
        assert!(visit.is_active());
        assert_eq!(visit.clinician_id, 1);
        assert_eq!(visit.diagnosis.as_deref(), Some("Eczema"));
    }

    #[test]
    fn visit_without_capture() {
        let mut store = test_store();
        let saved = save_visit(&mut store, Some(&doctor()), &form(), None).unwrap();
        assert!(saved.image_id.is_none());
        assert!(db::list_images_for_visit(&mut store, saved.visit_id).unwrap().is_empty());
    }

    #[test]
    fn only_owning_clinician_saves() {
        let mut store = test_store();
        let stranger = SessionRecord { id: 7, ..doctor() };
        assert!(matches!(
            save_visit(&mut store, Some(&stranger), &form(), None),
            Err(CaptureError::Authorization(AuthorizationError::Forbidden))
        ));

        let patient = SessionRecord {
            id: 2,
            email: "patient@derma.app".into(),
            role: Role::Patient,
        };
        assert!(matches!(
            save_visit(&mut store, Some(&patient), &form(), None),
            Err(CaptureError::Authorization(AuthorizationError::WrongRole(_)))
        ));
        assert_eq!(db::count_visits_for_patient(&mut store, 1).unwrap(), 0);
    }

    #[tokio::test]
    async fn invalid_capture_rejected_before_analysis() {
        let result = analyze_capture(engine(), "data:image/png,raw".into(), None).await;
        assert!(matches!(result, Err(CaptureError::Analysis(AnalysisError::InvalidImage(_)))));
    }

    async fn two_visits_with_images(store: &mut Store) -> (i64, i64) {
        let capture = analyze_capture(engine(), JPEG.to_string(), None).await.unwrap();
        let first = save_visit(store, Some(&doctor()), &form(), Some(&capture)).unwrap();
        let second = save_visit(store, Some(&doctor()), &form(), Some(&capture)).unwrap();
        (first.image_id.unwrap(), second.image_id.unwrap())
    }

    #[tokio::test]
    async fn comparison_records_metric() {
        let mut store = test_store();
        let (before, after) = two_visits_with_images(&mut store).await;

        let input = prepare_comparison(&mut store, Some(&doctor()), 1, before, after).unwrap();
        let analysis = run_comparison(engine(), &input).await.unwrap();
        let recorded = record_progress(&mut store, &input, analysis).unwrap();

        let metrics = db::list_progress_for_patient(&mut store, 1).unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].id, recorded.metric_id);
        assert_eq!(metrics[0].visit_id, input.after.visit_id);
        assert_eq!(metrics[0].metric_value, Some(-28.3));

        let stored: ProgressAnalysis =
            serde_json::from_str(metrics[0].comparison_data.as_deref().unwrap()).unwrap();
        assert_eq!(stored, recorded.analysis);
    }

    #[tokio::test]
    async fn comparison_rejects_foreign_image() {
        let mut store = test_store();
        let (before, _) = two_visits_with_images(&mut store).await;
        let other = db::insert_patient(
            &mut store,
            &NewPatient {
                clinician_id: 1,
                first_name: "Jane".into(),
                last_name: "Roe".into(),
                ..NewPatient::default()
            },
        )
        .unwrap();
        let capture = analyze_capture(engine(), JPEG.to_string(), None).await.unwrap();
        let foreign = save_visit(
            &mut store,
            Some(&doctor()),
            &VisitForm {
                patient_id: other,
                ..form()
            },
            Some(&capture),
        )
        .unwrap();

        let result = prepare_comparison(&mut store, Some(&doctor()), 1, before, foreign.image_id.unwrap());
        assert!(matches!(result, Err(CaptureError::ImageNotForPatient { .. })));
    }
}
