use rusqlite::params;

use super::parse_timestamp;
use crate::db::{DatabaseError, Store};
use crate::models::*;

fn image_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SkinImage> {
    Ok(SkinImage {
        id: row.get(0)?,
        visit_id: row.get(1)?,
        image_data: row.get(2)?,
        image_type: row.get(3)?,
        body_part: row.get(4)?,
        notes: row.get(5)?,
        ai_analysis: row.get(6)?,
        heatmap_data: row.get(7)?,
        created_at: row.get::<_, Option<String>>(8)?.as_deref().and_then(parse_timestamp),
    })
}

pub fn insert_image(store: &mut Store, image: &NewImage) -> Result<i64, DatabaseError> {
    store.execute(
        "INSERT INTO images (visit_id, image_data, image_type, body_part, notes, ai_analysis, heatmap_data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            image.visit_id,
            image.image_data,
            image.image_type,
            image.body_part,
            image.notes,
            image.ai_analysis,
            image.heatmap_data,
        ],
    )?;
    store.last_insert_rowid()
}

pub fn get_image(store: &mut Store, id: i64) -> Result<Option<SkinImage>, DatabaseError> {
    store.query_first(
        "SELECT id, visit_id, image_data, image_type, body_part, notes, ai_analysis, heatmap_data, created_at
         FROM images WHERE id = ?1",
        params![id],
        image_from_row,
    )
}

pub fn list_images_for_visit(store: &mut Store, visit_id: i64) -> Result<Vec<SkinImage>, DatabaseError> {
    store.query_map(
        "SELECT id, visit_id, image_data, image_type, body_part, notes, ai_analysis, heatmap_data, created_at
         FROM images WHERE visit_id = ?1
         ORDER BY id",
        params![visit_id],
        image_from_row,
    )
}

/// Every image across a patient's visits, newest visit first.
pub fn list_images_for_patient(store: &mut Store, patient_id: i64) -> Result<Vec<SkinImage>, DatabaseError> {
    store.query_map(
        "SELECT i.id, i.visit_id, i.image_data, i.image_type, i.body_part, i.notes, i.ai_analysis, i.heatmap_data, i.created_at
         FROM images i
         JOIN visits v ON v.id = i.visit_id
         WHERE v.patient_id = ?1
         ORDER BY v.visit_date DESC, v.id DESC, i.id",
        params![patient_id],
        image_from_row,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Heatmap, HeatmapRegion, Prediction};
    use crate::db::test_support::test_store;
    use crate::db::{insert_patient, insert_visit};

    fn visit_for(store: &mut Store, patient_id: i64) -> i64 {
        insert_visit(
            store,
            &NewVisit {
                patient_id,
                clinician_id: 1,
                ..NewVisit::default()
            },
        )
        .unwrap()
    }

    fn image_for(visit_id: i64) -> NewImage {
        NewImage {
            visit_id,
            image_data: "data:image/png;base64,iVBORw0KGgo=".into(),
            image_type: Some("image/png".into()),
            body_part: Some("left forearm".into()),
            ..NewImage::default()
        }
    }

    #[test]
    fn insert_with_analysis_then_decode() {
        let mut store = test_store();
        let visit_id = visit_for(&mut store, 1);

        let predictions = vec![Prediction {
            condition: "Psoriasis".into(),
            confidence: 0.87,
            description: "Chronic autoimmune condition".into(),
        }];
        let heatmap = Heatmap {
            regions: vec![HeatmapRegion {
                x: 120.0,
                y: 80.0,
                intensity: 0.9,
                label: "High concern area".into(),
            }],
        };
        let input = image_for(visit_id).with_analysis(&predictions, &heatmap).unwrap();
        let id = insert_image(&mut store, &input).unwrap();

        let stored = get_image(&mut store, id).unwrap().unwrap();
        assert_eq!(stored.visit_id, visit_id);
        assert_eq!(stored.predictions().unwrap().unwrap(), predictions);
        assert_eq!(stored.heatmap().unwrap().unwrap(), heatmap);
        assert!(stored.created_at.is_some());
    }

    #[test]
    fn image_without_analysis() {
        let mut store = test_store();
        let visit_id = visit_for(&mut store, 1);
        let id = insert_image(&mut store, &image_for(visit_id)).unwrap();
        let stored = get_image(&mut store, id).unwrap().unwrap();
        assert!(stored.predictions().unwrap().is_none());
        assert!(stored.heatmap().unwrap().is_none());
    }

    #[test]
    fn lists_by_visit_and_by_patient() {
        let mut store = test_store();
        let other_patient = insert_patient(
            &mut store,
            &NewPatient {
                clinician_id: 1,
                first_name: "Jane".into(),
                last_name: "Roe".into(),
                ..NewPatient::default()
            },
        )
        .unwrap();

        let v1 = visit_for(&mut store, 1);
        let v2 = visit_for(&mut store, 1);
        let v3 = visit_for(&mut store, other_patient);
        let a = insert_image(&mut store, &image_for(v1)).unwrap();
        let b = insert_image(&mut store, &image_for(v1)).unwrap();
        let c = insert_image(&mut store, &image_for(v2)).unwrap();
        insert_image(&mut store, &image_for(v3)).unwrap();

        let for_visit: Vec<i64> = list_images_for_visit(&mut store, v1)
            .unwrap()
            .iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(for_visit, vec![a, b]);

        let for_patient: Vec<i64> = list_images_for_patient(&mut store, 1)
            .unwrap()
            .iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(for_patient, vec![c, a, b]);
    }

    #[test]
    fn image_data_is_required() {
        let mut store = test_store();
        let result = store.execute("INSERT INTO images (visit_id) VALUES (1)", []);
        assert!(matches!(result, Err(DatabaseError::Query(_))));
    }
}
