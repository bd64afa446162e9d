//! Face ↔ marker matching by maximum IoU.

use super::bbox::{iou, BBox};

/// A Host face-type marker, already converted into the same coordinate
/// frame as the face bboxes being matched against it.
#[derive(Debug, Clone)]
pub struct MarkerRef {
    pub uid: String,
    pub subject_uid: Option<String>,
    pub name: Option<String>,
    pub bbox: BBox,
}

/// Resolved identity triple propagated onto a face record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentityTriple {
    pub marker_uid: Option<String>,
    pub subject_uid: Option<String>,
    pub subject_name: Option<String>,
}

/// Matches a face bbox against a set of face-type markers for the same
/// photo: the marker with maximum IoU, provided IoU ≥ `iou_threshold`. On
/// tie, the lowest marker UID wins.
#[must_use]
pub fn match_face_to_markers(
    face_bbox: &BBox,
    markers: &[MarkerRef],
    iou_threshold: f32,
) -> Option<IdentityTriple> {
    let mut best: Option<(&MarkerRef, f32)> = None;
    for marker in markers {
        let score = iou(face_bbox, &marker.bbox);
        if score < iou_threshold {
            continue;
        }
        best = match best {
            None => Some((marker, score)),
            Some((current, current_score)) => {
                if score > current_score
                    || ((score - current_score).abs() < f32::EPSILON && marker.uid < current.uid)
                {
                    Some((marker, score))
                } else {
                    Some((current, current_score))
                }
            }
        };
    }
    best.map(|(marker, _)| IdentityTriple {
        marker_uid: Some(marker.uid.clone()),
        subject_uid: marker.subject_uid.clone(),
        subject_name: marker.name.clone(),
    })
}

/// Symmetric match used by person-search: given a marker bbox, pick which
/// face row (by index into `faces`) corresponds to it.
#[must_use]
pub fn match_marker_to_faces(
    marker_bbox: &BBox,
    faces: &[(usize, BBox)],
    iou_threshold: f32,
) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for &(idx, bbox) in faces {
        let score = iou(marker_bbox, &bbox);
        if score < iou_threshold {
            continue;
        }
        best = match best {
            None => Some((idx, score)),
            Some((_, current_score)) if score > current_score => Some((idx, score)),
            other => other,
        };
    }
    best.map(|(idx, _)| idx)
}

/// A face is too small to seed a new marker if its bbox width is < 35px
/// OR < 1.5% of image width.
#[must_use]
pub fn is_face_too_small(bbox_width: f32, image_width: f32) -> bool {
    bbox_width < 35.0 || bbox_width < 0.015 * image_width
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(uid: &str, name: &str, bbox: BBox) -> MarkerRef {
        MarkerRef {
            uid: uid.to_string(),
            subject_uid: Some(format!("subj-{uid}")),
            name: Some(name.to_string()),
            bbox,
        }
    }

    #[test]
    fn picks_marker_with_max_iou() {
        let face = BBox::new(0.0, 0.0, 10.0, 10.0);
        let markers = vec![
            marker("m1", "Alice", BBox::new(0.0, 0.0, 9.0, 9.0)),
            marker("m2", "Bob", BBox::new(5.0, 5.0, 15.0, 15.0)),
        ];
        let result = match_face_to_markers(&face, &markers, 0.1).unwrap();
        assert_eq!(result.marker_uid.as_deref(), Some("m1"));
    }

    #[test]
    fn below_threshold_returns_none() {
        let face = BBox::new(0.0, 0.0, 10.0, 10.0);
        let markers = vec![marker("m1", "Alice", BBox::new(100.0, 100.0, 110.0, 110.0))];
        assert!(match_face_to_markers(&face, &markers, 0.3).is_none());
    }

    #[test]
    fn tie_breaks_on_lowest_uid() {
        let face = BBox::new(0.0, 0.0, 10.0, 10.0);
        let markers = vec![
            marker("m2", "Bob", BBox::new(0.0, 0.0, 10.0, 10.0)),
            marker("m1", "Alice", BBox::new(0.0, 0.0, 10.0, 10.0)),
        ];
        let result = match_face_to_markers(&face, &markers, 0.3).unwrap();
        assert_eq!(result.marker_uid.as_deref(), Some("m1"));
    }

    #[test]
    fn empty_marker_set_is_not_an_error() {
        let face = BBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(match_face_to_markers(&face, &[], 0.3).is_none());
    }

    #[test]
    fn marker_to_faces_is_symmetric_choice() {
        let marker_bbox = BBox::new(0.0, 0.0, 10.0, 10.0);
        let faces = vec![
            (0, BBox::new(0.0, 0.0, 9.0, 9.0)),
            (1, BBox::new(50.0, 50.0, 60.0, 60.0)),
        ];
        assert_eq!(match_marker_to_faces(&marker_bbox, &faces, 0.1), Some(0));
    }

    #[test]
    fn small_face_thresholds() {
        assert!(is_face_too_small(30.0, 2000.0)); // below the 35px floor
        assert!(is_face_too_small(25.0, 2000.0)); // below 1.5% of image width (30)
        assert!(!is_face_too_small(50.0, 2000.0));
    }
}
