//! Geometry & Matching: orientation-aware bbox math, IoU, and
//! face ↔ marker reconciliation helpers shared by the reconciler and the
//! person-search pipeline.

pub mod bbox;
pub mod matching;
pub mod names;

pub use bbox::{iou, original_to_display, pixels, BBox};
pub use matching::{
    is_face_too_small, match_face_to_markers, match_marker_to_faces, IdentityTriple, MarkerRef,
};
pub use names::{name_matches, normalize_person_name};
