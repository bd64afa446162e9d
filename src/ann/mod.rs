//! In-memory approximate-nearest-neighbour index (C2).
//!
//! One `AnnIndex<R>` instance exists per vector kind (`R` is the
//! back-reference type: `String` photo UIDs for images, `(String, i32)`
//! photo-uid/face-index pairs for faces). Wraps `hnsw_rs::Hnsw` with a
//! bidirectional handle ↔ back-reference map and a soft-delete set,
//! because `hnsw_rs` graphs don't support true point removal — deleted
//! handles are filtered out of search results and folded away on the next
//! `rebuild`.

use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};

use anndists::dist::DistCosine;
use hnsw_rs::prelude::*;
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::common::errors::{CoreError, CoreResult};

const MAX_NB_CONNECTION: usize = 24;
const MAX_LAYER: usize = 16;
const EF_CONSTRUCTION: usize = 200;
const EF_SEARCH: usize = 64;

/// Internal mutable bookkeeping, separate from the graph itself so the
/// graph can be rebuilt without losing the handle ↔ reference mapping
/// conventions (persisted metadata survives a rebuild).
struct IndexState<R> {
    ref_to_handle: HashMap<R, u64>,
    handle_to_ref: HashMap<u64, R>,
    deleted: std::collections::HashSet<u64>,
    next_handle: u64,
}

impl<R: Eq + Hash + Clone> IndexState<R> {
    fn new() -> Self {
        Self {
            ref_to_handle: HashMap::new(),
            handle_to_ref: HashMap::new(),
            deleted: std::collections::HashSet::new(),
            next_handle: 0,
        }
    }

    fn live_count(&self) -> usize {
        self.ref_to_handle.len() - self.deleted.len()
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedMeta<R> {
    dim: usize,
    entries: Vec<(R, u64)>,
    deleted: Vec<u64>,
    next_handle: u64,
}

/// Per-vector-kind ANN index.
pub struct AnnIndex<R> {
    dim: usize,
    graph: RwLock<Option<Hnsw<'static, f32, DistCosine>>>,
    state: RwLock<IndexState<R>>,
    max_elements: usize,
}

impl<R: Eq + Hash + Clone + Serialize + DeserializeOwned> AnnIndex<R> {
    #[must_use]
    pub fn new(dim: usize, max_elements: usize) -> Self {
        Self {
            dim,
            graph: RwLock::new(None),
            state: RwLock::new(IndexState::new()),
            max_elements,
        }
    }

    fn fresh_graph(&self) -> Hnsw<'static, f32, DistCosine> {
        Hnsw::new(
            MAX_NB_CONNECTION,
            self.max_elements,
            MAX_LAYER,
            EF_CONSTRUCTION,
            DistCosine,
        )
    }

    /// Bulk-loads `vectors` into a fresh graph, replacing any existing
    /// in-memory index. If `path` names an existing, handle-set-consistent
    /// snapshot, loads from it instead.
    pub fn enable(&self, vectors: Vec<(R, Vec<f32>)>, path: Option<&Path>) -> CoreResult<()> {
        if let Some(p) = path {
            if p.with_extension("meta.json").exists() {
                match self.try_load(p, &vectors) {
                    Ok(()) => return Ok(()),
                    Err(e) => {
                        tracing::warn!(error = %e, "ANN snapshot inconsistent with catalogue, rebuilding");
                    }
                }
            }
        }
        self.load_from_scratch(vectors)?;
        if let Some(p) = path {
            self.save(p)?;
        }
        Ok(())
    }

    fn load_from_scratch(&self, vectors: Vec<(R, Vec<f32>)>) -> CoreResult<()> {
        let mut state = IndexState::new();
        let graph = self.fresh_graph();
        let mut batch: Vec<(Vec<f32>, u64)> = Vec::with_capacity(vectors.len());
        for (r, v) in vectors {
            if v.len() != self.dim {
                return Err(CoreError::Invalid(format!(
                    "vector for ANN index has dim {}, expected {}",
                    v.len(),
                    self.dim
                )));
            }
            let handle = state.next_handle;
            state.next_handle += 1;
            state.ref_to_handle.insert(r.clone(), handle);
            state.handle_to_ref.insert(handle, r);
            batch.push((v, handle));
        }
        let insertable: Vec<(&Vec<f32>, usize)> = batch
            .iter()
            .map(|(v, h)| (v, usize::try_from(*h).unwrap_or(usize::MAX)))
            .collect();
        graph.parallel_insert(&insertable);

        *self.state.write() = state;
        *self.graph.write() = Some(graph);
        Ok(())
    }

    fn try_load(&self, path: &Path, current_catalogue: &[(R, Vec<f32>)]) -> CoreResult<()> {
        let meta_path = path.with_extension("meta.json");
        let bytes = std::fs::read(&meta_path)
            .map_err(|e| CoreError::IndexDegraded(format!("reading snapshot meta: {e}")))?;
        let meta: PersistedMeta<R> = serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::IndexDegraded(format!("parsing snapshot meta: {e}")))?;
        if meta.dim != self.dim {
            return Err(CoreError::IndexDegraded("dim mismatch".into()));
        }

        let live_in_snapshot: std::collections::HashSet<&R> = meta
            .entries
            .iter()
            .filter(|(_, h)| !meta.deleted.contains(h))
            .map(|(r, _)| r)
            .collect();
        let live_in_catalogue: std::collections::HashSet<&R> =
            current_catalogue.iter().map(|(r, _)| r).collect();
        if live_in_snapshot != live_in_catalogue {
            return Err(CoreError::IndexDegraded(
                "snapshot handle set drifted from catalogue".into(),
            ));
        }

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CoreError::IndexDegraded("invalid snapshot path".into()))?;
        let mut reloader = HnswIo::new(dir, name);
        let graph: Hnsw<f32, DistCosine> = reloader
            .load_hnsw()
            .map_err(|e| CoreError::IndexDegraded(format!("loading hnsw dump: {e}")))?;

        let mut state = IndexState::new();
        state.next_handle = meta.next_handle;
        for (r, h) in meta.entries {
            state.ref_to_handle.insert(r.clone(), h);
            state.handle_to_ref.insert(h, r);
        }
        state.deleted = meta.deleted.into_iter().collect();

        *self.state.write() = state;
        *self.graph.write() = Some(graph);
        Ok(())
    }

    /// Inserts or replaces a vector for `r`.
    pub fn insert(&self, r: R, vec: &[f32]) -> CoreResult<()> {
        if vec.len() != self.dim {
            return Err(CoreError::Invalid(format!(
                "vector has dim {}, expected {}",
                vec.len(),
                self.dim
            )));
        }
        let graph_guard = self.graph.read();
        let Some(graph) = graph_guard.as_ref() else {
            return Err(CoreError::IndexDegraded("index not enabled".into()));
        };
        let mut state = self.state.write();
        if let Some(&old_handle) = state.ref_to_handle.get(&r) {
            state.deleted.insert(old_handle);
        }
        let handle = state.next_handle;
        state.next_handle += 1;
        state.ref_to_handle.insert(r.clone(), handle);
        state.handle_to_ref.insert(handle, r);
        let handle_usize = usize::try_from(handle).unwrap_or(usize::MAX);
        graph.insert((vec, handle_usize));
        Ok(())
    }

    /// Soft-deletes the entry for `r`, if present.
    pub fn delete(&self, r: &R) {
        let mut state = self.state.write();
        if let Some(&handle) = state.ref_to_handle.get(r) {
            state.deleted.insert(handle);
        }
    }

    /// Returns up to `k` nearest back-references with cosine distance
    /// `<= max_distance`, ascending.
    pub fn search(&self, query: &[f32], k: usize, max_distance: f32) -> CoreResult<Vec<(R, f32)>> {
        if query.len() != self.dim {
            return Err(CoreError::Invalid(format!(
                "query has dim {}, expected {}",
                query.len(),
                self.dim
            )));
        }
        let graph_guard = self.graph.read();
        let Some(graph) = graph_guard.as_ref() else {
            return Err(CoreError::IndexDegraded("index not enabled".into()));
        };
        let state = self.state.read();
        // Over-fetch past soft-deletes so `k` live results still surface.
        let raw = graph.search(query, k + state.deleted.len(), EF_SEARCH);
        let mut out: Vec<(R, f32)> = Vec::with_capacity(k);
        for neighbour in raw {
            let handle = u64::try_from(neighbour.d_id).unwrap_or(u64::MAX);
            if state.deleted.contains(&handle) {
                continue;
            }
            if neighbour.distance > max_distance {
                continue;
            }
            if let Some(r) = state.handle_to_ref.get(&handle) {
                out.push((r.clone(), neighbour.distance));
            }
            if out.len() >= k {
                break;
            }
        }
        out.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(out)
    }

    /// Number of live (non-deleted) entries.
    #[must_use]
    pub fn count(&self) -> usize {
        self.state.read().live_count()
    }

    /// Drops and rebuilds the graph from a fresh catalogue snapshot under
    /// a single exclusive pass.
    pub fn rebuild(&self, vectors: Vec<(R, Vec<f32>)>) -> CoreResult<()> {
        self.load_from_scratch(vectors)
    }

    /// Atomically snapshots the graph + metadata to disk: write to a temp
    /// path, then rename.
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)
            .map_err(|e| CoreError::IndexDegraded(format!("creating snapshot dir: {e}")))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CoreError::IndexDegraded("invalid snapshot path".into()))?;

        let graph_guard = self.graph.read();
        if let Some(graph) = graph_guard.as_ref() {
            graph
                .file_dump(dir, name)
                .map_err(|e| CoreError::IndexDegraded(format!("dumping hnsw graph: {e}")))?;
        }
        drop(graph_guard);

        let state = self.state.read();
        let meta = PersistedMeta {
            dim: self.dim,
            entries: state
                .ref_to_handle
                .iter()
                .map(|(r, h)| (r.clone(), *h))
                .collect(),
            deleted: state.deleted.iter().copied().collect(),
            next_handle: state.next_handle,
        };
        drop(state);

        let meta_path = path.with_extension("meta.json");
        let tmp_path = meta_path.with_extension("meta.json.tmp");
        let json = serde_json::to_vec(&meta)
            .map_err(|e| CoreError::IndexDegraded(format!("serializing snapshot meta: {e}")))?;
        {
            let mut f = std::fs::File::create(&tmp_path)
                .map_err(|e| CoreError::IndexDegraded(format!("writing snapshot meta: {e}")))?;
            use std::io::Write;
            f.write_all(&json)
                .map_err(|e| CoreError::IndexDegraded(format!("writing snapshot meta: {e}")))?;
            f.sync_all()
                .map_err(|e| CoreError::IndexDegraded(format!("fsync snapshot meta: {e}")))?;
        }
        std::fs::rename(&tmp_path, &meta_path)
            .map_err(|e| CoreError::IndexDegraded(format!("renaming snapshot meta: {e}")))?;
        Ok(())
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.graph.read().is_some()
    }
}

/// Registry of the two per-kind ANN indexes (images, faces), constructed
/// once at startup and threaded through as a plain value rather than a
/// hidden global or registration callback.
pub struct AnnRegistry {
    pub images: AnnIndex<String>,
    pub faces: AnnIndex<(String, i32)>,
    pub image_snapshot_path: Option<PathBuf>,
    pub face_snapshot_path: Option<PathBuf>,
}

impl AnnRegistry {
    #[must_use]
    pub fn new(
        image_dim: usize,
        face_dim: usize,
        max_elements: usize,
        image_snapshot_path: Option<PathBuf>,
        face_snapshot_path: Option<PathBuf>,
    ) -> Self {
        Self {
            images: AnnIndex::new(image_dim, max_elements),
            faces: AnnIndex::new(face_dim, max_elements),
            image_snapshot_path,
            face_snapshot_path,
        }
    }

    /// Persists both indexes. Called after the batch/HTTP shutdown drain
    /// completes so the snapshot reflects a quiescent index.
    pub fn save_all(&self) -> CoreResult<()> {
        if let Some(p) = &self.image_snapshot_path {
            self.images.save(p)?;
        }
        if let Some(p) = &self.face_snapshot_path {
            self.faces.save(p)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(dim: usize) -> AnnIndex<String> {
        let index = AnnIndex::new(dim, 1000);
        index
            .load_from_scratch(Vec::new())
            .expect("empty load always succeeds");
        index
    }

    #[test]
    fn round_trip_cosine_search_s1() {
        let index = idx(3);
        index.insert("v1".into(), &[1.0, 0.0, 0.0]).unwrap();
        index.insert("v2".into(), &[0.0, 1.0, 0.0]).unwrap();
        index.insert("v3".into(), &[0.9, 0.1, 0.0]).unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 3, 1.0).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, "v1");
        assert!(results[0].1 < 1e-6);
        assert_eq!(results[1].0, "v3");
        assert_eq!(results[2].0, "v2");
    }

    #[test]
    fn deleted_handles_are_excluded_from_search() {
        let index = idx(2);
        index.insert("a".into(), &[1.0, 0.0]).unwrap();
        index.insert("b".into(), &[1.0, 0.0]).unwrap();
        index.delete(&"a".to_string());

        let results = index.search(&[1.0, 0.0], 5, 1.0).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "b");
    }

    #[test]
    fn threshold_monotonicity() {
        let index = idx(2);
        index.insert("a".into(), &[1.0, 0.0]).unwrap();
        index.insert("b".into(), &[0.0, 1.0]).unwrap();

        let strict = index.search(&[1.0, 0.0], 10, 0.01).unwrap();
        let loose = index.search(&[1.0, 0.0], 10, 2.0).unwrap();
        let strict_refs: std::collections::HashSet<_> =
            strict.iter().map(|(r, _)| r.clone()).collect();
        let loose_refs: std::collections::HashSet<_> =
            loose.iter().map(|(r, _)| r.clone()).collect();
        assert!(strict_refs.is_subset(&loose_refs));
    }

    #[test]
    fn dimension_mismatch_is_invalid() {
        let index = idx(3);
        let err = index.insert("x".into(), &[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, CoreError::Invalid(_)));
    }

    #[test]
    fn snapshot_round_trip_reloads_a_consistent_catalogue() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("images.hnsw");
        let vectors = vec![
            ("v1".to_string(), vec![1.0, 0.0, 0.0]),
            ("v2".to_string(), vec![0.0, 1.0, 0.0]),
        ];

        let saved = AnnIndex::<String>::new(3, 100);
        saved.enable(vectors.clone(), Some(&path)).unwrap();

        let reloaded = AnnIndex::<String>::new(3, 100);
        reloaded.enable(vectors, Some(&path)).unwrap();

        let results = reloaded.search(&[1.0, 0.0, 0.0], 2, 1.0).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "v1");
    }

    #[test]
    fn snapshot_rebuilds_from_scratch_when_catalogue_has_drifted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("images.hnsw");

        let saved = AnnIndex::<String>::new(3, 100);
        saved
            .enable(vec![("v1".to_string(), vec![1.0, 0.0, 0.0])], Some(&path))
            .unwrap();

        // The catalogue now has an extra live entry the snapshot doesn't
        // know about; `enable` should detect the drift and rebuild rather
        // than trusting the stale snapshot.
        let reloaded = AnnIndex::<String>::new(3, 100);
        reloaded
            .enable(
                vec![
                    ("v1".to_string(), vec![1.0, 0.0, 0.0]),
                    ("v2".to_string(), vec![0.0, 1.0, 0.0]),
                ],
                Some(&path),
            )
            .unwrap();
        assert_eq!(reloaded.count(), 2);
    }
}
