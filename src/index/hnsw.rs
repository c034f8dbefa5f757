//! HNSW index backed by usearch
//!
//! Approximate nearest-neighbor search for datasets where the linear scan is
//! too slow. Metadata lives in a sidecar JSON file next to the `.usearch`
//! index so filter predicates survive a reload.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use super::{IndexMatch, IndexMetadata, MetadataFilter, VectorIndex};

const INITIAL_CAPACITY: usize = 1000;

/// usearch-backed vector index with persistent metadata sidecar
pub struct HnswIndex {
    index: Index,
    metadata: BTreeMap<u64, IndexMetadata>,
    dimension: usize,
    index_path: PathBuf,
}

impl HnswIndex {
    /// Open or create an index at `path` (a `.usearch` file).
    ///
    /// The metadata sidecar is `{path}.meta.json`; both files are written
    /// together by [`persist`](VectorIndex::persist).
    pub fn open<P: AsRef<Path>>(path: P, dimension: usize) -> Result<Self> {
        let index_path = path.as_ref().to_path_buf();
        if let Some(parent) = index_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = IndexOptions {
            dimensions: dimension,
            metric: MetricKind::Cos, // Cosine distance
            quantization: ScalarKind::F32,
            ..Default::default()
        };

        let index = Index::new(&options).context("Failed to create USearch index")?;
        index.reserve(INITIAL_CAPACITY)?;

        let mut metadata = BTreeMap::new();

        if index_path.exists() {
            index
                .load(index_path.to_str().context("Index path is not valid UTF-8")?)
                .context("Failed to load existing USearch index")?;

            let meta_path = Self::meta_path(&index_path);
            if meta_path.exists() {
                let content = std::fs::read_to_string(&meta_path)
                    .context("Failed to read index metadata sidecar")?;
                metadata = serde_json::from_str(&content)
                    .context("Failed to parse index metadata sidecar")?;
            }
        }

        Ok(Self {
            index,
            metadata,
            dimension,
            index_path,
        })
    }

    fn meta_path(index_path: &Path) -> PathBuf {
        let mut p = index_path.as_os_str().to_owned();
        p.push(".meta.json");
        PathBuf::from(p)
    }

    fn ensure_capacity(&self) -> Result<()> {
        if self.index.size() >= self.index.capacity() {
            self.index
                .reserve(self.index.capacity() * 2)
                .context("Failed to grow USearch index capacity")?;
        }
        Ok(())
    }

    /// Raw search without metadata filtering
    fn search_unfiltered(&self, vector: &[f32], limit: usize) -> Result<Vec<IndexMatch>> {
        let matches = self
            .index
            .search(vector, limit)
            .context("Failed to search USearch index")?;

        Ok(matches
            .keys
            .iter()
            .zip(matches.distances.iter())
            .map(|(&id, &distance)| IndexMatch::new(id, distance))
            .collect())
    }
}

impl VectorIndex for HnswIndex {
    fn upsert(&mut self, id: u64, vector: &[f32], metadata: IndexMetadata) -> Result<()> {
        anyhow::ensure!(
            vector.len() == self.dimension,
            "Vector dimension mismatch: expected {}, got {}",
            self.dimension,
            vector.len()
        );

        // usearch add is insert-only; replace means remove first
        if self.index.contains(id) {
            self.index
                .remove(id)
                .context("Failed to remove vector for replacement")?;
        }

        self.ensure_capacity()?;
        self.index
            .add(id, vector)
            .context("Failed to add vector to USearch index")?;
        self.metadata.insert(id, metadata);

        Ok(())
    }

    fn delete(&mut self, id: u64) -> Result<()> {
        if self.index.contains(id) {
            self.index
                .remove(id)
                .context("Failed to remove vector from USearch index")?;
        }
        self.metadata.remove(&id);
        Ok(())
    }

    fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexMatch>> {
        if top_k == 0 || self.index.size() == 0 {
            return Ok(Vec::new());
        }

        let Some(filter) = filter else {
            return self.search_unfiltered(vector, top_k);
        };

        // HNSW cannot pre-filter, so widen the fetch until enough matching
        // rows are found or the whole index has been ranked. Equivalent to
        // filtering before top-k selection.
        let total = self.index.size();
        let mut fetch = (top_k * 4).min(total);
        loop {
            let candidates = self.search_unfiltered(vector, fetch)?;
            let mut filtered: Vec<IndexMatch> = candidates
                .into_iter()
                .filter(|m| {
                    self.metadata
                        .get(&m.id)
                        .map(|meta| filter.matches(meta))
                        .unwrap_or(false)
                })
                .collect();

            if filtered.len() >= top_k || fetch >= total {
                filtered.truncate(top_k);
                return Ok(filtered);
            }
            fetch = (fetch * 4).min(total);
        }
    }

    fn len(&self) -> usize {
        self.index.size()
    }

    fn contains(&self, id: u64) -> bool {
        self.index.contains(id)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn persist(&self) -> Result<()> {
        self.index
            .save(
                self.index_path
                    .to_str()
                    .context("Index path is not valid UTF-8")?,
            )
            .context("Failed to save USearch index")?;

        let content = serde_json::to_string(&self.metadata)?;
        std::fs::write(Self::meta_path(&self.index_path), content)
            .context("Failed to write index metadata sidecar")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    fn unit(dim: usize, axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[axis] = 1.0;
        v
    }

    fn meta(language: &str) -> IndexMetadata {
        IndexMetadata {
            language: Some(language.to_string()),
            framework: None,
        }
    }

    #[test]
    fn test_upsert_query_delete_roundtrip() -> Result<()> {
        let temp = TempDir::new()?;
        let mut index = HnswIndex::open(temp.path().join("test.usearch"), 8)?;

        index.upsert(1, &unit(8, 0), meta("python"))?;
        index.upsert(2, &unit(8, 1), meta("rust"))?;
        assert_eq!(index.len(), 2);

        let matches = index.query(&unit(8, 0), 1, None)?;
        assert_eq!(matches[0].id, 1);
        assert_relative_eq!(matches[0].distance, 0.0, epsilon = 1e-4);

        index.delete(1)?;
        assert!(!index.contains(1));
        let matches = index.query(&unit(8, 0), 2, None)?;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, 2);

        // Deleting again is a no-op
        index.delete(1)?;
        Ok(())
    }

    #[test]
    fn test_query_empty_index_returns_empty() -> Result<()> {
        let temp = TempDir::new()?;
        let index = HnswIndex::open(temp.path().join("test.usearch"), 4)?;
        assert!(index.query(&unit(4, 0), 5, None)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_filtered_query_excludes_other_languages() -> Result<()> {
        let temp = TempDir::new()?;
        let mut index = HnswIndex::open(temp.path().join("test.usearch"), 8)?;

        // The closest vector to the query is javascript; python is further
        index.upsert(1, &unit(8, 0), meta("javascript"))?;
        index.upsert(2, &unit(8, 1), meta("python"))?;
        index.upsert(3, &unit(8, 2), meta("java"))?;

        let filter = MetadataFilter::Language("python".to_string());
        let matches = index.query(&unit(8, 0), 2, Some(&filter))?;

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, 2);
        Ok(())
    }

    #[test]
    fn test_metadata_survives_persist_and_reload() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("test.usearch");

        {
            let mut index = HnswIndex::open(&path, 8)?;
            index.upsert(1, &unit(8, 0), meta("python"))?;
            index.upsert(2, &unit(8, 1), meta("rust"))?;
            index.persist()?;
        }

        let reloaded = HnswIndex::open(&path, 8)?;
        assert_eq!(reloaded.len(), 2);

        let filter = MetadataFilter::Language("rust".to_string());
        let matches = reloaded.query(&unit(8, 1), 2, Some(&filter))?;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, 2);
        Ok(())
    }

    #[test]
    fn test_upsert_replaces_existing_vector() -> Result<()> {
        let temp = TempDir::new()?;
        let mut index = HnswIndex::open(temp.path().join("test.usearch"), 8)?;

        index.upsert(1, &unit(8, 0), meta("python"))?;
        index.upsert(1, &unit(8, 3), meta("go"))?;
        assert_eq!(index.len(), 1);

        let matches = index.query(&unit(8, 3), 1, None)?;
        assert_eq!(matches[0].id, 1);
        assert_relative_eq!(matches[0].distance, 0.0, epsilon = 1e-4);
        Ok(())
    }
}
