//! Model artifact store - One JSON file per product inside a models directory.
//!
//! Artifacts are named `model_product_<id>.json`. Saving writes a temporary file and
//! renames it over the artifact, so re-training overwrites in place and a reader never
//! sees a half-written model.

use crate::{core::training::RegressionModel, errors::Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const ARTIFACT_PREFIX: &str = "model_product_";
const ARTIFACT_EXTENSION: &str = "json";

/// Filesystem-backed store of trained models keyed by product ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    /// Store rooted at `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at `dir`, creating the directory now.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(dir);
        store.ensure_dir().await?;
        Ok(store)
    }

    /// Directory holding the artifacts.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the models directory if it is missing.
    pub async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Location of the artifact for `product_id`, whether or not it exists.
    #[must_use]
    pub fn artifact_path(&self, product_id: i64) -> PathBuf {
        self.dir
            .join(format!("{ARTIFACT_PREFIX}{product_id}.{ARTIFACT_EXTENSION}"))
    }

    /// Writes (or overwrites) the artifact for `model.product_id`.
    pub async fn save(&self, model: &RegressionModel) -> Result<PathBuf> {
        self.ensure_dir().await?;

        let path = self.artifact_path(model.product_id);
        let staging = path.with_extension("json.tmp");
        let payload = serde_json::to_vec_pretty(model)?;

        fs::write(&staging, payload).await?;
        fs::rename(&staging, &path).await?;

        debug!(product_id = model.product_id, path = %path.display(), "model artifact written");
        Ok(path)
    }

    /// Reads the artifact for `product_id`, `None` if there is none.
    pub async fn load(&self, product_id: i64) -> Result<Option<RegressionModel>> {
        match fs::read(self.artifact_path(product_id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Paths of all stored artifacts, sorted. A missing directory holds no artifacts.
    pub async fn list(&self) -> Result<Vec<PathBuf>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if artifact_product_id(&path).is_some() {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths)
    }
}

/// Product ID encoded in an artifact file name, if `path` names an artifact.
#[must_use]
pub fn artifact_product_id(path: &Path) -> Option<i64> {
    path.file_name()?
        .to_str()?
        .strip_prefix(ARTIFACT_PREFIX)?
        .strip_suffix(ARTIFACT_EXTENSION)?
        .strip_suffix('.')?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use chrono::Utc;

    fn model(product_id: i64, slope: f64) -> RegressionModel {
        RegressionModel {
            product_id,
            slope,
            intercept: 1.5,
            samples: 4,
            trained_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_and_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ModelStore::new(dir.path().join("models"));

        let saved = model(3, 0.25);
        let path = store.save(&saved).await?;
        assert_eq!(path, store.artifact_path(3));
        assert!(path.ends_with("model_product_3.json"));

        assert_eq!(store.load(3).await?, Some(saved));
        assert_eq!(store.load(4).await?, None);

        Ok(())
    }

    #[tokio::test]
    async fn test_save_overwrites() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ModelStore::open(dir.path()).await?;

        store.save(&model(1, 1.0)).await?;
        store.save(&model(1, 2.0)).await?;

        assert_eq!(store.list().await?.len(), 1);
        assert_eq!(store.load(1).await?.unwrap().slope, 2.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_list_ignores_other_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ModelStore::open(dir.path()).await?;

        store.save(&model(2, 1.0)).await?;
        store.save(&model(10, 1.0)).await?;
        fs::write(dir.path().join("notes.txt"), b"hello").await?;
        fs::write(dir.path().join("model_product_x.json"), b"{}").await?;

        let listed = store.list().await?;
        assert_eq!(
            listed,
            vec![store.artifact_path(10), store.artifact_path(2)]
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_list_missing_dir_is_empty() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ModelStore::new(dir.path().join("never-created"));
        assert!(store.list().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_artifact_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ModelStore::open(dir.path()).await?;
        fs::write(store.artifact_path(5), b"not json").await?;

        assert!(matches!(
            store.load(5).await,
            Err(crate::errors::Error::Serialization(_))
        ));
        Ok(())
    }

    #[test]
    fn test_artifact_product_id() {
        assert_eq!(
            artifact_product_id(Path::new("/m/model_product_12.json")),
            Some(12)
        );
        assert_eq!(artifact_product_id(Path::new("model_product_.json")), None);
        assert_eq!(artifact_product_id(Path::new("model_product_3.pkl")), None);
        assert_eq!(artifact_product_id(Path::new("model_product_3.json.tmp")), None);
    }
}
