//! Persistence of the fitted pipeline and its training metadata.
//!
//! The model is a versioned bincode blob; the metadata is an independent
//! JSON document. Both files are replaced atomically (write to a temporary
//! sibling, then rename) so a crash never leaves a half-written file behind.
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::{HeartError, Result};
use crate::features::FEATURE_COLUMNS;
use crate::models::HeartRiskPipeline;

/// Bumped whenever the serialized layout of `ModelArtifact` changes.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// On-disk model: the fitted pipeline plus what is needed to check that it
/// can be used by this build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub feature_names: Vec<String>,
    pub pipeline: HeartRiskPipeline,
}

impl ModelArtifact {
    pub fn new(pipeline: HeartRiskPipeline) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            feature_names: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
            pipeline,
        }
    }
}

/// Training metadata sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    pub trained_at: String,
    /// Best mean cross-validated ROC-AUC from the grid search.
    pub roc_auc: f64,
    pub best_params: BTreeMap<String, serde_json::Value>,
}

/// Fixed locations of the model artifact and its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStore {
    model_path: PathBuf,
    metadata_path: PathBuf,
}

impl ArtifactStore {
    pub fn new(model_path: impl Into<PathBuf>, metadata_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            metadata_path: metadata_path.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.model_path, &config.metadata_path)
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    /// Serialize the pipeline to the model path, replacing prior contents.
    pub fn save_model(&self, pipeline: &HeartRiskPipeline) -> Result<PathBuf> {
        let artifact = ModelArtifact::new(pipeline.clone());
        let bytes = bincode::serialize(&artifact)?;
        write_atomic(&self.model_path, &bytes)?;
        log::info!("Model saved to: {}", self.model_path.display());
        Ok(self.model_path.clone())
    }

    /// Deserialize the pipeline from the model path.
    ///
    /// # Errors
    ///
    /// `ModelNotFound` when no artifact has been written yet;
    /// `IncompatibleArtifact` when the file was written by another format
    /// version; `FeatureMismatch` when it was trained on a different feature
    /// list or order.
    pub fn load_model(&self) -> Result<HeartRiskPipeline> {
        let bytes = match fs::read(&self.model_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HeartError::ModelNotFound(self.model_path.clone()))
            }
            Err(e) => return Err(HeartError::io(&self.model_path, e)),
        };
        let artifact: ModelArtifact = bincode::deserialize(&bytes)?;
        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(HeartError::IncompatibleArtifact {
                path: self.model_path.clone(),
                found: artifact.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }
        if artifact.feature_names.iter().ne(FEATURE_COLUMNS.iter()) {
            return Err(HeartError::FeatureMismatch {
                path: self.model_path.clone(),
                found: artifact.feature_names,
                expected: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
            });
        }
        log::debug!("Loaded model from {}", self.model_path.display());
        Ok(artifact.pipeline)
    }

    pub fn save_metadata(&self, metadata: &TrainingMetadata) -> Result<()> {
        let json = serde_json::to_vec_pretty(metadata)?;
        write_atomic(&self.metadata_path, &json)?;
        log::info!("Metadata saved to: {}", self.metadata_path.display());
        Ok(())
    }

    /// Read the metadata sidecar. Returns `Ok(None)` when it does not exist.
    pub fn load_metadata(&self) -> Result<Option<TrainingMetadata>> {
        match fs::read(&self.metadata_path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HeartError::io(&self.metadata_path, e)),
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| HeartError::io(&dir, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    let tmp_path = dir.join(format!(".{}.tmp", file_name));

    let mut file = fs::File::create(&tmp_path).map_err(|e| HeartError::io(&tmp_path, e))?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| HeartError::io(&tmp_path, e))?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|e| HeartError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogisticConfig;
    use crate::models::{LogisticParams, LogisticRegressionModel};
    use crate::preprocessing::StandardScaler;

    fn identity_pipeline() -> HeartRiskPipeline {
        HeartRiskPipeline {
            scaler: StandardScaler {
                mean: vec![0.0; 7],
                scale: vec![1.0; 7],
            },
            classifier: LogisticRegressionModel {
                coef: vec![0.1; 7],
                intercept: -1.0,
            },
            params: LogisticParams::new(1.0, &LogisticConfig::default()),
        }
    }

    #[test]
    fn artifact_with_other_feature_order_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("m.bin"), dir.path().join("meta.json"));
        store.save_model(&identity_pipeline()).unwrap();
        assert_eq!(store.load_model().unwrap(), identity_pipeline());

        let mut artifact = ModelArtifact::new(identity_pipeline());
        artifact.feature_names.swap(0, 1);
        fs::write(store.model_path(), bincode::serialize(&artifact).unwrap()).unwrap();
        let err = store.load_model().unwrap_err();
        assert!(
            matches!(err, HeartError::FeatureMismatch { ref found, .. } if found[0] == "sex"),
            "{:?}",
            err
        );

        artifact.feature_names.truncate(6);
        fs::write(store.model_path(), bincode::serialize(&artifact).unwrap()).unwrap();
        assert!(matches!(
            store.load_model(),
            Err(HeartError::FeatureMismatch { .. })
        ));
    }

    #[test]
    fn missing_model_is_reported_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("m.bin"), dir.path().join("meta.json"));
        let err = store.load_model().unwrap_err();
        assert!(err.is_model_not_found(), "{:?}", err);
        assert!(store.load_metadata().unwrap().is_none());
    }

    #[test]
    fn metadata_round_trip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(
            dir.path().join("nested/m.bin"),
            dir.path().join("nested/meta.json"),
        );
        let mut meta = TrainingMetadata {
            trained_at: "2024-01-01 00:00:00.000000".to_string(),
            roc_auc: 0.8,
            best_params: BTreeMap::new(),
        };
        store.save_metadata(&meta).unwrap();
        meta.roc_auc = 0.9;
        store.save_metadata(&meta).unwrap();
        assert_eq!(store.load_metadata().unwrap(), Some(meta));
        // No temporary file left behind
        let leftovers: Vec<_> = fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
