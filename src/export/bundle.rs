//! Single-file model bundle: classifier + preprocessor + metadata

use crate::error::{Result, TrafficError};
use crate::preprocessing::Preprocessor;
use crate::training::{Classifier, MetricsReport};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Bumped whenever the bundle layout changes
pub const FORMAT_VERSION: u32 = 1;

/// Bundle header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub crate_version: String,
    pub classifier_name: String,
    pub feature_names: Vec<String>,
    pub metrics: Option<MetricsReport>,
}

/// Loaded bundle; both components are guaranteed present
#[derive(Debug, Clone)]
pub struct ModelBundle<C> {
    pub metadata: BundleMetadata,
    pub classifier: C,
    pub preprocessor: Preprocessor,
}

/// On-disk layout. Components stay optional so a partial file is detected on load.
#[derive(Serialize)]
struct StoredBundleRef<'a, C> {
    metadata: &'a BundleMetadata,
    classifier: Option<&'a C>,
    preprocessor: Option<&'a Preprocessor>,
}

#[derive(Deserialize)]
struct StoredBundle<C> {
    metadata: BundleMetadata,
    classifier: Option<C>,
    preprocessor: Option<Preprocessor>,
}

/// Persist a fitted classifier and preprocessor as one bincode blob.
///
/// Fails with `IncompleteModel` and writes nothing if either component is
/// absent or unfitted. The blob is written to a temporary file next to `path`
/// and renamed over it, so readers see either the old or the new bundle.
pub fn save<C>(
    classifier: Option<&C>,
    preprocessor: Option<&Preprocessor>,
    metrics: Option<&MetricsReport>,
    path: impl AsRef<Path>,
) -> Result<BundleMetadata>
where
    C: Classifier + Serialize,
{
    let path = path.as_ref();

    let classifier = classifier
        .filter(|c| c.is_fitted())
        .ok_or_else(|| TrafficError::IncompleteModel { missing: "classifier".to_string() })?;
    let preprocessor = preprocessor
        .filter(|p| p.is_fitted())
        .ok_or_else(|| TrafficError::IncompleteModel { missing: "preprocessor".to_string() })?;

    let metadata = BundleMetadata {
        format_version: FORMAT_VERSION,
        created_at: Utc::now(),
        crate_version: env!("CARGO_PKG_VERSION").to_string(),
        classifier_name: classifier.name().to_string(),
        feature_names: preprocessor.feature_names().to_vec(),
        metrics: metrics.cloned(),
    };

    let bytes = bincode::serialize(&StoredBundleRef {
        metadata: &metadata,
        classifier: Some(classifier),
        preprocessor: Some(preprocessor),
    })
    .map_err(|e| TrafficError::SerializationError(format!("Failed to serialize bundle: {}", e)))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| TrafficError::IoError(e.error))?;

    info!(
        path = %path.display(),
        bytes = bytes.len(),
        classifier = %metadata.classifier_name,
        features = metadata.feature_names.len(),
        "model bundle saved"
    );

    Ok(metadata)
}

/// Load a bundle written by [`save`]
pub fn load<C>(path: impl AsRef<Path>) -> Result<ModelBundle<C>>
where
    C: Classifier + DeserializeOwned,
{
    let path = path.as_ref();
    if !path.exists() {
        return Err(TrafficError::ModelFileNotFound(path.to_path_buf()));
    }

    let bytes = fs::read(path)?;
    let stored: StoredBundle<C> = bincode::deserialize(&bytes)
        .map_err(|e| TrafficError::CorruptBundle(format!("Failed to deserialize: {}", e)))?;

    if stored.metadata.format_version != FORMAT_VERSION {
        return Err(TrafficError::CorruptBundle(format!(
            "unsupported format version {} (expected {})",
            stored.metadata.format_version, FORMAT_VERSION
        )));
    }

    let classifier = stored
        .classifier
        .filter(|c| c.is_fitted())
        .ok_or_else(|| TrafficError::CorruptBundle("bundle has no fitted classifier".to_string()))?;
    let preprocessor = stored
        .preprocessor
        .filter(|p| p.is_fitted())
        .ok_or_else(|| TrafficError::CorruptBundle("bundle has no fitted preprocessor".to_string()))?;

    if preprocessor.feature_names() != stored.metadata.feature_names.as_slice() {
        return Err(TrafficError::CorruptBundle(
            "feature names in header do not match the preprocessor".to_string(),
        ));
    }
    if let Some(width) = classifier.n_features() {
        if width != preprocessor.n_features() {
            return Err(TrafficError::CorruptBundle(format!(
                "classifier was fit on {} features but the preprocessor produces {}",
                width,
                preprocessor.n_features()
            )));
        }
    }

    info!(
        path = %path.display(),
        classifier = %stored.metadata.classifier_name,
        created_at = %stored.metadata.created_at,
        "model bundle loaded"
    );

    Ok(ModelBundle {
        metadata: stored.metadata,
        classifier,
        preprocessor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{DecisionTree, TrainedClassifier};
    use ndarray::array;
    use polars::prelude::*;

    fn fitted_parts() -> (TrainedClassifier, Preprocessor) {
        let df = df!(
            "calories" => &[10.0, 20.0, 30.0, 40.0],
            "category" => &["Meat", "Meat", "Dessert", "Dessert"]
        )
        .unwrap();
        let mut pre = Preprocessor::default();
        let x = pre.fit_transform(&df, &["calories"], &["category"]).unwrap();

        let mut clf = TrainedClassifier::DecisionTree(DecisionTree::new());
        clf.fit(&x, &array![0.0, 0.0, 1.0, 1.0]).unwrap();
        (clf, pre)
    }

    #[test]
    fn test_round_trip_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let (clf, pre) = fitted_parts();

        let written = save(Some(&clf), Some(&pre), None, &path).unwrap();
        let bundle: ModelBundle<TrainedClassifier> = load(&path).unwrap();

        assert_eq!(bundle.metadata, written);
        assert_eq!(bundle.metadata.format_version, FORMAT_VERSION);
        assert_eq!(bundle.metadata.classifier_name, "decision_tree");
        assert_eq!(bundle.preprocessor.feature_names(), pre.feature_names());
    }

    #[test]
    fn test_missing_preprocessor_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let (clf, _) = fitted_parts();

        let err = save(Some(&clf), None, None, &path).unwrap_err();

        assert!(matches!(err, TrafficError::IncompleteModel { ref missing } if missing == "preprocessor"));
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unfitted_classifier_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let (_, pre) = fitted_parts();
        let clf = TrainedClassifier::default();

        assert!(matches!(
            save(Some(&clf), Some(&pre), None, dir.path().join("m.bin")),
            Err(TrafficError::IncompleteModel { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.bin");

        match load::<TrainedClassifier>(&path) {
            Err(TrafficError::ModelFileNotFound(p)) => assert_eq!(p, path),
            other => panic!("expected ModelFileNotFound, got {:?}", other.map(|b| b.metadata)),
        }
    }

    #[test]
    fn test_load_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.bin");
        std::fs::write(&path, b"definitely not a model").unwrap();

        assert!(matches!(
            load::<TrainedClassifier>(&path),
            Err(TrafficError::CorruptBundle(_))
        ));
    }

    #[test]
    fn test_load_partial_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.bin");
        let (clf, pre) = fitted_parts();

        let metadata = BundleMetadata {
            format_version: FORMAT_VERSION,
            created_at: Utc::now(),
            crate_version: "0.0.0".to_string(),
            classifier_name: "decision_tree".to_string(),
            feature_names: pre.feature_names().to_vec(),
            metrics: None,
        };
        let bytes = bincode::serialize(&StoredBundleRef::<TrainedClassifier> {
            metadata: &metadata,
            classifier: Some(&clf),
            preprocessor: None,
        })
        .unwrap();
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(
            load::<TrainedClassifier>(&path),
            Err(TrafficError::CorruptBundle(_))
        ));
    }

    #[test]
    fn test_classifier_width_mismatch_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mismatched.bin");
        let (_, pre) = fitted_parts();
        assert_eq!(pre.n_features(), 3);

        let mut narrow = TrainedClassifier::DecisionTree(DecisionTree::new());
        narrow
            .fit(&array![[0.0, 1.0], [0.1, 1.0], [0.9, 0.0], [1.0, 0.0]], &array![0.0, 0.0, 1.0, 1.0])
            .unwrap();
        save(Some(&narrow), Some(&pre), None, &path).unwrap();

        match load::<TrainedClassifier>(&path) {
            Err(TrafficError::CorruptBundle(msg)) => assert!(msg.contains("2 features"), "{}", msg),
            other => panic!("expected CorruptBundle, got {:?}", other.map(|b| b.metadata)),
        }
    }

    #[test]
    fn test_version_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.bin");
        let (clf, pre) = fitted_parts();

        let metadata = BundleMetadata {
            format_version: FORMAT_VERSION + 1,
            created_at: Utc::now(),
            crate_version: "9.9.9".to_string(),
            classifier_name: "decision_tree".to_string(),
            feature_names: pre.feature_names().to_vec(),
            metrics: None,
        };
        let bytes = bincode::serialize(&StoredBundleRef {
            metadata: &metadata,
            classifier: Some(&clf),
            preprocessor: Some(&pre),
        })
        .unwrap();
        std::fs::write(&path, bytes).unwrap();

        let err = load::<TrainedClassifier>(&path).unwrap_err();
        assert!(err.to_string().contains("format version"));
    }
}
