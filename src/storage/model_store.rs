//! Durable storage for the trained bundle.
//!
//! Two artifacts live under one directory: the forest plus training metadata
//! as bincode, and the three label encoders as JSON. Each starts with a
//! `{format, schema_version}` header that is checked before the payload is
//! decoded, so a file from another schema is reported instead of misread.

use bincode::Options;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::services::bundle::{ModelBundle, TrainingMetadata};
use crate::services::encoder::FeatureEncoders;
use crate::services::forest::{DelayModel, ModelError};

pub const MODEL_FILE: &str = "delay_predictor.bin";
pub const ENCODER_FILE: &str = "label_encoders.json";
pub const SCHEMA_VERSION: u32 = 2;
pub const MODEL_FORMAT: &str = "scvp.delay-model";
pub const ENCODER_FORMAT: &str = "scvp.label-encoders";

const MAX_ARTIFACT_BYTES: u64 = 512 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode {}: {reason}", path.display())]
    Encode { path: PathBuf, reason: String },
    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },
    #[error("{} has format '{found}', expected '{expected}'", path.display())]
    UnexpectedFormat {
        path: PathBuf,
        found: String,
        expected: &'static str,
    },
    #[error("{} has schema version {found}, expected {expected}", path.display())]
    IncompatibleSchema {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
    #[error("bundle is incomplete, {} is missing", missing.display())]
    Incomplete { missing: PathBuf },
    #[error("{} holds an unusable model: {source}", path.display())]
    InvalidModel {
        path: PathBuf,
        #[source]
        source: ModelError,
    },
}

/// Result of looking at the store during startup.
#[derive(Debug)]
pub enum StorageStatus {
    Absent,
    Valid(ModelBundle),
    Corrupt(StorageError),
}

#[derive(Serialize, Deserialize)]
struct ArtifactHeader {
    format: String,
    schema_version: u32,
}

#[derive(Deserialize)]
struct ModelArtifact {
    model: DelayModel,
    metadata: TrainingMetadata,
}

#[derive(Serialize)]
struct ModelArtifactRef<'a> {
    model: &'a DelayModel,
    metadata: &'a TrainingMetadata,
}

#[derive(Deserialize)]
struct EncoderArtifact {
    encoders: FeatureEncoders,
}

#[derive(Serialize)]
struct EncoderArtifactRef<'a> {
    format: &'a str,
    schema_version: u32,
    encoders: &'a FeatureEncoders,
}

#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn encoder_path(&self) -> PathBuf {
        self.dir.join(ENCODER_FILE)
    }

    /// True when any artifact of a previous bundle is on disk. A lone
    /// artifact counts: loading it reports the bundle as incomplete.
    pub fn exists(&self) -> bool {
        self.model_path().exists() || self.encoder_path().exists()
    }

    pub fn probe(&self) -> StorageStatus {
        if !self.exists() {
            return StorageStatus::Absent;
        }
        match self.load() {
            Ok(bundle) => StorageStatus::Valid(bundle),
            Err(err) => StorageStatus::Corrupt(err),
        }
    }

    /// Write both artifacts, replacing whatever was stored before.
    pub fn persist(&self, bundle: &ModelBundle) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let model_path = self.model_path();
        let header = ArtifactHeader {
            format: MODEL_FORMAT.to_string(),
            schema_version: SCHEMA_VERSION,
        };
        let mut bytes = Vec::new();
        codec()
            .serialize_into(&mut bytes, &header)
            .and_then(|_| {
                codec().serialize_into(
                    &mut bytes,
                    &ModelArtifactRef {
                        model: &bundle.model,
                        metadata: &bundle.metadata,
                    },
                )
            })
            .map_err(|e| StorageError::Encode {
                path: model_path.clone(),
                reason: e.to_string(),
            })?;
        write_atomic(&model_path, &bytes)?;

        let encoder_path = self.encoder_path();
        let json = serde_json::to_vec_pretty(&EncoderArtifactRef {
            format: ENCODER_FORMAT,
            schema_version: SCHEMA_VERSION,
            encoders: &bundle.encoders,
        })
        .map_err(|e| StorageError::Encode {
            path: encoder_path.clone(),
            reason: e.to_string(),
        })?;
        write_atomic(&encoder_path, &json)?;

        tracing::info!(
            model = %model_path.display(),
            encoders = %encoder_path.display(),
            model_bytes = bytes.len(),
            "Persisted model bundle"
        );
        Ok(())
    }

    pub fn load(&self) -> Result<ModelBundle, StorageError> {
        let model_path = self.model_path();
        let encoder_path = self.encoder_path();
        for path in [&model_path, &encoder_path] {
            if !path.exists() {
                return Err(StorageError::Incomplete {
                    missing: path.clone(),
                });
            }
        }

        let artifact = read_model(&model_path)?;
        let encoders = read_encoders(&encoder_path)?;
        let bundle = ModelBundle {
            model: artifact.model,
            encoders,
            metadata: artifact.metadata,
        };
        bundle
            .check_compatible()
            .map_err(|source| StorageError::InvalidModel {
                path: model_path,
                source,
            })?;
        Ok(bundle)
    }
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_ARTIFACT_BYTES)
}

fn read_file(path: &Path) -> Result<Vec<u8>, StorageError> {
    fs::read(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn decode_error(path: &Path, reason: impl ToString) -> StorageError {
    StorageError::Decode {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn check_header(path: &Path, header: &ArtifactHeader, expected: &'static str) -> Result<(), StorageError> {
    if header.format != expected {
        return Err(StorageError::UnexpectedFormat {
            path: path.to_path_buf(),
            found: header.format.clone(),
            expected,
        });
    }
    if header.schema_version != SCHEMA_VERSION {
        return Err(StorageError::IncompatibleSchema {
            path: path.to_path_buf(),
            found: header.schema_version,
            expected: SCHEMA_VERSION,
        });
    }
    Ok(())
}

fn read_model(path: &Path) -> Result<ModelArtifact, StorageError> {
    let bytes = read_file(path)?;
    let mut cursor: &[u8] = &bytes;

    let header: ArtifactHeader = codec()
        .deserialize_from(&mut cursor)
        .map_err(|e| decode_error(path, e))?;
    check_header(path, &header, MODEL_FORMAT)?;

    let artifact: ModelArtifact = codec()
        .deserialize_from(&mut cursor)
        .map_err(|e| decode_error(path, e))?;
    if !cursor.is_empty() {
        return Err(decode_error(
            path,
            format!("{} trailing bytes after model payload", cursor.len()),
        ));
    }
    Ok(artifact)
}

fn read_encoders(path: &Path) -> Result<FeatureEncoders, StorageError> {
    let bytes = read_file(path)?;
    let header: ArtifactHeader =
        serde_json::from_slice(&bytes).map_err(|e| decode_error(path, e))?;
    check_header(path, &header, ENCODER_FORMAT)?;

    let artifact: EncoderArtifact =
        serde_json::from_slice(&bytes).map_err(|e| decode_error(path, e))?;
    Ok(artifact.encoders)
}

/// Write to a hidden sibling and rename it over the target.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    let io_error = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp, contents).map_err(io_error)?;
    fs::rename(&tmp, path).map_err(io_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingConfig;
    use crate::models::ShipmentRecord;
    use crate::services::forest::ForestParams;
    use crate::services::synthesizer::DataSynthesizer;
    use crate::services::ScoringService;

    fn bundle(seed: u64) -> ModelBundle {
        ModelBundle::train(&TrainingConfig {
            seed,
            samples: 150,
            trees: 3,
        })
        .unwrap()
    }

    fn write_model_with_header(store: &ModelStore, header: &ArtifactHeader, bundle: &ModelBundle) {
        let mut bytes = Vec::new();
        codec().serialize_into(&mut bytes, header).unwrap();
        codec()
            .serialize_into(
                &mut bytes,
                &ModelArtifactRef {
                    model: &bundle.model,
                    metadata: &bundle.metadata,
                },
            )
            .unwrap();
        fs::write(store.model_path(), bytes).unwrap();
    }

    #[test]
    fn test_exists_tracks_persist() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("models"));
        assert!(!store.exists());
        assert!(matches!(store.probe(), StorageStatus::Absent));

        store.persist(&bundle(1)).unwrap();
        assert!(store.exists());
        assert!(matches!(store.probe(), StorageStatus::Valid(_)));
    }

    #[test]
    fn test_round_trip_predicts_identically() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        let original = bundle(42);
        store.persist(&original).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, original);

        let record = ShipmentRecord {
            origin: "Chennai".into(),
            destination: "Kolkata".into(),
            supplier_id: 17,
            estimated_days: 9,
            current_status: "customs".into(),
            distance_km: 1650.0,
        };
        assert_eq!(
            ScoringService::new(loaded).score(&record).unwrap(),
            ScoringService::new(original).score(&record).unwrap()
        );
    }

    #[test]
    fn test_persist_overwrites_previous_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        store.persist(&bundle(1)).unwrap();
        let replacement = bundle(2);
        store.persist(&replacement).unwrap();
        assert_eq!(store.load().unwrap(), replacement);
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temporary files must be renamed away");
    }

    #[test]
    fn test_newer_schema_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        let b = bundle(3);
        store.persist(&b).unwrap();
        write_model_with_header(
            &store,
            &ArtifactHeader {
                format: MODEL_FORMAT.to_string(),
                schema_version: SCHEMA_VERSION + 1,
            },
            &b,
        );
        match store.load() {
            Err(StorageError::IncompatibleSchema { found, expected, .. }) => {
                assert_eq!(found, SCHEMA_VERSION + 1);
                assert_eq!(expected, SCHEMA_VERSION);
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_foreign_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        let b = bundle(3);
        store.persist(&b).unwrap();
        write_model_with_header(
            &store,
            &ArtifactHeader {
                format: "someone.elses-model".to_string(),
                schema_version: SCHEMA_VERSION,
            },
            &b,
        );
        assert!(matches!(store.load(), Err(StorageError::UnexpectedFormat { .. })));
    }

    #[test]
    fn test_encoder_version_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        store.persist(&bundle(4)).unwrap();

        let raw = fs::read_to_string(store.encoder_path()).unwrap();
        let mut json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        json["schema_version"] = serde_json::json!(99);
        fs::write(store.encoder_path(), json.to_string()).unwrap();

        assert!(matches!(
            store.load(),
            Err(StorageError::IncompatibleSchema { found: 99, .. })
        ));
    }

    #[test]
    fn test_garbage_and_truncation_are_decode_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        store.persist(&bundle(5)).unwrap();

        let bytes = fs::read(store.model_path()).unwrap();
        fs::write(store.model_path(), &bytes[..bytes.len() / 2]).unwrap();
        assert!(matches!(store.load(), Err(StorageError::Decode { .. })));

        let mut padded = bytes.clone();
        padded.extend_from_slice(b"junk");
        fs::write(store.model_path(), &padded).unwrap();
        assert!(matches!(store.load(), Err(StorageError::Decode { .. })));

        fs::write(store.model_path(), b"definitely not bincode").unwrap();
        assert!(matches!(store.probe(), StorageStatus::Corrupt(StorageError::Decode { .. })));
    }

    #[test]
    fn test_encoders_from_another_bundle_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("main"));
        store.persist(&bundle(6)).unwrap();

        let mut rows = DataSynthesizer::new(7, 150).generate();
        for row in &mut rows {
            row.status = "customs".to_string();
        }
        let other = ModelBundle::train_on(&rows, ForestParams { n_estimators: 2, ..ForestParams::default() })
            .unwrap();
        let other_store = ModelStore::new(dir.path().join("other"));
        other_store.persist(&other).unwrap();

        // well-formed header and payload, but fitted for a different model
        fs::copy(other_store.encoder_path(), store.encoder_path()).unwrap();
        assert!(matches!(
            store.load(),
            Err(StorageError::InvalidModel {
                source: ModelError::EncoderMismatch { feature: "status", trained: 4, found: 1 },
                ..
            })
        ));
    }

    #[test]
    fn test_missing_half_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        fs::write(store.encoder_path(), b"{}").unwrap();
        assert!(store.exists());
        match store.load() {
            Err(StorageError::Incomplete { missing }) => assert_eq!(missing, store.model_path()),
            other => panic!("expected incomplete bundle, got {:?}", other),
        }
    }
}
