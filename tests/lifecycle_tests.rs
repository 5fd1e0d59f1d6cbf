//! Startup and persistence tests
//!
//! Cover the load-or-train sequence across process restarts: a cold start
//! trains and persists, a warm start reuses the bundle on disk, and a corrupt
//! bundle keeps the service out of READY.

use std::fs;
use std::path::Path;
use std::time::Duration;

use delay_scorer::config::{Config, TrainingConfig};
use delay_scorer::models::{RiskLevel, ShipmentRecord};
use delay_scorer::services::{InitError, ServiceState};
use delay_scorer::storage::{ModelStore, StorageError, StorageStatus};
use delay_scorer::{app, AppState};

fn config_for(dir: &Path, seed: u64) -> Config {
    Config {
        model_dir: dir.to_path_buf(),
        training: TrainingConfig {
            seed,
            samples: 250,
            trees: 8,
        },
        ..Config::default()
    }
}

fn shipments() -> Vec<ShipmentRecord> {
    let lanes = [
        ("Mumbai", "Delhi", 5, 3, "in_transit", 1000.0),
        ("Chennai", "Kolkata", 17, 9, "customs", 1650.0),
        ("Bangalore", "Mumbai", 2, 1, "shipped", 980.0),
        ("Delhi", "Bangalore", 19, 14, "processing", 1740.0),
    ];
    lanes
        .iter()
        .map(|&(origin, destination, supplier_id, estimated_days, status, distance_km)| ShipmentRecord {
            origin: origin.into(),
            destination: destination.into(),
            supplier_id,
            estimated_days,
            current_status: status.into(),
            distance_km,
        })
        .collect()
}

// ===== Cold and warm starts =====

#[tokio::test]
async fn test_restart_serves_identical_predictions() {
    let dir = tempfile::tempdir().unwrap();

    let first = AppState::new(config_for(dir.path(), 42));
    let before: Vec<_> = {
        let scoring = first.initialize().await.unwrap();
        shipments().iter().map(|s| scoring.score(s).unwrap()).collect()
    };
    drop(first);

    // a different seed proves the second process loaded rather than retrained
    let second = AppState::new(config_for(dir.path(), 1234));
    let scoring = second.initialize().await.unwrap();
    let after: Vec<_> = shipments().iter().map(|s| scoring.score(s).unwrap()).collect();

    assert_eq!(before, after);
    assert_eq!(scoring.bundle().metadata.seed, 42);
}

#[tokio::test]
async fn test_cold_start_leaves_complete_bundle_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(config_for(dir.path(), 42));
    state.initialize().await.unwrap();

    let store = ModelStore::new(dir.path());
    assert!(store.model_path().exists());
    assert!(store.encoder_path().exists());
    match store.probe() {
        StorageStatus::Valid(bundle) => {
            assert_eq!(&bundle, state.scoring().unwrap().bundle());
        }
        other => panic!("expected a valid bundle, got {:?}", other),
    }
}

#[tokio::test]
async fn test_same_seed_trains_same_model() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();

    let first = AppState::new(config_for(a.path(), 42)).initialize().await.unwrap();
    let second = AppState::new(config_for(b.path(), 42)).initialize().await.unwrap();

    assert_eq!(first.bundle().model, second.bundle().model);
    assert_eq!(first.bundle().encoders, second.bundle().encoders);
}

// ===== Corrupt store =====

#[tokio::test]
async fn test_corrupt_store_never_reaches_ready() {
    let dir = tempfile::tempdir().unwrap();
    {
        let state = AppState::new(config_for(dir.path(), 42));
        state.initialize().await.unwrap();
    }
    let store = ModelStore::new(dir.path());
    let mut bytes = fs::read(store.model_path()).unwrap();
    bytes.truncate(bytes.len() / 2);
    fs::write(store.model_path(), &bytes).unwrap();

    let state = AppState::new(config_for(dir.path(), 42));
    let err = state.initialize().await.unwrap_err();
    assert!(matches!(err, InitError::CorruptStore(StorageError::Decode { .. })), "got {:?}", err);
    assert_ne!(state.service_state(), ServiceState::Ready);
    assert!(state.scoring().is_none());

    // the corrupt file is left for inspection
    assert_eq!(fs::read(store.model_path()).unwrap(), bytes);
}

#[tokio::test]
async fn test_tampered_encoders_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    AppState::new(config_for(dir.path(), 42)).initialize().await.unwrap();

    let store = ModelStore::new(dir.path());
    fs::write(store.encoder_path(), b"{\"format\": \"something-else\"}").unwrap();

    let state = AppState::new(config_for(dir.path(), 42));
    assert!(matches!(state.initialize().await, Err(InitError::CorruptStore(_))));
}

// ===== Server startup =====

#[tokio::test]
async fn test_run_exits_with_error_on_corrupt_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    fs::write(store.model_path(), b"garbage").unwrap();
    fs::write(store.encoder_path(), b"{}").unwrap();

    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..config_for(dir.path(), 42)
    };
    let outcome = tokio::time::timeout(Duration::from_secs(30), app::run(config))
        .await
        .expect("server must stop on its own after a failed initialization");

    let err = outcome.unwrap_err();
    assert!(
        matches!(err.downcast_ref::<InitError>(), Some(InitError::CorruptStore(_))),
        "got {:?}",
        err
    );
    assert_eq!(fs::read(store.model_path()).unwrap(), b"garbage");
}

// ===== Degraded answers =====

#[tokio::test]
async fn test_degraded_answer_is_counted() {
    let dir = tempfile::tempdir().unwrap();
    let scoring = AppState::new(config_for(dir.path(), 42)).initialize().await.unwrap();

    let mut broken = shipments().remove(0);
    broken.distance_km = f64::INFINITY;
    let result = scoring.score_or_degraded(&broken);

    assert_eq!(result.risk_level, RiskLevel::Unknown);
    assert_eq!(result.delay_hours, 0.0);
    assert_eq!(result.delay_probability, 0.0);
    assert_eq!(scoring.fault_count(), 1);
}
