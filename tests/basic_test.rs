use std::sync::Arc;

use chrono::{TimeZone, Utc};
use health_sphere::store::{ALL_PREDICTIONS_KEY, LAST_PREDICTION_KEY, ROLE_KEY, USERS_KEY};
use health_sphere::{FileStore, KeyValueStore, MemoryStore, PredictionRecord, RecordRepository, SyntheticScorer, VisitInput};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn sample(seed: u64, minute: u32) -> PredictionRecord {
    let input = VisitInput {
        age: 20 + seed as u32,
        gender: "Female".to_string(),
        sms_received: seed % 2 == 0,
        appointment_day: "2026-03-04".to_string(),
    };
    let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, minute, 0).unwrap();
    SyntheticScorer::new().record(input, &mut StdRng::seed_from_u64(seed), now)
}

fn memory_repo() -> (Arc<MemoryStore>, RecordRepository) {
    let store = Arc::new(MemoryStore::new());
    let repo = RecordRepository::new(store.clone());
    (store, repo)
}

#[test]
fn test_last_prediction_round_trip() {
    let (_, repo) = memory_repo();
    let record = sample(1, 0);
    repo.save_last(&record).unwrap();
    assert_eq!(repo.load_last(), Some(record));
}

#[test]
fn test_append_if_new_is_idempotent() {
    let (_, repo) = memory_repo();
    let record = sample(2, 0);
    assert!(repo.append_if_new(&record).unwrap());
    assert!(!repo.append_if_new(&record).unwrap());
    assert_eq!(repo.load_all().len(), 1);

    assert!(repo.append_if_new(&sample(3, 1)).unwrap());
    assert_eq!(repo.load_all().len(), 2);
}

#[test]
fn test_load_all_on_empty_store() {
    let (_, repo) = memory_repo();
    assert!(repo.load_all().is_empty());
    assert!(repo.load_last().is_none());
}

#[test]
fn test_load_all_falls_back_to_last_prediction() {
    let (_, repo) = memory_repo();
    let record = sample(4, 0);
    repo.save_last(&record).unwrap();
    assert_eq!(repo.load_all(), vec![record]);
}

#[test]
fn test_record_prediction_keeps_previous_last_in_history() {
    let (_, repo) = memory_repo();
    let older = sample(5, 0);
    repo.save_last(&older).unwrap();

    let newer = sample(6, 5);
    repo.record_prediction(&newer).unwrap();

    assert_eq!(repo.load_last(), Some(newer.clone()));
    assert_eq!(repo.load_all(), vec![older, newer]);
}

#[test]
fn test_malformed_values_read_as_absent() {
    let (store, repo) = memory_repo();
    for key in [LAST_PREDICTION_KEY, ALL_PREDICTIONS_KEY, USERS_KEY, ROLE_KEY] {
        store.set(key, "{not json").unwrap();
    }
    assert!(repo.load_last().is_none());
    assert!(repo.load_all().is_empty());
    assert!(repo.load_users().is_empty());
    assert!(repo.role().is_none());
}

#[test]
fn test_malformed_list_entries_are_skipped() {
    let (store, repo) = memory_repo();
    let record = sample(7, 0);
    let raw = format!("[{}, {{\"createdAt\": 3}}]", serde_json::to_string(&record).unwrap());
    store.set(ALL_PREDICTIONS_KEY, &raw).unwrap();
    assert_eq!(repo.load_all(), vec![record]);
}

#[test]
fn test_stored_layout_uses_camel_case_keys() {
    let (store, repo) = memory_repo();
    repo.record_prediction(&sample(8, 0)).unwrap();

    let raw = store.get(LAST_PREDICTION_KEY).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(value["createdAt"].is_string());
    assert!(value["inputs"]["smsReceived"].is_boolean());
    assert!(value["inputs"]["appointmentDay"].is_string());
    assert!(value["charts"]["attendedPct"].is_u64());
    assert!(value["charts"]["bars"]["Mon"].is_u64());
}

#[test]
fn test_file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profile.json");
    let record = sample(9, 0);

    {
        let repo = RecordRepository::new(Arc::new(FileStore::open(&path)));
        repo.record_prediction(&record).unwrap();
    }

    let repo = RecordRepository::new(Arc::new(FileStore::open(&path)));
    assert_eq!(repo.load_last(), Some(record.clone()));
    assert_eq!(repo.load_all(), vec![record]);
}
