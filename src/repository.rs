use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::model::{format_date, PredictionRecord};
use crate::session::Role;
use crate::store::{
    KeyValueStore, StoreError, ALL_PREDICTIONS_KEY, EMAIL_KEY, LAST_PREDICTION_KEY, ROLE_KEY,
    USERS_KEY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    Active,
    Suspended,
}

impl UserStatus {
    pub fn label(self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Suspended => "Suspended",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            UserStatus::Active => UserStatus::Suspended,
            UserStatus::Suspended => UserStatus::Active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Role label exactly as stored, e.g. `Admin`, `Doctor` or `user`.
    pub role: String,
    pub status: UserStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined: Option<String>,
}

impl UserAccount {
    pub fn access_role(&self) -> Role {
        Role::from_label(&self.role)
    }
}

fn demo_users() -> Vec<UserAccount> {
    let user = |id, name: &str, email: &str, role: &str, status, joined: &str| UserAccount {
        id,
        name: name.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        status,
        joined: Some(joined.to_string()),
    };

    vec![
        user(1, "Dr. Sarah Johnson", "sarah.johnson@hospital.com", "Admin", UserStatus::Active, "2025-01-06"),
        user(2, "Dr. Michael Chen", "michael.chen@hospital.com", "Doctor", UserStatus::Active, "2025-02-11"),
        user(3, "Emily Rodriguez", "emily.rodriguez@hospital.com", "Nurse", UserStatus::Active, "2025-03-18"),
        user(4, "Robert Williams", "robert.williams@hospital.com", "Staff", UserStatus::Suspended, "2025-04-22"),
        user(5, "Jessica Martinez", "jessica.martinez@hospital.com", "Doctor", UserStatus::Active, "2025-05-27"),
    ]
}

/// Prediction history, users and session flags, stored as whole JSON
/// documents under fixed keys. Every write re-serialises the full collection.
pub struct RecordRepository {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl RecordRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(key, error = %err, "ignoring malformed stored value");
                None
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(value)?;
        self.store.set(key, &encoded)
    }

    pub fn load_last(&self) -> Option<PredictionRecord> {
        self.read_json(LAST_PREDICTION_KEY)
    }

    pub fn save_last(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        self.write_json(LAST_PREDICTION_KEY, record)
    }

    /// Falls back to the last prediction when no list has been written yet.
    /// Entries that do not parse as records are skipped.
    pub fn load_all(&self) -> Vec<PredictionRecord> {
        if let Some(Value::Array(items)) = self.read_json::<Value>(ALL_PREDICTIONS_KEY) {
            return items
                .into_iter()
                .filter_map(|item| match serde_json::from_value(item) {
                    Ok(record) => Some(record),
                    Err(err) => {
                        debug!(error = %err, "skipping malformed prediction entry");
                        None
                    }
                })
                .collect();
        }
        self.load_last().into_iter().collect()
    }

    pub fn save_all(&self, records: &[PredictionRecord]) -> Result<(), StoreError> {
        self.write_json(ALL_PREDICTIONS_KEY, records)
    }

    /// Returns whether the record was appended.
    pub fn append_if_new(&self, record: &PredictionRecord) -> Result<bool, StoreError> {
        let _guard = self.lock();
        let mut all = self.load_all();
        if all.iter().any(|r| r.created_at == record.created_at) {
            return Ok(false);
        }
        all.push(record.clone());
        self.save_all(&all)?;
        Ok(true)
    }

    /// Persists a freshly computed prediction. The history is appended before
    /// the last slot moves, so a profile without a list keeps its previous
    /// prediction in the history.
    pub fn record_prediction(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        let appended = self.append_if_new(record)?;
        self.save_last(record)?;
        info!(created_at = %record.created_at, result = record.result.label(), appended, "prediction saved");
        Ok(())
    }

    pub fn load_users(&self) -> Vec<UserAccount> {
        self.read_json(USERS_KEY).unwrap_or_default()
    }

    pub fn save_users(&self, users: &[UserAccount]) -> Result<(), StoreError> {
        self.write_json(USERS_KEY, users)
    }

    /// Users for the admin console, seeding the demo accounts on first use.
    pub fn load_users_seeded(&self) -> Result<Vec<UserAccount>, StoreError> {
        let _guard = self.lock();
        let users = self.load_users();
        if !users.is_empty() {
            return Ok(users);
        }
        let seeded = demo_users();
        self.save_users(&seeded)?;
        info!(count = seeded.len(), "seeded demo user accounts");
        Ok(seeded)
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<UserAccount> {
        self.load_users().into_iter().find(|u| u.email == email)
    }

    /// Creates an account keyed by creation time. `None` when the email is taken.
    pub fn register_user(
        &self,
        name: &str,
        email: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<Option<UserAccount>, StoreError> {
        let _guard = self.lock();
        let mut users = self.load_users();
        if users.iter().any(|u| u.email == email) {
            return Ok(None);
        }

        let next_free = users.iter().map(|u| u.id + 1).max().unwrap_or(1);
        let user = UserAccount {
            id: now.timestamp_millis().max(next_free),
            name: name.to_string(),
            email: email.to_string(),
            role: role.as_str().to_string(),
            status: UserStatus::Active,
            joined: Some(format_date(now.date_naive())),
        };
        users.push(user.clone());
        self.save_users(&users)?;
        info!(id = user.id, role = role.as_str(), "registered user");
        Ok(Some(user))
    }

    pub fn toggle_user_status(&self, id: i64) -> Result<Option<UserAccount>, StoreError> {
        let _guard = self.lock();
        let mut users = self.load_users();
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        user.status = user.status.toggled();
        let updated = user.clone();
        self.save_users(&users)?;
        Ok(Some(updated))
    }

    pub fn delete_user(&self, id: i64) -> Result<Option<UserAccount>, StoreError> {
        let _guard = self.lock();
        let mut users = self.load_users();
        let Some(index) = users.iter().position(|u| u.id == id) else {
            return Ok(None);
        };
        let removed = users.remove(index);
        self.save_users(&users)?;
        Ok(Some(removed))
    }

    pub fn role(&self) -> Option<Role> {
        self.store.get(ROLE_KEY).as_deref().and_then(Role::parse)
    }

    pub fn set_role(&self, role: Option<Role>) -> Result<(), StoreError> {
        match role {
            Some(role) => self.store.set(ROLE_KEY, role.as_str()),
            None => {
                self.clear_session();
                Ok(())
            }
        }
    }

    pub fn email(&self) -> Option<String> {
        self.store.get(EMAIL_KEY)
    }

    pub fn set_email(&self, email: Option<&str>) -> Result<(), StoreError> {
        match email {
            Some(email) => self.store.set(EMAIL_KEY, email),
            None => {
                self.store.remove(EMAIL_KEY);
                Ok(())
            }
        }
    }

    pub fn clear_session(&self) {
        self.store.remove(ROLE_KEY);
        self.store.remove(EMAIL_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn repo() -> (Arc<MemoryStore>, RecordRepository) {
        let store = Arc::new(MemoryStore::new());
        let repo = RecordRepository::new(store.clone());
        (store, repo)
    }

    #[test]
    fn seeding_happens_once() {
        let (_, repo) = repo();
        let first = repo.load_users_seeded().unwrap();
        assert_eq!(first.len(), 5);

        repo.delete_user(4).unwrap();
        let second = repo.load_users_seeded().unwrap();
        assert_eq!(second.len(), 4);
    }

    #[test]
    fn register_rejects_duplicate_email() {
        let (_, repo) = repo();
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        let first = repo.register_user("Ann", "ann@clinic.org", Role::User, now).unwrap();
        assert!(first.is_some());
        let again = repo.register_user("Ann B", "ann@clinic.org", Role::Admin, now).unwrap();
        assert!(again.is_none());
        assert_eq!(first.unwrap().joined.as_deref(), Some("2026-01-05"));
    }

    #[test]
    fn ids_stay_unique_within_one_millisecond() {
        let (_, repo) = repo();
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        let a = repo.register_user("A", "a@x.org", Role::User, now).unwrap().unwrap();
        let b = repo.register_user("B", "b@x.org", Role::User, now).unwrap().unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn toggle_flips_and_persists() {
        let (_, repo) = repo();
        repo.load_users_seeded().unwrap();
        let toggled = repo.toggle_user_status(4).unwrap().unwrap();
        assert_eq!(toggled.status, UserStatus::Active);
        assert_eq!(repo.load_users()[3].status, UserStatus::Active);
        assert!(repo.toggle_user_status(99).unwrap().is_none());
    }

    #[test]
    fn clearing_role_clears_email() {
        let (store, repo) = repo();
        repo.set_role(Some(Role::Admin)).unwrap();
        repo.set_email(Some("boss@hospital.com")).unwrap();
        assert_eq!(store.get(ROLE_KEY).as_deref(), Some("admin"));

        repo.set_role(None).unwrap();
        assert_eq!(repo.role(), None);
        assert_eq!(repo.email(), None);
    }

    #[test]
    fn legacy_user_rows_still_load() {
        let (store, repo) = repo();
        store
            .set(
                USERS_KEY,
                r#"[{"id":2,"name":"Dr. Michael Chen","email":"michael.chen@hospital.com","role":"Doctor","status":"Active"}]"#,
            )
            .unwrap();
        let users = repo.load_users();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].access_role(), Role::User);
        assert_eq!(users[0].joined, None);
    }

    #[test]
    fn toggling_one_user_leaves_other_rows_untouched() {
        let (store, repo) = repo();
        let rows = [
            r#"{"id":1,"name":"Dr. Sarah Johnson","email":"sarah.johnson@hospital.com","role":"Admin","status":"Active"}"#,
            r#"{"id":2,"name":"Dr. Michael Chen","email":"michael.chen@hospital.com","role":"Doctor","status":"Active"}"#,
            r#"{"id":3,"name":"Emily Rodriguez","email":"emily.rodriguez@hospital.com","role":"Nurse","status":"Active"}"#,
        ];
        store.set(USERS_KEY, &format!("[{}]", rows.join(","))).unwrap();

        repo.toggle_user_status(1).unwrap().unwrap();

        let raw = store.get(USERS_KEY).unwrap();
        assert!(raw.contains(r#""role":"Admin","status":"Suspended""#));
        assert!(raw.contains(rows[1]));
        assert!(raw.contains(rows[2]));
    }

    #[test]
    fn registered_users_store_the_session_role_label() {
        let (_, repo) = repo();
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        let user = repo.register_user("Ann", "ann@clinic.org", Role::Admin, now).unwrap().unwrap();
        assert_eq!(user.role, "admin");
        assert_eq!(user.access_role(), Role::Admin);
    }
}
