use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;
use time::OffsetDateTime;

use crate::auth::repo_types::UserRecord;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("email already registered")]
pub struct DuplicateEmail;

#[derive(Default)]
struct Users {
    records: Vec<UserRecord>,          // ordered by id
    by_email: HashMap<String, usize>,  // email -> index into records
    next_id: u64,
}

/// In-memory user registry. The only owner and mutator of user records.
#[derive(Default)]
pub struct UserStore {
    inner: RwLock<Users>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a user by exact email.
    pub fn find_by_email(&self, email: &str) -> Option<UserRecord> {
        let users = self.inner.read();
        users
            .by_email
            .get(email)
            .map(|&idx| users.records[idx].clone())
    }

    /// Find a user by id.
    pub fn find_by_id(&self, id: u64) -> Option<UserRecord> {
        let users = self.inner.read();
        users
            .records
            .binary_search_by_key(&id, |u| u.id)
            .ok()
            .map(|idx| users.records[idx].clone())
    }

    /// Create a user unless the email is taken. Check and insert happen under one write lock.
    pub fn insert_if_absent(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<UserRecord, DuplicateEmail> {
        let mut users = self.inner.write();
        if users.by_email.contains_key(email) {
            return Err(DuplicateEmail);
        }

        users.next_id += 1;
        let record = UserRecord {
            id: users.next_id,
            name: name.to_owned(),
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
            created_at: now_millis(),
        };

        let idx = users.records.len();
        users.records.push(record.clone());
        users.by_email.insert(record.email.clone(), idx);
        Ok(record)
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn now_millis() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_millisecond(now.millisecond()).unwrap_or(now)
}
