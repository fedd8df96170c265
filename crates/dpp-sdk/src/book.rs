use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use dpp_types::{Attachment, Attributes, Passport, RecordId, Timestamp};

use crate::error::{SdkError, SdkResult};

/// In-memory passport store.
///
/// Stands in for the record store in tests, demos, and embedded use. Holds
/// whole passports keyed by id and applies the create and update lifecycle.
#[derive(Default)]
pub struct RecordBook {
    records: RwLock<HashMap<RecordId, Passport>>,
}

impl RecordBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a passport with a fresh id and version 1.
    pub fn create(
        &self,
        name: impl Into<String>,
        serial_number: Option<String>,
        attributes: Attributes,
        datasets: Vec<Attachment>,
    ) -> Passport {
        let passport = Passport::create(
            RecordId::generate(),
            name,
            serial_number,
            attributes,
            datasets,
            Timestamp::now(),
        );
        self.write().insert(passport.id, passport.clone());
        passport
    }

    /// Append a version to a stored passport and return the updated record.
    pub fn append_version(
        &self,
        id: &RecordId,
        attributes: Attributes,
        datasets: Vec<Attachment>,
    ) -> SdkResult<Passport> {
        let mut records = self.write();
        let passport = records.get_mut(id).ok_or(SdkError::RecordNotFound(*id))?;
        passport.append_version(attributes, datasets, Timestamp::now());
        Ok(passport.clone())
    }

    /// Insert a passport read from elsewhere. Fails if the id is taken.
    pub fn insert(&self, passport: Passport) -> SdkResult<()> {
        passport.check_history()?;
        let mut records = self.write();
        if records.contains_key(&passport.id) {
            return Err(SdkError::RecordExists(passport.id));
        }
        records.insert(passport.id, passport);
        Ok(())
    }

    /// Replace a stored passport, e.g. after hashes were written back.
    pub fn put(&self, passport: Passport) -> SdkResult<()> {
        passport.check_history()?;
        self.write().insert(passport.id, passport);
        Ok(())
    }

    pub fn get(&self, id: &RecordId) -> SdkResult<Passport> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or(SdkError::RecordNotFound(*id))
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<RecordId, Passport>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}
