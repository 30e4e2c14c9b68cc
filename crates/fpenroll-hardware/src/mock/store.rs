//! In-memory template store.

use super::call_log::{CallLog, GatewayCall, lock};
use crate::{Result, error::GatewayError, traits::TemplateStore};
use fpenroll_core::{FingerprintId, UserId};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Template store that keeps fingerprint ownership in memory.
///
/// # Examples
///
/// ```
/// use fpenroll_core::{FingerprintId, UserId};
/// use fpenroll_hardware::mock::{CallLog, MemoryTemplateStore};
/// use fpenroll_hardware::traits::TemplateStore;
///
/// let store = MemoryTemplateStore::new(CallLog::new());
/// store.add_fingerprint_for_user(FingerprintId::new(7), UserId::new(10)).unwrap();
/// assert_eq!(store.owner_of(FingerprintId::new(7)), Some(UserId::new(10)));
/// ```
#[derive(Debug)]
pub struct MemoryTemplateStore {
    log: CallLog,
    owners: Mutex<HashMap<FingerprintId, UserId>>,
    failing: AtomicBool,
}

impl MemoryTemplateStore {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            owners: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Owner of an enrolled fingerprint, if recorded.
    pub fn owner_of(&self, fingerprint_id: FingerprintId) -> Option<UserId> {
        lock(&self.owners).get(&fingerprint_id).copied()
    }

    /// Fingerprints recorded for a user.
    pub fn fingerprints_for(&self, user_id: UserId) -> Vec<FingerprintId> {
        let mut ids: Vec<FingerprintId> = lock(&self.owners)
            .iter()
            .filter(|(_, owner)| **owner == user_id)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_by_key(FingerprintId::as_i32);
        ids
    }

    /// Make subsequent writes fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn add_fingerprint_for_user(
        &self,
        fingerprint_id: FingerprintId,
        user_id: UserId,
    ) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::other("template store unavailable"));
        }

        lock(&self.owners).insert(fingerprint_id, user_id);
        self.log.record(GatewayCall::Persist {
            fingerprint_id,
            user_id,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_records_owner() {
        let log = CallLog::new();
        let store = MemoryTemplateStore::new(log.clone());

        store
            .add_fingerprint_for_user(FingerprintId::new(2), UserId::new(10))
            .unwrap();
        store
            .add_fingerprint_for_user(FingerprintId::new(1), UserId::new(10))
            .unwrap();
        store
            .add_fingerprint_for_user(FingerprintId::new(3), UserId::new(11))
            .unwrap();

        assert_eq!(
            store.fingerprints_for(UserId::new(10)),
            vec![FingerprintId::new(1), FingerprintId::new(2)]
        );
        assert_eq!(store.owner_of(FingerprintId::new(3)), Some(UserId::new(11)));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_failing_store() {
        let log = CallLog::new();
        let store = MemoryTemplateStore::new(log.clone());
        store.set_failing(true);

        assert!(
            store
                .add_fingerprint_for_user(FingerprintId::new(1), UserId::new(0))
                .is_err()
        );
        assert_eq!(store.owner_of(FingerprintId::new(1)), None);
        assert!(log.is_empty());
    }
}
