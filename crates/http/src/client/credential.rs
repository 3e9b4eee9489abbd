//! In-memory credential slot

use keystone_core::Credential;
use parking_lot::Mutex;

/// Holds the current access credential in memory only.
///
/// Shared by the request pipeline, the renewal coordinator and the session
/// state machine. Every write advances an epoch counter; renewal results are
/// applied with [`CredentialHolder::set_if_epoch`] so that an explicit write
/// made while a renewal was in flight (logout, a fresh login) is never
/// overwritten by the late result.
#[derive(Debug, Default)]
pub struct CredentialHolder {
    slot: Mutex<Slot>,
}

#[derive(Debug, Default)]
struct Slot {
    credential: Option<Credential>,
    epoch: u64,
}

impl CredentialHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current credential, if any
    pub fn get(&self) -> Option<Credential> {
        self.slot.lock().credential.clone()
    }

    pub fn is_present(&self) -> bool {
        self.slot.lock().credential.is_some()
    }

    /// Replace the current value unconditionally, returning the new epoch
    pub fn set(&self, credential: Option<Credential>) -> u64 {
        let mut slot = self.slot.lock();
        slot.credential = credential;
        slot.epoch += 1;
        slot.epoch
    }

    pub fn clear(&self) -> u64 {
        self.set(None)
    }

    pub fn epoch(&self) -> u64 {
        self.slot.lock().epoch
    }

    /// Replace the value only if nothing was written since `expected`.
    ///
    /// Returns the new epoch on success, `None` if the slot moved on.
    pub fn set_if_epoch(&self, expected: u64, credential: Option<Credential>) -> Option<u64> {
        let mut slot = self.slot.lock();
        if slot.epoch != expected {
            return None;
        }
        slot.credential = credential;
        slot.epoch += 1;
        Some(slot.epoch)
    }
}
