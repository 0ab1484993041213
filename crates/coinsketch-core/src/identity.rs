//! Stable per-client identity.
//!
//! Identity is an explicit context object resolved through an
//! [`IdentityStore`] and passed into join and submission calls — there is no
//! ambient global. The stored record also carries the last display name the
//! user entered, so a returning player doesn't get re-prompted.

use serde::{Deserialize, Serialize};

use crate::room::generate_id;

/// Persisted client identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    /// Stable identifier correlating this client to its player rows.
    pub client_id: String,
    /// Last display name used, if any.
    pub name: Option<String>,
}

/// Abstraction over identity storage so resolution stays platform-agnostic.
///
/// Implementations live in the client crate (a JSON file on disk for native
/// processes, an in-memory map for tests and storage-less environments).
/// `save` is best-effort: an implementation that cannot persist simply keeps
/// the identity for the life of the process, which degrades reconnect
/// continuity but is not an error.
pub trait IdentityStore {
    /// Load the previously persisted identity, if any.
    fn load(&self) -> Option<ClientIdentity>;
    /// Persist the identity, best-effort.
    fn save(&self, identity: &ClientIdentity);
    /// Forget the persisted identity.
    fn clear(&self);
}

/// Resolve the client identity: the persisted one if present, otherwise a
/// freshly generated identifier which is persisted for next time.
///
/// Idempotent per store — every call against the same storage yields the
/// same identifier. If the store cannot persist, each new process gets a new
/// identity for its own lifetime.
pub fn resolve(store: &dyn IdentityStore) -> ClientIdentity {
    if let Some(identity) = store.load() {
        return identity;
    }
    let identity = ClientIdentity {
        client_id: generate_id(),
        name: None,
    };
    store.save(&identity);
    identity
}

/// Like [`resolve`], also recording the display name for future sessions.
pub fn resolve_with_name(store: &dyn IdentityStore, name: &str) -> ClientIdentity {
    let mut identity = resolve(store);
    if identity.name.as_deref() != Some(name) {
        identity.name = Some(name.to_string());
        store.save(&identity);
    }
    identity
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// In-memory store for exercising the resolution contract.
    #[derive(Default)]
    struct MemStore {
        slot: RefCell<Option<ClientIdentity>>,
    }

    impl IdentityStore for MemStore {
        fn load(&self) -> Option<ClientIdentity> {
            self.slot.borrow().clone()
        }
        fn save(&self, identity: &ClientIdentity) {
            *self.slot.borrow_mut() = Some(identity.clone());
        }
        fn clear(&self) {
            *self.slot.borrow_mut() = None;
        }
    }

    /// A store whose writes never stick (unavailable persistent storage).
    struct BrokenStore;

    impl IdentityStore for BrokenStore {
        fn load(&self) -> Option<ClientIdentity> {
            None
        }
        fn save(&self, _identity: &ClientIdentity) {}
        fn clear(&self) {}
    }

    #[test]
    fn resolve_is_idempotent_per_store() {
        let store = MemStore::default();
        let first = resolve(&store);
        let second = resolve(&store);
        assert_eq!(first.client_id, second.client_id);
    }

    #[test]
    fn resolve_records_display_name() {
        let store = MemStore::default();
        let identity = resolve_with_name(&store, "Alice");
        assert_eq!(identity.name.as_deref(), Some("Alice"));
        // Name survives a plain resolve.
        assert_eq!(resolve(&store).name.as_deref(), Some("Alice"));
        // And is replaced when the user picks a new one.
        let renamed = resolve_with_name(&store, "Bob");
        assert_eq!(renamed.client_id, identity.client_id);
        assert_eq!(renamed.name.as_deref(), Some("Bob"));
    }

    #[test]
    fn broken_storage_degrades_to_per_process_identity() {
        let store = BrokenStore;
        let first = resolve(&store);
        let second = resolve(&store);
        // No persistence: each resolution stands in for a fresh process and
        // gets its own identity.
        assert_ne!(first.client_id, second.client_id);
    }

    #[test]
    fn clear_forgets_the_identity() {
        let store = MemStore::default();
        let first = resolve(&store);
        store.clear();
        let second = resolve(&store);
        assert_ne!(first.client_id, second.client_id);
    }
}
