//! Identity persistence.
//!
//! Implementations of the core [`IdentityStore`]: a JSON file for native
//! processes, and an in-memory fallback for tests or environments without a
//! writable location. Write failures are swallowed — identity then lives
//! only for the current process, which degrades reconnect continuity but is
//! not an error.

use std::path::PathBuf;
use std::sync::Mutex;

use coinsketch_core::identity::{ClientIdentity, IdentityStore};

/// Identity stored as a JSON file on disk.
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> Option<ClientIdentity> {
        let text = std::fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&text).ok()
    }

    fn save(&self, identity: &ClientIdentity) {
        let json = match serde_json::to_string_pretty(identity) {
            Ok(j) => j,
            Err(_) => return,
        };
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        // Best-effort: a failed write leaves us with a per-process identity.
        let _ = std::fs::write(&self.path, json);
    }

    fn clear(&self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// In-memory identity store.
#[derive(Default)]
pub struct MemoryIdentityStore {
    slot: Mutex<Option<ClientIdentity>>,
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self) -> Option<ClientIdentity> {
        self.slot.lock().ok()?.clone()
    }

    fn save(&self, identity: &ClientIdentity) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(identity.clone());
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}
