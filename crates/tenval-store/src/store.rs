//! Document store collaborator.
//!
//! Documents are opaque byte blobs addressed by local document id (lid). Every
//! mutation carries the serial number of the operation that caused it; the
//! store reports the highest serial number it has made durable as its sync
//! token.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Mutation sequence number
pub type SerialNum = u64;

/// Local document id
pub type Lid = u32;

/// Backing store for serialized documents.
///
/// Implementations are internally synchronized.
pub trait DocumentStore: Send + Sync {
    fn put(&self, serial: SerialNum, lid: Lid, bytes: &[u8]);

    fn remove(&self, serial: SerialNum, lid: Lid);

    fn read(&self, lid: Lid) -> Option<Vec<u8>>;

    /// Highest serial number known durable
    fn last_sync_token(&self) -> SerialNum;

    /// Drop every document with lid `>= limit`.
    fn compact_lid_space(&self, limit: Lid);
}

#[derive(Debug, Default)]
struct Inner {
    documents: HashMap<Lid, Vec<u8>>,
    last_serial: SerialNum,
}

/// Memory-backed [`DocumentStore`]; every applied mutation is immediately
/// durable.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    inner: RwLock<Inner>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that reports `serial` as already synced
    pub fn with_sync_token(serial: SerialNum) -> Self {
        Self {
            inner: RwLock::new(Inner {
                documents: HashMap::new(),
                last_serial: serial,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().documents.is_empty()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn put(&self, serial: SerialNum, lid: Lid, bytes: &[u8]) {
        let mut inner = self.inner.write();
        inner.documents.insert(lid, bytes.to_vec());
        inner.last_serial = inner.last_serial.max(serial);
    }

    fn remove(&self, serial: SerialNum, lid: Lid) {
        let mut inner = self.inner.write();
        inner.documents.remove(&lid);
        inner.last_serial = inner.last_serial.max(serial);
    }

    fn read(&self, lid: Lid) -> Option<Vec<u8>> {
        self.inner.read().documents.get(&lid).cloned()
    }

    fn last_sync_token(&self) -> SerialNum {
        self.inner.read().last_serial
    }

    fn compact_lid_space(&self, limit: Lid) {
        self.inner.write().documents.retain(|lid, _| *lid < limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_read_remove() {
        let store = MemoryDocumentStore::new();
        store.put(1, 7, b"doc");
        assert_eq!(store.read(7), Some(b"doc".to_vec()));
        assert_eq!(store.last_sync_token(), 1);
        store.remove(2, 7);
        assert_eq!(store.read(7), None);
        assert_eq!(store.last_sync_token(), 2);
    }

    #[test]
    fn test_compact_lid_space() {
        let store = MemoryDocumentStore::with_sync_token(10);
        for lid in 1..6 {
            store.put(10 + lid as u64, lid, &[lid as u8]);
        }
        store.compact_lid_space(3);
        assert_eq!(store.len(), 2);
        assert!(store.read(3).is_none());
        assert_eq!(store.read(2), Some(vec![2]));
    }
}
