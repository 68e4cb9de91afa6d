//! Summary adapter with replay suppression.
//!
//! The adapter sits between an operation log and a [`DocumentStore`]. On
//! startup the log may replay operations the store already made durable; the
//! adapter drops every mutation whose serial number is at or below its
//! watermark, so replays are idempotent. The watermark starts at the store's
//! sync token and follows every applied mutation.

use crate::error::{StoreError, StoreResult};
use crate::store::{DocumentStore, Lid, SerialNum};
use std::sync::Arc;
use tenval_sparse::{CodecFormat, SimpleTensor};
use tracing::trace;

/// Lid reserved for heart beats; never holds a document.
pub const HEART_BEAT_LID: Lid = 0;

pub struct SummaryAdapter<S: DocumentStore> {
    store: Arc<S>,
    last_serial: SerialNum,
}

impl<S: DocumentStore> SummaryAdapter<S> {
    pub fn new(store: Arc<S>) -> Self {
        let last_serial = store.last_sync_token();
        Self { store, last_serial }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Serial number of the last mutation known applied
    pub fn last_serial(&self) -> SerialNum {
        self.last_serial
    }

    fn ignore(&self, serial: SerialNum) -> StoreResult<bool> {
        if serial == 0 {
            return Err(StoreError::ZeroSerial);
        }
        Ok(serial <= self.last_serial)
    }

    /// Store `bytes` under `lid`; returns whether the mutation was applied.
    pub fn put(&mut self, serial: SerialNum, lid: Lid, bytes: &[u8]) -> StoreResult<bool> {
        if self.ignore(serial)? {
            trace!(
                "ignoring put(serial={}, lid={}): at or below {}",
                serial,
                lid,
                self.last_serial
            );
            return Ok(false);
        }
        trace!("put(serial={}, lid={}, size={})", serial, lid, bytes.len());
        self.store.put(serial, lid, bytes);
        self.last_serial = serial;
        Ok(true)
    }

    /// Remove `lid`; returns whether the mutation was applied.
    pub fn remove(&mut self, serial: SerialNum, lid: Lid) -> StoreResult<bool> {
        if self.ignore(serial)? {
            trace!(
                "ignoring remove(serial={}, lid={}): at or below {}",
                serial,
                lid,
                self.last_serial
            );
            return Ok(false);
        }
        self.store.remove(serial, lid);
        self.last_serial = serial;
        Ok(true)
    }

    /// Advance the watermark to `serial` if it is newer, recording it in the
    /// store as a removal of [`HEART_BEAT_LID`].
    pub fn heart_beat(&mut self, serial: SerialNum) -> StoreResult<()> {
        if serial > self.last_serial {
            self.remove(serial, HEART_BEAT_LID)?;
        }
        Ok(())
    }

    pub fn get(&self, lid: Lid) -> Option<Vec<u8>> {
        self.store.read(lid)
    }

    pub fn compact_lid_space(&self, limit: Lid) {
        self.store.compact_lid_space(limit);
    }

    /// Encode `tensor` and store it under `lid`.
    pub fn put_tensor(
        &mut self,
        serial: SerialNum,
        lid: Lid,
        tensor: &SimpleTensor,
        format: CodecFormat,
    ) -> StoreResult<bool> {
        if self.ignore(serial)? {
            trace!("ignoring tensor put(serial={}, lid={})", serial, lid);
            return Ok(false);
        }
        let bytes = tensor.encode(format)?;
        self.put(serial, lid, &bytes)
    }

    /// Decode the tensor stored under `lid`, if any.
    pub fn get_tensor(&self, lid: Lid) -> StoreResult<Option<SimpleTensor>> {
        match self.store.read(lid) {
            Some(bytes) => Ok(Some(SimpleTensor::decode(&bytes)?)),
            None => Ok(None),
        }
    }
}
