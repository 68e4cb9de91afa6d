//! Integration tests for the summary adapter

use proptest::prelude::*;
use std::sync::Arc;
use tenval_core::{Label, TensorSpec};
use tenval_sparse::{CodecFormat, SimpleTensor};
use tenval_store::{DocumentStore, MemoryDocumentStore, SummaryAdapter};

fn tensor() -> SimpleTensor {
    let spec = TensorSpec::parse("tensor(x{},y[2])")
        .unwrap()
        .add([("x", Label::from("a")), ("y", Label::from(0))], 1.5)
        .add([("x", Label::from("a")), ("y", Label::from(1))], -2.0);
    SimpleTensor::create(&spec).unwrap()
}

#[test]
fn test_tensor_roundtrip_through_store() {
    let store = Arc::new(MemoryDocumentStore::new());
    let mut adapter = SummaryAdapter::new(store.clone());
    assert!(adapter
        .put_tensor(1, 3, &tensor(), CodecFormat::Legacy)
        .unwrap());
    assert_eq!(store.read(3).unwrap()[0], 3);
    let read = adapter.get_tensor(3).unwrap().unwrap();
    assert_eq!(read.to_spec(), tensor().to_spec());
    assert!(adapter.get_tensor(4).unwrap().is_none());
}

#[test]
fn test_replayed_tensor_put_is_ignored() {
    let store = Arc::new(MemoryDocumentStore::new());
    let mut adapter = SummaryAdapter::new(store.clone());
    adapter.put(2, 3, b"current").unwrap();
    assert!(!adapter
        .put_tensor(2, 3, &tensor(), CodecFormat::Legacy)
        .unwrap());
    assert_eq!(store.read(3), Some(b"current".to_vec()));
}

#[test]
fn test_corrupt_document_is_codec_error() {
    let mut adapter = SummaryAdapter::new(Arc::new(MemoryDocumentStore::new()));
    adapter.put(1, 1, &[9, 9]).unwrap();
    assert!(matches!(
        adapter.get_tensor(1),
        Err(tenval_store::StoreError::Codec(_))
    ));
}

#[test]
fn test_restart_resumes_from_sync_token() {
    let store = Arc::new(MemoryDocumentStore::new());
    {
        let mut adapter = SummaryAdapter::new(store.clone());
        adapter.put(1, 1, b"a").unwrap();
        adapter.put(2, 2, b"b").unwrap();
    }
    let mut adapter = SummaryAdapter::new(store.clone());
    assert_eq!(adapter.last_serial(), 2);
    // replay of the whole log only applies the tail
    assert!(!adapter.put(1, 1, b"a").unwrap());
    assert!(!adapter.remove(2, 2).unwrap());
    assert!(adapter.put(3, 1, b"c").unwrap());
    assert_eq!(store.read(1), Some(b"c".to_vec()));
    assert_eq!(store.read(2), Some(b"b".to_vec()));
}

proptest! {
    /// Property: after any sequence of mutations, the watermark equals the
    /// highest serial seen and only increasing serials were applied
    #[test]
    fn prop_watermark_is_monotonic(
        start in 0u64..20,
        serials in prop::collection::vec(1u64..40, 1..30),
    ) {
        let store = Arc::new(MemoryDocumentStore::with_sync_token(start));
        let mut adapter = SummaryAdapter::new(store);
        let mut highest = start;
        for (i, serial) in serials.iter().enumerate() {
            let applied = adapter.put(*serial, i as u32 % 4 + 1, &[i as u8]).unwrap();
            prop_assert_eq!(applied, *serial > highest);
            highest = highest.max(*serial);
            prop_assert_eq!(adapter.last_serial(), highest);
        }
    }
}
