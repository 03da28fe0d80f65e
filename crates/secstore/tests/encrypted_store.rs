//! End-to-end behaviour of the encrypted store over in-memory and file
//! backends.
//!
//! The KDF runs with a single iteration to keep the suite fast; the
//! iteration count does not affect any behaviour under test.

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;
use secstore::{EncryptedStore, Lifecycle, SecretString, StoreError, StoreOptions, Value};
use secstore_crypto::{CipherError, KdfParams};
use secstore_secrets::MemoryCredentialStore;
use secstore_storage::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
use tempfile::TempDir;

type MemStore = EncryptedStore<Arc<MemoryPreferenceStore>, Arc<MemoryCredentialStore>>;

fn options(suite: Option<&str>) -> StoreOptions {
    StoreOptions {
        suite: suite.map(str::to_string),
        kdf: KdfParams { iterations: 1 },
        ..StoreOptions::default()
    }
}

fn open(
    plain: &Arc<MemoryPreferenceStore>,
    creds: &Arc<MemoryCredentialStore>,
    suite: Option<&str>,
) -> MemStore {
    EncryptedStore::new(Arc::clone(plain), Arc::clone(creds), options(suite))
}

fn fresh(passphrase: &str) -> MemStore {
    let mut store = open(
        &Arc::new(MemoryPreferenceStore::new()),
        &Arc::new(MemoryCredentialStore::new()),
        None,
    );
    store.set_passphrase(Some(SecretString::from(passphrase))).unwrap();
    store
}

#[test]
fn scalar_roundtrip() {
    let mut store = fresh("alpha");
    store.set_value("count", 42i64);
    store.set_value("ratio", 0.25f64);
    store.set_value("enabled", true);
    store.set_value("name", "Ada");

    assert_eq!(store.get("count"), Some(Value::Integer(42)));
    assert_eq!(store.get("ratio"), Some(Value::Double(0.25)));
    assert_eq!(store.get("enabled"), Some(Value::Bool(true)));
    assert_eq!(store.get("name"), Some(Value::String("Ada".into())));
}

#[test]
fn collection_roundtrip() {
    let mut store = fresh("alpha");
    let mut dict = BTreeMap::new();
    dict.insert("x".to_string(), Value::Integer(1));
    dict.insert(
        "nested".to_string(),
        Value::Array(vec![Value::from("a"), Value::Data(vec![1, 2, 3])]),
    );

    store.set_value("dict", dict.clone());
    assert_eq!(store.dictionary("dict"), Some(dict));
}

#[test]
fn stored_bytes_are_not_plaintext() {
    let mut store = fresh("alpha");
    store.set_string("secret", "attack at dawn");

    let raw = store.raw_blob("secret").unwrap().expect("blob written");
    assert_eq!(raw.len() % 16, 0);
    assert!(!raw.windows(6).any(|w| w == b"attack"));
}

#[test]
fn missing_key_reads_absent_without_creating_material() {
    let mut store = fresh("alpha");
    assert_eq!(store.get("nothing"), None);
    assert!(store.last_error().is_none());
    assert_eq!(store.lifecycle(), Lifecycle::Uninitialized);
    assert!(!store.is_key_created());
}

#[test]
fn set_none_deletes() {
    let mut store = fresh("alpha");
    store.set_string("k", "v");
    store.set("k", None);
    assert!(store.raw_blob("k").unwrap().is_none());

    store.set_string("k", "v");
    store.remove("k");
    assert_eq!(store.get("k"), None);
}

#[test]
fn passphrase_rotation_orphans_old_values() {
    let mut store = fresh("first");
    store.set_string("k", "old");
    let old_fp = store.key_fingerprint();

    store.set_passphrase(Some(SecretString::from("second"))).unwrap();
    assert!(!store.is_key_created());
    assert_eq!(store.get("k"), None, "old ciphertext under discarded key");

    store.set_string("k", "new");
    assert_eq!(store.string("k").as_deref(), Some("new"));
    assert_ne!(store.key_fingerprint(), old_fp);
}

#[test]
fn same_passphrase_twice_still_rotates_key() {
    // every derivation uses a fresh salt
    let mut store = fresh("same");
    store.set_string("k", "v");
    let first = store.key_fingerprint();

    store.set_passphrase(Some(SecretString::from("same"))).unwrap();
    store.set_string("k", "v");
    assert_ne!(store.key_fingerprint(), first);
}

#[test]
fn key_survives_reopen_without_passphrase() {
    let plain = Arc::new(MemoryPreferenceStore::new());
    let creds = Arc::new(MemoryCredentialStore::new());

    let mut writer = open(&plain, &creds, Some("app"));
    writer.set_passphrase(Some(SecretString::from("pw"))).unwrap();
    writer.set_integer("n", 9);
    drop(writer);

    let mut reader = open(&plain, &creds, Some("app"));
    assert!(reader.is_key_created());
    assert_eq!(reader.integer("n"), 9);
}

#[test]
fn suites_are_isolated_on_shared_plain_store() {
    let plain = Arc::new(MemoryPreferenceStore::new());
    let creds = Arc::new(MemoryCredentialStore::new());

    let mut a = open(&plain, &creds, Some("a"));
    a.set_passphrase(Some(SecretString::from("pw"))).unwrap();
    a.set_string("shared-name", "from a");

    let mut b = open(&plain, &creds, Some("b"));
    b.set_passphrase(Some(SecretString::from("pw"))).unwrap();

    assert_eq!(b.get("shared-name"), None);
    assert!(b.last_error().is_some());
    assert!(creds.contains_account("EncryptedDefaults.AESKey-a"));
    assert!(creds.contains_account("EncryptedDefaults.AESKey-b"));
    assert_ne!(a.key_fingerprint(), b.key_fingerprint());
}

#[test]
fn rotating_one_suite_leaves_others() {
    let plain = Arc::new(MemoryPreferenceStore::new());
    let creds = Arc::new(MemoryCredentialStore::new());

    let mut a = open(&plain, &creds, Some("a"));
    a.set_passphrase(Some(SecretString::from("pw"))).unwrap();
    a.set_string("a-key", "kept");

    let mut b = open(&plain, &creds, Some("b"));
    b.set_passphrase(Some(SecretString::from("pw"))).unwrap();
    b.set_passphrase(Some(SecretString::from("pw2"))).unwrap();

    assert_eq!(a.string("a-key").as_deref(), Some("kept"));
}

#[test]
#[should_panic(expected = "passphrase must be set")]
fn get_existing_entry_without_passphrase_panics() {
    let plain = Arc::new(MemoryPreferenceStore::new());
    plain.set_blob("k", Some(&[0u8; 16])).unwrap();
    let mut store = open(&plain, &Arc::new(MemoryCredentialStore::new()), None);
    store.get("k");
}

#[test]
fn non_finite_floats_roundtrip() {
    let mut store = fresh("alpha");
    store.set_double("nan", f64::NAN);
    store.set_double("inf", f64::INFINITY);
    store.set_float("neg", f32::NEG_INFINITY);

    assert!(store.last_error().is_none());
    assert!(store.raw_blob("nan").unwrap().is_some());
    assert!(matches!(store.get("nan"), Some(Value::Double(d)) if d.is_nan()));
    assert_eq!(store.get("inf"), Some(Value::Double(f64::INFINITY)));
    assert_eq!(store.get("neg"), Some(Value::Float(f32::NEG_INFINITY)));
}

#[test]
fn double_keeps_every_bit() {
    let mut store = fresh("alpha");
    let d = f64::from_bits(352_046_501_353_209_180);
    store.set_double("d", d);
    assert_eq!(store.double("d").to_bits(), d.to_bits());
}

#[test]
fn failed_rotation_reports_and_keeps_old_key() {
    let plain = Arc::new(MemoryPreferenceStore::new());
    let creds = Arc::new(MemoryCredentialStore::new());
    let mut store = open(&plain, &creds, None);
    store.set_passphrase(Some(SecretString::from("first"))).unwrap();
    store.set_string("k", "old");
    let fp = store.key_fingerprint();

    creds.set_unavailable(true);
    let err = store
        .set_passphrase(Some(SecretString::from("second")))
        .unwrap_err();
    assert!(matches!(err, StoreError::KeyMaterial(_)));
    creds.set_unavailable(false);

    // nothing was replaced, so the old key still reads the old value
    assert_eq!(store.key_fingerprint(), fp);
    assert_eq!(store.string("k").as_deref(), Some("old"));

    store.set_passphrase(Some(SecretString::from("second"))).unwrap();
    assert!(!store.is_key_created());
    assert_eq!(store.get("k"), None);
}

#[test]
fn corrupted_ciphertext_reads_absent() {
    let mut store = fresh("alpha");
    store.set_string("k", "value");

    let mut raw = store.raw_blob("k").unwrap().unwrap();
    raw.truncate(raw.len() - 1);
    store.set_raw_blob("k", Some(&raw)).unwrap();

    assert_eq!(store.get("k"), None);
    match store.take_last_error() {
        Some(StoreError::Cipher(CipherError::CryptoFailed { status })) => {
            assert_eq!(status, secstore_crypto::status::ALIGNMENT_ERROR)
        }
        other => panic!("expected alignment failure, got {other:?}"),
    }
    assert!(store.last_error().is_none());
}

#[test]
fn key_persist_failure_is_reported() {
    let plain = Arc::new(MemoryPreferenceStore::new());
    let creds = Arc::new(MemoryCredentialStore::new());
    let mut store = open(&plain, &creds, None);
    store.set_passphrase(Some(SecretString::from("pw"))).unwrap();

    creds.set_unavailable(true);
    store.set_string("k", "v");

    assert!(plain.get_blob("k").unwrap().is_none());
    assert!(matches!(store.last_error(), Some(StoreError::KeyMaterial(_))));
    assert_eq!(store.lifecycle(), Lifecycle::Uninitialized);
}

#[test]
fn file_backed_store_persists_across_reopen() {
    let tmp = TempDir::new().unwrap();
    let creds = Arc::new(MemoryCredentialStore::new());

    {
        let plain = FilePreferenceStore::open(tmp.path(), Some("app")).unwrap();
        let mut store = EncryptedStore::new(plain, Arc::clone(&creds), options(Some("app")));
        store.set_passphrase(Some(SecretString::from("pw"))).unwrap();
        store.set_string("token", "abc123");
    }

    let on_disk = std::fs::read_to_string(tmp.path().join("app.json")).unwrap();
    assert!(!on_disk.contains("abc123"));

    let plain = FilePreferenceStore::open(tmp.path(), Some("app")).unwrap();
    let mut store = EncryptedStore::new(plain, creds, options(Some("app")));
    assert_eq!(store.string("token").as_deref(), Some("abc123"));
}

fn scalar_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        ".{0,64}".prop_map(Value::String),
        any::<i64>().prop_map(Value::Integer),
        any::<bool>().prop_map(Value::Bool),
        any::<f64>().prop_filter("finite", |d| d.is_finite()).prop_map(Value::Double),
        any::<f32>().prop_filter("finite", |f| f.is_finite()).prop_map(Value::Float),
        proptest::collection::vec(any::<u8>(), 0..256).prop_map(Value::Data),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn any_scalar_roundtrips(value in scalar_value()) {
        let mut store = fresh("prop");
        store.set("v", Some(value.clone()));
        prop_assert_eq!(store.get("v"), Some(value));
    }
}
