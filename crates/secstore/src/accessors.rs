//! Typed getters and setters over [`EncryptedStore::get`]/[`EncryptedStore::set`].
//!
//! Getters return `None` (or a fixed default for scalars) when the entry is
//! missing, unreadable, or of another type. Floating-point getters accept
//! any numeric variant.

use std::collections::BTreeMap;

use secstore_core::Value;
use secstore_secrets::CredentialStore;
use secstore_storage::PreferenceStore;

use crate::codec::ValueCodec;
use crate::store::EncryptedStore;

impl<P, C, K> EncryptedStore<P, C, K>
where
    P: PreferenceStore,
    C: CredentialStore,
    K: ValueCodec,
{
    pub fn string(&mut self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// An array whose elements are all strings.
    pub fn string_array(&mut self, name: &str) -> Option<Vec<String>> {
        match self.get(name)? {
            Value::Array(items) => items
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }

    pub fn array(&mut self, name: &str) -> Option<Vec<Value>> {
        match self.get(name)? {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn dictionary(&mut self, name: &str) -> Option<BTreeMap<String, Value>> {
        match self.get(name)? {
            Value::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn data(&mut self, name: &str) -> Option<Vec<u8>> {
        match self.get(name)? {
            Value::Data(d) => Some(d),
            _ => None,
        }
    }

    pub fn url(&mut self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::Url(u) => Some(u),
            _ => None,
        }
    }

    /// `0` when missing or not an integer.
    pub fn integer(&mut self, name: &str) -> i64 {
        self.get(name).and_then(|v| v.as_i64()).unwrap_or(0)
    }

    /// `NaN` when missing or not numeric.
    pub fn float(&mut self, name: &str) -> f32 {
        self.get(name)
            .and_then(|v| v.as_f64())
            .map_or(f32::NAN, |f| f as f32)
    }

    /// `NaN` when missing or not numeric.
    pub fn double(&mut self, name: &str) -> f64 {
        self.get(name).and_then(|v| v.as_f64()).unwrap_or(f64::NAN)
    }

    /// `false` when missing or not a bool.
    pub fn bool(&mut self, name: &str) -> bool {
        self.get(name).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    pub fn set_string(&mut self, name: &str, value: impl Into<String>) {
        self.set(name, Some(Value::String(value.into())));
    }

    pub fn set_integer(&mut self, name: &str, value: i64) {
        self.set(name, Some(Value::Integer(value)));
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.set(name, Some(Value::Float(value)));
    }

    pub fn set_double(&mut self, name: &str, value: f64) {
        self.set(name, Some(Value::Double(value)));
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.set(name, Some(Value::Bool(value)));
    }

    pub fn set_data(&mut self, name: &str, value: impl Into<Vec<u8>>) {
        self.set(name, Some(Value::Data(value.into())));
    }

    pub fn set_url(&mut self, name: &str, value: impl Into<String>) {
        self.set(name, Some(Value::Url(value.into())));
    }
}
