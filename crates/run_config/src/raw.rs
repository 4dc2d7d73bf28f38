use std::collections::BTreeMap;

/// Uncoerced value as it arrives from a command line or launch descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Single(String),
    List(Vec<String>),
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Single(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Single(value)
    }
}

impl<S: Into<String>> From<Vec<S>> for RawValue {
    fn from(values: Vec<S>) -> Self {
        RawValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Canonical key -> raw value mapping consumed by [`crate::parse`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawArgs {
    values: BTreeMap<String, RawValue>,
}

impl RawArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value; later inserts win.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RawValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style [`RawArgs::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn without(mut self, key: &str) -> Self {
        self.values.remove(key);
        self
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawArgs
where
    K: Into<String>,
    V: Into<RawValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = RawArgs::new();
        for (key, value) in iter {
            args.insert(key, value);
        }
        args
    }
}
