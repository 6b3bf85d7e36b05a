//! Labeled wrapper around lazy arrays.

use std::collections::HashMap;

use crate::{Element, LazyArray};

/// A lazy array with a name and free-form string attributes attached.
///
/// Upstream readers often carry units or provenance alongside the numbers.
/// Aggregations operate on the raw numeric payload only; converting into
/// [`LazyArray`] is the explicit unwrap step that discards the labels.
#[derive(Debug, Clone)]
pub struct LabeledArray<T: Element> {
    values: LazyArray<T>,
    name: Option<String>,
    attrs: HashMap<String, String>,
}

impl<T: Element> LabeledArray<T> {
    /// Wrap a lazy array without any labels.
    pub fn new(values: LazyArray<T>) -> Self {
        Self {
            values,
            name: None,
            attrs: HashMap::new(),
        }
    }

    /// Set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach an attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// The name, if set.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Look up an attribute.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// The wrapped values.
    pub fn values(&self) -> &LazyArray<T> {
        &self.values
    }

    /// Unwrap, discarding labels.
    pub fn into_values(self) -> LazyArray<T> {
        self.values
    }
}

impl<T: Element> From<LabeledArray<T>> for LazyArray<T> {
    fn from(labeled: LabeledArray<T>) -> Self {
        labeled.values
    }
}
