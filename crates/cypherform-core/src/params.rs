//! Statement parameter table
//!
//! Names are handed out by [`Parameters::insert`]: a requested name is used
//! when it is still free, otherwise the next free `paramN` counter name.

use crate::value::PropertyValue;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::collections::btree_map;

/// Ordered map of parameter name to value with an anonymous-name counter
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    values: BTreeMap<String, PropertyValue>,
    counter: usize,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` and return the name it was stored under
    pub fn insert(&mut self, requested: Option<&str>, value: PropertyValue) -> String {
        let name = match requested {
            Some(key) if !self.values.contains_key(key) => key.to_string(),
            _ => self.next_anonymous(),
        };
        self.values.insert(name.clone(), value);
        name
    }

    fn next_anonymous(&mut self) -> String {
        loop {
            let name = format!("param{}", self.counter);
            self.counter += 1;
            if !self.values.contains_key(&name) {
                return name;
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, PropertyValue> {
        self.values.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &BTreeMap<String, PropertyValue> {
        &self.values
    }

    pub fn into_inner(self) -> BTreeMap<String, PropertyValue> {
        self.values
    }
}

// Two tables are equal when they bind the same names to the same values
impl PartialEq for Parameters {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Serialize for Parameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = (&'a String, &'a PropertyValue);
    type IntoIter = btree_map::Iter<'a, String, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl<K: Into<String>, V: Into<PropertyValue>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            counter: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_requested_name() {
        let mut params = Parameters::new();
        assert_eq!(params.insert(Some("n_name"), "Alice".into()), "n_name");
        assert_eq!(params.get("n_name"), Some(&PropertyValue::from("Alice")));
    }

    #[test]
    fn test_collision_uses_counter() {
        let mut params = Parameters::new();
        params.insert(Some("n_age"), 29i64.into());
        assert_eq!(params.insert(Some("n_age"), 29i64.into()), "param0");
        assert_eq!(params.insert(None, 5i64.into()), "param1");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_counter_skips_taken_names() {
        let mut params = Parameters::new();
        params.insert(Some("param0"), 1i64.into());
        assert_eq!(params.insert(None, 2i64.into()), "param1");
    }

    #[test]
    fn test_serialize() {
        let params: Parameters = [("node_name", "Frank")].into_iter().collect();
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"node_name":"Frank"}"#);
    }

    proptest! {
        #[test]
        fn prop_names_never_collide(requests in proptest::collection::vec(
            proptest::option::of("[a-z]{1,3}"), 0..40)
        ) {
            let mut params = Parameters::new();
            let mut names = std::collections::HashSet::new();
            for (i, requested) in requests.iter().enumerate() {
                let name = params.insert(requested.as_deref(), PropertyValue::Integer(i as i64));
                prop_assert!(names.insert(name));
            }
            prop_assert_eq!(params.len(), requests.len());
        }
    }
}
