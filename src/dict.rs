/// Id-keyed dictionaries and their on-disk JSON form
use crate::error::SyncError;
use crate::Result;
use serde::de::{self, DeserializeOwned, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// String-keyed mapping serialized as a JSON object.
///
/// Keys are unique: inserting a key that is already present is an error, never
/// an overwrite. Entries keep the order they were inserted in, and that is the
/// order they serialize in. Consumers must not attach meaning to the order;
/// it only exists so identical inputs produce byte-identical files.
#[derive(Debug, Clone, PartialEq)]
pub struct Dict<T> {
    entries: Vec<(String, T)>,
    index: HashMap<String, usize>,
}

impl<T> Dict<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build a dictionary keyed by a field of each item
    pub fn from_items<I, F>(items: I, key: F) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        F: Fn(&T) -> &str,
    {
        let mut dict = Self::new();
        for item in items {
            let k = key(&item).to_string();
            dict.insert(k, item)?;
        }
        Ok(dict)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: T) -> Result<()> {
        let key = key.into();
        if self.index.contains_key(&key) {
            return Err(SyncError::DuplicateKey { key });
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        Ok(())
    }

    /// Move every entry of `other` into `self`, failing on the first shared key
    pub fn extend_unique(&mut self, other: Dict<T>) -> Result<()> {
        for (key, value) in other.entries {
            self.insert(key, value)?;
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keep only the entries for which `keep` returns true
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str, &T) -> bool,
    {
        self.entries.retain(|(k, v)| keep(k, v));
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, (k, _))| (k.clone(), i))
            .collect();
    }

    /// Transform every value, keeping keys and order
    pub fn try_map_values<U, F>(self, mut f: F) -> Result<Dict<U>>
    where
        F: FnMut(&str, T) -> Result<U>,
    {
        let mut entries = Vec::with_capacity(self.entries.len());
        for (k, v) in self.entries {
            let mapped = f(&k, v)?;
            entries.push((k, mapped));
        }
        Ok(Dict {
            entries,
            index: self.index,
        })
    }
}

impl<T> Default for Dict<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize> Serialize for Dict<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct DictVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for DictVisitor<T> {
    type Value = Dict<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON object with unique keys")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut dict = Dict::new();
        while let Some((key, value)) = access.next_entry::<String, T>()? {
            if dict.contains_key(&key) {
                return Err(de::Error::custom(format!("duplicate key {}", key)));
            }
            dict.index.insert(key.clone(), dict.entries.len());
            dict.entries.push((key, value));
        }
        Ok(dict)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Dict<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(DictVisitor(PhantomData))
    }
}

/// Read and parse a JSON file
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SyncError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| SyncError::json(path, e))
}

/// Read and parse a JSON file, falling back to the default when it does not exist
pub async fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        debug!("No file at {}, using empty default", path.display());
        return Ok(T::default());
    }
    load_json(path).await
}

/// JSON written to a temporary file beside its destination, not yet visible.
///
/// Dropping it without `commit` removes the temporary file.
#[derive(Debug)]
pub struct StagedJson {
    path: PathBuf,
    file: NamedTempFile,
}

impl StagedJson {
    /// Rename the temporary file over the destination
    pub fn commit(self) -> Result<()> {
        let StagedJson { path, file } = self;
        file.persist(&path).map_err(|e| SyncError::io(&path, e.error))?;
        debug!("💾 Wrote {}", path.display());
        Ok(())
    }
}

/// Serialize `value` as two-space pretty JSON into a temporary file in the
/// destination directory
pub fn stage_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<StagedJson> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| SyncError::io(dir, e))?;

    let json = serde_json::to_string_pretty(value).map_err(|e| SyncError::json(path, e))?;

    let mut file = NamedTempFile::new_in(dir).map_err(|e| SyncError::io(dir, e))?;
    file.write_all(json.as_bytes())
        .map_err(|e| SyncError::io(path, e))?;

    Ok(StagedJson {
        path: path.to_path_buf(),
        file,
    })
}

/// Write `value` as two-space pretty JSON.
///
/// The content goes to a temporary file in the destination directory first and
/// is renamed over `path`, so a reader never observes a half-written file.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    stage_json(path, value)?.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
        value: u32,
    }

    fn item(id: &str, value: u32) -> Item {
        Item {
            id: id.to_string(),
            value,
        }
    }

    #[test]
    fn test_from_items_keys_by_field() {
        let dict = Dict::from_items(vec![item("b", 2), item("a", 1)], |i| &i.id).unwrap();

        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get("a"), Some(&item("a", 1)));
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn test_duplicate_key_is_rejected() {
        let result = Dict::from_items(vec![item("a", 1), item("a", 2)], |i| &i.id);

        match result {
            Err(SyncError::DuplicateKey { key }) => assert_eq!(key, "a"),
            other => panic!("expected duplicate key error, got {:?}", other),
        }
    }

    #[test]
    fn test_extend_unique_rejects_overlap() {
        let mut left = Dict::from_items(vec![item("a", 1)], |i| &i.id).unwrap();
        let right = Dict::from_items(vec![item("b", 2), item("a", 3)], |i| &i.id).unwrap();

        assert!(left.extend_unique(right).is_err());
    }

    #[test]
    fn test_retain_rebuilds_index() {
        let mut dict =
            Dict::from_items(vec![item("a", 1), item("b", 2), item("c", 3)], |i| &i.id).unwrap();
        dict.retain(|k, _| k != "a");

        assert_eq!(dict.len(), 2);
        assert!(!dict.contains_key("a"));
        assert_eq!(dict.get("c"), Some(&item("c", 3)));
    }

    #[test]
    fn test_serializes_in_insertion_order() {
        let dict = Dict::from_items(vec![item("z", 1), item("a", 2)], |i| &i.id).unwrap();
        let json = serde_json::to_string(&dict).unwrap();

        assert_eq!(json, r#"{"z":{"id":"z","value":1},"a":{"id":"a","value":2}}"#);
    }

    #[test]
    fn test_deserialize_rejects_duplicate_keys() {
        let json = r#"{"a": {"id": "a", "value": 1}, "a": {"id": "a", "value": 2}}"#;
        let result: std::result::Result<Dict<Item>, _> = serde_json::from_str(json);

        assert!(result.is_err());
    }

    #[test]
    fn test_save_json_is_pretty_and_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dict.json");

        let dict = Dict::from_items(vec![item("a", 1)], |i| &i.id).unwrap();
        save_json(&path, &dict).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        assert!(first.starts_with("{\n  \"a\": {\n    \"id\": \"a\""));

        let dict = Dict::from_items(vec![item("b", 2)], |i| &i.id).unwrap();
        save_json(&path, &dict).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert!(second.contains("\"b\""));
        assert!(!second.contains("\"a\""));
    }

    #[test]
    fn test_staged_json_is_invisible_until_commit() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dict.json");

        let dict = Dict::from_items(vec![item("a", 1)], |i| &i.id).unwrap();
        let staged = stage_json(&path, &dict).unwrap();
        assert!(!path.exists());

        staged.commit().unwrap();
        assert!(path.exists());

        drop(stage_json(&path, &Dict::<Item>::new()).unwrap());
        let entries = std::fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(entries, 1);
        assert!(std::fs::read_to_string(&path).unwrap().contains("\"a\""));
    }

    #[tokio::test]
    async fn test_load_json_or_default_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let loaded: Vec<String> = load_json_or_default(&temp_dir.path().join("missing.json"))
            .await
            .unwrap();

        assert!(loaded.is_empty());
    }
}
