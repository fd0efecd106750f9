//! Generic atomic JSON document store.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::StoreError;

/// Schema version written to fresh and healed collection files.
pub const SCHEMA_VERSION: &str = "1.0";

/// A document stored in a collection.
///
/// The ID is immutable and unique within its collection file; [`FileStore`]
/// enforces uniqueness on insert.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    /// The document's unique ID within its collection.
    fn id(&self) -> Uuid;
}

/// One collection's in-memory state: the schema version read from disk plus
/// the documents themselves.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    /// Schema version string from the file (preserved on rewrite).
    pub schema_version: String,
    /// The documents.
    pub items: Vec<T>,
}

impl<T> Collection<T> {
    fn empty() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            items: Vec::new(),
        }
    }
}

/// Outcome of attempting to load the collection file.
enum Loaded<T> {
    /// File present and well-formed.
    Ok(Collection<T>),
    /// File absent; lazy initialization applies.
    Missing,
    /// File present but unparseable or structurally invalid.
    Corrupt(String),
}

/// Durable, crash-consistent storage for one JSON collection file.
///
/// Writers are serialized by a per-store async mutex; the lock is released on
/// every exit path by guard drop. Plain reads do not take the lock and may
/// observe the pre-write snapshot while a writer is in flight (last-write-wins,
/// not serializable isolation).
pub struct FileStore<T> {
    path: PathBuf,
    collection: &'static str,
    write_lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> FileStore<T> {
    /// Create a store for one collection file.
    ///
    /// `collection` is both the logical name and the JSON key the document
    /// array is stored under. The file is created lazily on first access.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, collection: &'static str) -> Self {
        Self {
            path: path.into(),
            collection,
            write_lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    /// The path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The collection name (and JSON array key).
    #[must_use]
    pub const fn collection(&self) -> &'static str {
        self.collection
    }

    /// Ensure the backing file exists and is well-formed.
    ///
    /// Idempotent: a well-formed existing file is left untouched, preserving
    /// its schema version. A missing, corrupt, or structurally invalid file is
    /// (re)written to the empty default.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be read or (re)written.
    pub async fn init(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        match self.try_load().await? {
            Loaded::Ok(_) => Ok(()),
            Loaded::Missing => self.persist(&Collection::empty()).await,
            Loaded::Corrupt(reason) => {
                tracing::warn!(
                    collection = self.collection,
                    path = %self.path.display(),
                    reason,
                    "collection file corrupt on init, resetting to empty default"
                );
                self.persist(&Collection::empty()).await
            }
        }
    }

    /// Read the collection.
    ///
    /// A missing file triggers lazy initialization; a corrupt file is logged
    /// and healed to the empty default. Both cases return the default rather
    /// than an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] for disk failures other than "file absent".
    pub async fn read(&self) -> Result<Collection<T>, StoreError> {
        match self.try_load().await? {
            Loaded::Ok(collection) => Ok(collection),
            // Healing writes to disk, so take the writer lock. Re-check under
            // the lock: another caller may have repaired the file already.
            Loaded::Missing | Loaded::Corrupt(_) => {
                let _guard = self.write_lock.lock().await;
                match self.try_load().await? {
                    Loaded::Ok(collection) => Ok(collection),
                    Loaded::Missing => {
                        let empty = Collection::empty();
                        self.persist(&empty).await?;
                        Ok(empty)
                    }
                    Loaded::Corrupt(reason) => {
                        tracing::warn!(
                            collection = self.collection,
                            path = %self.path.display(),
                            reason,
                            "collection file corrupt, resetting to empty default"
                        );
                        let empty = Collection::empty();
                        self.persist(&empty).await?;
                        Ok(empty)
                    }
                }
            }
        }
    }

    /// Replace the collection's documents wholesale.
    ///
    /// Serializes to a `.tmp` sibling, then atomically renames it over the
    /// target path, so the collection file is never observed half-written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`] if a document cannot be serialized,
    /// [`StoreError::InvalidStructure`] if the serialized form is not an
    /// array, or [`StoreError::Io`] on disk failure.
    pub async fn write(&self, items: &[T]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let current = match self.try_load().await? {
            Loaded::Ok(collection) => collection.schema_version,
            Loaded::Missing | Loaded::Corrupt(_) => SCHEMA_VERSION.to_string(),
        };
        self.persist_items(&current, items).await
    }

    /// Run a serialized read-modify-write cycle.
    ///
    /// The writer lock is held across load, closure, and persist, so two
    /// concurrent `update` calls cannot interleave and lose writes. When the
    /// closure returns `Err`, nothing is written. A closure that leaves the
    /// items unchanged skips the rewrite entirely, except when the load had
    /// to heal a missing or corrupt file.
    ///
    /// # Errors
    ///
    /// Propagates the closure's error, or a [`StoreError`] (converted via
    /// `E: From<StoreError>`) from the load/persist steps.
    pub async fn update<R, E, F>(&self, f: F) -> Result<R, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Vec<T>) -> Result<R, E>,
    {
        let _guard = self.write_lock.lock().await;
        let (mut collection, healed) = match self.try_load().await.map_err(E::from)? {
            Loaded::Ok(collection) => (collection, false),
            Loaded::Missing => (Collection::empty(), true),
            Loaded::Corrupt(reason) => {
                tracing::warn!(
                    collection = self.collection,
                    path = %self.path.display(),
                    reason,
                    "collection file corrupt, resetting to empty default"
                );
                (Collection::empty(), true)
            }
        };

        let before = if healed {
            None
        } else {
            Some(
                serde_json::to_value(&collection.items)
                    .map_err(StoreError::from)
                    .map_err(E::from)?,
            )
        };

        let out = f(&mut collection.items)?;

        let after = serde_json::to_value(&collection.items)
            .map_err(StoreError::from)
            .map_err(E::from)?;
        if healed || before.as_ref() != Some(&after) {
            self.persist(&collection).await.map_err(E::from)?;
        }
        Ok(out)
    }

    /// Insert a document, enforcing ID uniqueness.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateId`] if a document with the same ID
    /// already exists, or any error from the underlying update cycle.
    pub async fn insert(&self, item: T) -> Result<(), StoreError> {
        let id = item.id();
        self.update(move |items| {
            if items.iter().any(|existing| existing.id() == id) {
                return Err(StoreError::DuplicateId(id));
            }
            items.push(item);
            Ok(())
        })
        .await
    }

    /// Find one document by ID.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] for disk failures other than "file absent".
    pub async fn find(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        let collection = self.read().await?;
        Ok(collection.items.into_iter().find(|item| item.id() == id))
    }

    /// Read and parse the backing file without modifying anything.
    async fn try_load(&self) -> Result<Loaded<T>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Loaded::Missing);
            }
            Err(err) => return Err(StoreError::Io(err)),
        };

        let value: Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(err) => return Ok(Loaded::Corrupt(format!("invalid JSON: {err}"))),
        };

        Ok(self.parse_document(value))
    }

    /// Validate the collection-file structure and decode the documents.
    fn parse_document(&self, value: Value) -> Loaded<T> {
        let Value::Object(mut map) = value else {
            return Loaded::Corrupt("root is not an object".to_string());
        };

        let schema_version = match map.get("schemaVersion") {
            Some(Value::String(version)) => version.clone(),
            Some(_) => return Loaded::Corrupt("schemaVersion is not a string".to_string()),
            None => return Loaded::Corrupt("schemaVersion missing".to_string()),
        };

        let items_value = match map.remove(self.collection) {
            Some(value @ Value::Array(_)) => value,
            Some(_) => {
                return Loaded::Corrupt(format!("field '{}' is not an array", self.collection));
            }
            None => return Loaded::Corrupt(format!("field '{}' missing", self.collection)),
        };

        match serde_json::from_value::<Vec<T>>(items_value) {
            Ok(items) => Loaded::Ok(Collection {
                schema_version,
                items,
            }),
            Err(err) => Loaded::Corrupt(format!("undecodable document: {err}")),
        }
    }

    /// Serialize and atomically replace the backing file.
    ///
    /// Caller must hold the writer lock.
    async fn persist(&self, collection: &Collection<T>) -> Result<(), StoreError> {
        self.persist_items(&collection.schema_version, &collection.items)
            .await
    }

    async fn persist_items(&self, schema_version: &str, items: &[T]) -> Result<(), StoreError> {
        let items_value = serde_json::to_value(items)?;
        if !items_value.is_array() {
            return Err(StoreError::InvalidStructure(format!(
                "serialized '{}' is not an array",
                self.collection
            )));
        }

        let mut document = Map::new();
        document.insert(
            "schemaVersion".to_string(),
            Value::String(schema_version.to_string()),
        );
        document.insert(self.collection.to_string(), items_value);
        let bytes = serde_json::to_vec_pretty(&Value::Object(document))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    /// The transient sibling path used during atomic replace.
    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map_or_else(|| "collection".into(), std::ffi::OsStr::to_os_string);
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde::Deserialize;
    use tempfile::TempDir;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Widget {
        id: Uuid,
        name: String,
        count: u32,
    }

    impl Document for Widget {
        fn id(&self) -> Uuid {
            self.id
        }
    }

    impl Widget {
        fn new(name: &str) -> Self {
            Self {
                id: Uuid::new_v4(),
                name: name.to_string(),
                count: 0,
            }
        }
    }

    fn store_in(dir: &TempDir) -> FileStore<Widget> {
        FileStore::new(dir.path().join("widgets.json"), "widgets")
    }

    #[tokio::test]
    async fn test_read_absent_file_lazily_initializes() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let collection = store.read().await.unwrap();
        assert_eq!(collection.schema_version, SCHEMA_VERSION);
        assert!(collection.items.is_empty());

        // The default was persisted, not just returned.
        let on_disk = std::fs::read_to_string(store.path()).unwrap();
        let value: Value = serde_json::from_str(&on_disk).unwrap();
        assert_eq!(value["schemaVersion"], "1.0");
        assert!(value["widgets"].is_array());
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let widgets = vec![Widget::new("a"), Widget::new("b")];
        store.write(&widgets).await.unwrap();

        let collection = store.read().await.unwrap();
        assert_eq!(collection.items, widgets);
    }

    #[tokio::test]
    async fn test_corrupt_json_is_healed() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), b"{not json at all").unwrap();

        let collection = store.read().await.unwrap();
        assert!(collection.items.is_empty());

        // File was rewritten to a valid default.
        let on_disk = std::fs::read_to_string(store.path()).unwrap();
        let value: Value = serde_json::from_str(&on_disk).unwrap();
        assert!(value["widgets"].is_array());
    }

    #[tokio::test]
    async fn test_non_array_collection_field_is_healed() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            br#"{"schemaVersion":"1.0","widgets":"oops"}"#,
        )
        .unwrap();

        let collection = store.read().await.unwrap();
        assert!(collection.items.is_empty());
    }

    #[tokio::test]
    async fn test_missing_schema_version_is_healed() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), br#"{"widgets":[]}"#).unwrap();

        let collection = store.read().await.unwrap();
        assert_eq!(collection.schema_version, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_init_is_idempotent_on_well_formed_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.write(&[Widget::new("keep")]).await.unwrap();
        let before = std::fs::read(store.path()).unwrap();

        store.init().await.unwrap();

        let after = std::fs::read(store.path()).unwrap();
        assert_eq!(before, after, "init must not rewrite a well-formed file");
    }

    #[tokio::test]
    async fn test_schema_version_preserved_across_updates() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), br#"{"schemaVersion":"2.7","widgets":[]}"#).unwrap();

        store
            .update::<_, StoreError, _>(|items| {
                items.push(Widget::new("x"));
                Ok(())
            })
            .await
            .unwrap();

        let collection = store.read().await.unwrap();
        assert_eq!(collection.schema_version, "2.7");
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let widget = Widget::new("dup");
        store.insert(widget.clone()).await.unwrap();
        let err = store.insert(widget.clone()).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(id) if id == widget.id));
    }

    #[tokio::test]
    async fn test_failed_update_closure_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.write(&[Widget::new("only")]).await.unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let result: Result<(), StoreError> = store
            .update(|items| {
                items.clear();
                Err(StoreError::InvalidStructure("domain rejection".to_string()))
            })
            .await;
        assert!(result.is_err());

        let after = std::fs::read(store.path()).unwrap();
        assert_eq!(before, after, "a failed update must not touch the file");
    }

    #[tokio::test]
    async fn test_pure_read_update_does_not_rewrite() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.write(&[Widget::new("only")]).await.unwrap();
        let before = std::fs::metadata(store.path()).unwrap().modified().unwrap();

        let count = store
            .update::<_, StoreError, _>(|items| Ok(items.len()))
            .await
            .unwrap();
        assert_eq!(count, 1);

        let after = std::fs::metadata(store.path()).unwrap().modified().unwrap();
        assert_eq!(
            before, after,
            "an update that changes nothing must not rewrite the file"
        );
    }

    #[tokio::test]
    async fn test_update_on_absent_file_still_initializes() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store
            .update::<_, StoreError, _>(|items| Ok(items.len()))
            .await
            .unwrap();

        // Healing a missing file persists the default even without changes.
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_no_tmp_sibling_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.write(&[Widget::new("a")]).await.unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .filter(|name| name.to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_updates_lose_nothing() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store_in(&dir));

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .update::<_, StoreError, _>(move |items| {
                        items.push(Widget::new(&format!("w{i}")));
                        Ok(())
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Every read-modify-write cycle was serialized: all 20 survive, and
        // the file still deserializes with the collection as an array.
        let collection = store.read().await.unwrap();
        assert_eq!(collection.items.len(), 20);
        let on_disk = std::fs::read_to_string(store.path()).unwrap();
        let value: Value = serde_json::from_str(&on_disk).unwrap();
        assert!(value["widgets"].is_array());
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let widget = Widget::new("needle");
        store.insert(widget.clone()).await.unwrap();

        assert_eq!(store.find(widget.id).await.unwrap(), Some(widget));
        assert_eq!(store.find(Uuid::new_v4()).await.unwrap(), None);
    }
}
