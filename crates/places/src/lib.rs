use serde::{Deserialize, Serialize};

/// localStorage key holding the JSON-encoded place array.
pub const STORAGE_KEY: &str = "myPlaces";

/// A named geographic coordinate saved by the user.
///
/// Immutable after creation except for deletion. The persisted field name for
/// the timestamp is `createdAt` (epoch milliseconds) to match the stored blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPlace {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "createdAt")]
    pub created_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceStoreError {
    StorageUnavailable,
    Io(String),
}

impl std::fmt::Display for PlaceStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaceStoreError::StorageUnavailable => write!(f, "browser storage unavailable"),
            PlaceStoreError::Io(msg) => write!(f, "place storage error: {msg}"),
        }
    }
}

impl std::error::Error for PlaceStoreError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceError {
    EmptyName,
    Store(PlaceStoreError),
}

impl std::fmt::Display for PlaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaceError::EmptyName => write!(f, "place name must not be empty"),
            PlaceError::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PlaceError {}

/// Ordered, unique-by-id list of all saved places.
///
/// Insertion order is preserved; there is no implicit resort. This collection
/// is the single source of truth for what markers must exist on the map.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceCollection {
    places: Vec<SavedPlace>,
}

impl PlaceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SavedPlace> {
        self.places.iter()
    }

    pub fn get(&self, id: &str) -> Option<&SavedPlace> {
        self.places.iter().find(|p| p.id == id)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Append a new place with a freshly generated id and the given timestamp,
    /// returning the new entry.
    ///
    /// The name is trimmed; an empty result is rejected. Ids are derived from
    /// `now_ms` and are unique within this collection.
    pub fn insert(
        &mut self,
        name: &str,
        lat: f64,
        lng: f64,
        now_ms: u64,
    ) -> Result<SavedPlace, PlaceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlaceError::EmptyName);
        }
        let place = SavedPlace {
            id: self.next_id(now_ms),
            name: name.to_string(),
            lat,
            lng,
            created_at_ms: now_ms,
        };
        self.places.push(place.clone());
        Ok(place)
    }

    /// Remove by id, preserving the order of the remaining places.
    ///
    /// Returns `false` (not an error) if the id is absent.
    pub fn remove(&mut self, id: &str) -> bool {
        self.take(id).is_some()
    }

    pub(crate) fn take(&mut self, id: &str) -> Option<(usize, SavedPlace)> {
        let idx = self.places.iter().position(|p| p.id == id)?;
        Some((idx, self.places.remove(idx)))
    }

    pub(crate) fn restore(&mut self, idx: usize, place: SavedPlace) {
        let idx = idx.min(self.places.len());
        self.places.insert(idx, place);
    }

    fn next_id(&self, now_ms: u64) -> String {
        let base = now_ms.to_string();
        if !self.contains_id(&base) {
            return base;
        }
        let mut n = 1u32;
        loop {
            let candidate = format!("{base}-{n}");
            if !self.contains_id(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Decode a persisted blob. Absent or unparsable data is an empty
    /// collection; corruption is never surfaced to the caller.
    pub fn from_blob(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::new();
        };
        if raw.trim().is_empty() {
            return Self::new();
        }
        serde_json::from_str(raw).unwrap_or_default()
    }

    pub fn to_blob(&self) -> Result<String, PlaceStoreError> {
        serde_json::to_string(self).map_err(|e| PlaceStoreError::Io(e.to_string()))
    }
}

/// Durable backend for the place collection.
///
/// Every mutation persists the entire collection as one write; there is no
/// incremental persistence or transaction log.
pub trait PlaceStore {
    /// Read the persisted collection. Absent or corrupt data yields an empty
    /// collection, never an error.
    fn load(&self) -> PlaceCollection;

    /// Overwrite the persisted collection with `places`.
    fn persist(&mut self, places: &PlaceCollection) -> Result<(), PlaceStoreError>;
}

/// Backend holding the serialized blob in memory. Used natively and in tests
/// so blob-level invariants can be asserted directly.
#[derive(Debug, Default)]
pub struct InMemoryPlaceStore {
    blob: Option<String>,
}

impl InMemoryPlaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(raw: impl Into<String>) -> Self {
        Self {
            blob: Some(raw.into()),
        }
    }

    pub fn blob(&self) -> Option<&str> {
        self.blob.as_deref()
    }
}

impl PlaceStore for InMemoryPlaceStore {
    fn load(&self) -> PlaceCollection {
        PlaceCollection::from_blob(self.blob.as_deref())
    }

    fn persist(&mut self, places: &PlaceCollection) -> Result<(), PlaceStoreError> {
        self.blob = Some(places.to_blob()?);
        Ok(())
    }
}

/// In-memory collection plus durable backend, kept reconciled.
///
/// Mutations complete their persistence write before returning, so a
/// subsequent `load` in the same turn observes the mutation. When the write
/// fails the in-memory change is rolled back; memory and storage never
/// diverge.
#[derive(Debug)]
pub struct PlaceBook<S: PlaceStore> {
    store: S,
    places: PlaceCollection,
}

impl<S: PlaceStore> PlaceBook<S> {
    pub fn open(store: S) -> Self {
        let places = store.load();
        Self { store, places }
    }

    pub fn places(&self) -> &PlaceCollection {
        &self.places
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn add(
        &mut self,
        name: &str,
        lat: f64,
        lng: f64,
        now_ms: u64,
    ) -> Result<SavedPlace, PlaceError> {
        let place = self.places.insert(name, lat, lng, now_ms)?;
        if let Err(e) = self.store.persist(&self.places) {
            self.places.remove(&place.id);
            return Err(PlaceError::Store(e));
        }
        Ok(place)
    }

    /// Remove by id and persist. Absent ids are a no-op with no write.
    pub fn remove(&mut self, id: &str) -> Result<bool, PlaceError> {
        let Some((idx, removed)) = self.places.take(id) else {
            return Ok(false);
        };
        if let Err(e) = self.store.persist(&self.places) {
            self.places.restore(idx, removed);
            return Err(PlaceError::Store(e));
        }
        Ok(true)
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm_storage {
    use super::{PlaceCollection, PlaceStore, PlaceStoreError};

    /// Backend over one `window.localStorage` key.
    #[derive(Debug)]
    pub struct LocalStoragePlaceStore {
        key: String,
    }

    impl LocalStoragePlaceStore {
        pub fn new(key: impl Into<String>) -> Self {
            Self { key: key.into() }
        }
    }

    impl PlaceStore for LocalStoragePlaceStore {
        fn load(&self) -> PlaceCollection {
            let Ok(storage) = window_local_storage() else {
                return PlaceCollection::new();
            };
            let raw = storage.get_item(&self.key).ok().flatten();
            PlaceCollection::from_blob(raw.as_deref())
        }

        fn persist(&mut self, places: &PlaceCollection) -> Result<(), PlaceStoreError> {
            let storage = window_local_storage()?;
            let raw = places.to_blob()?;
            storage
                .set_item(&self.key, &raw)
                .map_err(|e| PlaceStoreError::Io(format!("set_item failed: {:?}", e)))
        }
    }

    fn window_local_storage() -> Result<web_sys::Storage, PlaceStoreError> {
        let win = web_sys::window().ok_or(PlaceStoreError::StorageUnavailable)?;
        win.local_storage()
            .map_err(|e| PlaceStoreError::Io(format!("localStorage error: {:?}", e)))?
            .ok_or(PlaceStoreError::StorageUnavailable)
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_storage::LocalStoragePlaceStore;

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct LocalStoragePlaceStore;

#[cfg(not(target_arch = "wasm32"))]
impl LocalStoragePlaceStore {
    pub fn new(_key: impl Into<String>) -> Self {
        Self
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl PlaceStore for LocalStoragePlaceStore {
    fn load(&self) -> PlaceCollection {
        PlaceCollection::new()
    }

    fn persist(&mut self, _places: &PlaceCollection) -> Result<(), PlaceStoreError> {
        Err(PlaceStoreError::StorageUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn book() -> PlaceBook<InMemoryPlaceStore> {
        PlaceBook::open(InMemoryPlaceStore::new())
    }

    #[test]
    fn add_appends_and_persists_one_record() {
        let mut book = book();
        let place = book.add("Home", 1.0, 2.0, 1_000).unwrap();

        assert!(!place.id.is_empty());
        assert_eq!(book.places().len(), 1);

        let blob = book.store().blob().unwrap();
        let decoded: Vec<SavedPlace> = serde_json::from_str(blob).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].name, "Home");
        assert_eq!(decoded[0].lat, 1.0);
        assert_eq!(decoded[0].lng, 2.0);
    }

    #[test]
    fn add_trims_name_and_rejects_empty() {
        let mut book = book();
        let place = book.add("  Cafe  ", 0.0, 0.0, 1).unwrap();
        assert_eq!(place.name, "Cafe");

        assert_eq!(book.add("   ", 0.0, 0.0, 2), Err(PlaceError::EmptyName));
        assert_eq!(book.places().len(), 1);
    }

    #[test]
    fn ids_are_unique_for_identical_timestamps() {
        let mut book = book();
        let a = book.add("a", 0.0, 0.0, 7).unwrap();
        let b = book.add("b", 0.0, 0.0, 7).unwrap();
        let c = book.add("c", 0.0, 0.0, 7).unwrap();

        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut book = book();
        book.add("first", 0.0, 0.0, 1).unwrap();
        book.add("second", 0.0, 0.0, 2).unwrap();
        book.add("third", 0.0, 0.0, 3).unwrap();

        let names: Vec<_> = book.places().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn remove_first_of_two_keeps_only_second() {
        let mut book = book();
        let first = book.add("first", 1.0, 1.0, 1).unwrap();
        let second = book.add("second", 2.0, 2.0, 2).unwrap();

        assert_eq!(book.remove(&first.id), Ok(true));
        assert_eq!(book.places().len(), 1);
        assert_eq!(book.places().iter().next().unwrap().id, second.id);
    }

    #[test]
    fn remove_of_absent_id_is_a_noop() {
        let mut book = book();
        book.add("only", 0.0, 0.0, 1).unwrap();
        let blob_before = book.store().blob().map(str::to_string);

        assert_eq!(book.remove("no-such-id"), Ok(false));
        assert_eq!(book.places().len(), 1);
        assert_eq!(book.store().blob().map(str::to_string), blob_before);
    }

    #[test]
    fn persisted_blob_always_matches_memory() {
        let mut book = book();
        let a = book.add("a", 1.0, 2.0, 10).unwrap();
        book.add("b", 3.0, 4.0, 20).unwrap();
        book.remove(&a.id).unwrap();
        book.add("c", 5.0, 6.0, 30).unwrap();

        let decoded: Vec<SavedPlace> = serde_json::from_str(book.store().blob().unwrap()).unwrap();
        let in_memory: Vec<SavedPlace> = book.places().iter().cloned().collect();
        assert_eq!(decoded, in_memory);
    }

    #[test]
    fn corrupt_blob_loads_as_empty() {
        let book = PlaceBook::open(InMemoryPlaceStore::with_blob("{not json"));
        assert!(book.places().is_empty());
    }

    #[test]
    fn absent_blob_loads_as_empty() {
        assert!(PlaceCollection::from_blob(None).is_empty());
        assert!(PlaceCollection::from_blob(Some("")).is_empty());
    }

    #[test]
    fn unknown_fields_are_ignored_on_load() {
        let raw = r#"[{"id":"1","name":"Home","lat":1.0,"lng":2.0,"createdAt":5,"extra":"x"}]"#;
        let places = PlaceCollection::from_blob(Some(raw));
        assert_eq!(places.len(), 1);
        assert_eq!(places.iter().next().unwrap().created_at_ms, 5);
    }

    #[test]
    fn blob_round_trips() {
        let mut places = PlaceCollection::new();
        places.insert("Home", -1.286389, 36.817223, 42).unwrap();
        let raw = places.to_blob().unwrap();
        assert_eq!(PlaceCollection::from_blob(Some(&raw)), places);
    }

    struct FailingStore;

    impl PlaceStore for FailingStore {
        fn load(&self) -> PlaceCollection {
            PlaceCollection::new()
        }

        fn persist(&mut self, _places: &PlaceCollection) -> Result<(), PlaceStoreError> {
            Err(PlaceStoreError::StorageUnavailable)
        }
    }

    #[test]
    fn failed_persist_rolls_back_add() {
        let mut book = PlaceBook::open(FailingStore);
        let err = book.add("Home", 1.0, 2.0, 1).unwrap_err();
        assert_eq!(err, PlaceError::Store(PlaceStoreError::StorageUnavailable));
        assert!(book.places().is_empty());
    }

    #[test]
    fn failed_persist_rolls_back_remove_in_place() {
        let mut store = InMemoryPlaceStore::new();
        let mut seed = PlaceCollection::new();
        seed.insert("a", 0.0, 0.0, 1).unwrap();
        let id = seed.iter().next().unwrap().id.clone();
        store.persist(&seed).unwrap();

        struct FailAfterLoad(InMemoryPlaceStore);
        impl PlaceStore for FailAfterLoad {
            fn load(&self) -> PlaceCollection {
                self.0.load()
            }
            fn persist(&mut self, _places: &PlaceCollection) -> Result<(), PlaceStoreError> {
                Err(PlaceStoreError::StorageUnavailable)
            }
        }

        let mut book = PlaceBook::open(FailAfterLoad(store));
        assert!(book.remove(&id).is_err());
        assert_eq!(book.places().len(), 1);
        assert_eq!(book.places().iter().next().unwrap().id, id);
    }
}
