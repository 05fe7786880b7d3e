use super::Store;

use crate::shared::Shortcut;

use std::path::Path;

use anyhow::anyhow;
use serde::{Deserialize, Deserializer, Serialize};

/// The persisted shortcut collection. Order is significant: it controls both
/// the settings-row order and the widget grid position.
///
/// Deserialization is deliberately lenient: elements that are not an object
/// with string `url` and `iconUrl` fields are dropped rather than failing the
/// load. Unknown extra keys on well-formed elements are tolerated (and not
/// round-tripped). A top-level value that is not an array is still an error;
/// [`Store`] then falls back to the empty default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ShortcutList(pub Vec<Shortcut>);

impl<'de> Deserialize<'de> for ShortcutList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Vec<serde_json::Value> = Vec::deserialize(deserializer)?;
        let kept = raw
            .into_iter()
            .filter_map(|element| serde_json::from_value::<Shortcut>(element).ok())
            .collect();
        Ok(Self(kept))
    }
}

/// File-backed shortcut collection with a persist-after-every-mutation
/// contract: the in-memory list and the on-disk list never diverge across an
/// operation boundary.
pub struct ShortcutStore {
    store: Store<ShortcutList>,
}

impl ShortcutStore {
    pub const STORE_ID: &'static str = "shortcuts";

    /// Load (or initialise) the shortcut list under `config_dir`.
    ///
    /// Guarantees the settings file exists after the first run: a missing
    /// file is created immediately with an empty array.
    pub fn new(config_dir: &Path) -> Result<Self, anyhow::Error> {
        let store = Store::new(Self::STORE_ID, config_dir, ShortcutList::default())?;
        let this = Self { store };
        if !this.store.path().exists() {
            this.store.save()?;
        }
        Ok(this)
    }

    /// Open the store under the application configuration directory.
    pub fn open() -> Result<Self, anyhow::Error> {
        Self::new(&crate::shared::config_dir())
    }

    pub fn shortcuts(&self) -> &[Shortcut] {
        &self.store.value.0
    }

    pub fn len(&self) -> usize {
        self.store.value.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.value.0.is_empty()
    }

    /// Append a new all-empty shortcut and return its index.
    pub fn add(&mut self) -> Result<usize, anyhow::Error> {
        self.store.value.0.push(Shortcut::empty());
        self.store.save()?;
        Ok(self.store.value.0.len() - 1)
    }

    /// Overwrite both fields verbatim. No URL-format validation.
    pub fn update(&mut self, index: usize, url: &str, icon_url: &str) -> Result<(), anyhow::Error> {
        let shortcut = self.get_mut(index)?;
        shortcut.url = url.to_owned();
        shortcut.icon_url = icon_url.to_owned();
        self.store.save()
    }

    /// Replace only the icon reference, leaving the link untouched.
    pub fn set_icon(&mut self, index: usize, icon_url: &str) -> Result<(), anyhow::Error> {
        self.get_mut(index)?.icon_url = icon_url.to_owned();
        self.store.save()
    }

    /// Remove the element at `index`, preserving the relative order of the
    /// rest.
    pub fn remove(&mut self, index: usize) -> Result<(), anyhow::Error> {
        if index >= self.store.value.0.len() {
            return Err(anyhow!("shortcut index {index} out of range"));
        }
        self.store.value.0.remove(index);
        self.store.save()
    }

    fn get_mut(&mut self, index: usize) -> Result<&mut Shortcut, anyhow::Error> {
        self.store
            .value
            .0
            .get_mut(index)
            .ok_or_else(|| anyhow!("shortcut index {index} out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::ShortcutStore;
    use crate::shared::Shortcut;

    fn shortcut(url: &str, icon_url: &str) -> Shortcut {
        Shortcut {
            url: url.to_owned(),
            icon_url: icon_url.to_owned(),
        }
    }

    fn write_settings(dir: &std::path::Path, payload: &str) {
        std::fs::write(dir.join("shortcuts.json"), payload).unwrap();
    }

    #[test]
    fn malformed_elements_are_dropped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        write_settings(
            dir.path(),
            r#"[
                {"url": "https://example.com", "iconUrl": "https://example.com/icon.png"},
                {"url": "https://no-icon.example"},
                {"url": 7, "iconUrl": "https://example.com/icon.png"},
                "not an object"
            ]"#,
        );

        let store = ShortcutStore::new(dir.path()).unwrap();
        assert_eq!(
            store.shortcuts(),
            &[shortcut(
                "https://example.com",
                "https://example.com/icon.png"
            )]
        );
    }

    #[test]
    fn unknown_extra_keys_are_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        write_settings(
            dir.path(),
            r#"[{"url": "https://example.com", "iconUrl": "", "color": "red"}]"#,
        );

        let store = ShortcutStore::new(dir.path()).unwrap();
        assert_eq!(store.shortcuts(), &[shortcut("https://example.com", "")]);
    }

    #[test]
    fn corrupt_top_level_payload_yields_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        write_settings(dir.path(), r#"{"not": "an array"#);

        let store = ShortcutStore::new(dir.path()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn missing_file_is_created_with_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let store = ShortcutStore::new(dir.path()).unwrap();

        assert!(store.is_empty());
        let payload = std::fs::read_to_string(dir.path().join("shortcuts.json")).unwrap();
        assert_eq!(serde_json::from_str::<serde_json::Value>(&payload).unwrap(), serde_json::json!([]));
    }

    #[test]
    fn add_appends_an_all_empty_shortcut() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ShortcutStore::new(dir.path()).unwrap();
        let index = store.add().unwrap();
        store.update(index, "https://a.example", "").unwrap();

        let index = store.add().unwrap();
        assert_eq!(index, 1);
        assert_eq!(store.shortcuts()[1], Shortcut::empty());
    }

    #[test]
    fn remove_preserves_order_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ShortcutStore::new(dir.path()).unwrap();
        for label in ["a", "b", "c", "d"] {
            let index = store.add().unwrap();
            store
                .update(index, &format!("https://{label}.example"), "")
                .unwrap();
        }

        store.remove(1).unwrap();

        let expected = [
            shortcut("https://a.example", ""),
            shortcut("https://c.example", ""),
            shortcut("https://d.example", ""),
        ];
        assert_eq!(store.shortcuts(), &expected);

        // A fresh load sees exactly what the mutation persisted.
        let reloaded = ShortcutStore::new(dir.path()).unwrap();
        assert_eq!(reloaded.shortcuts(), &expected);
    }

    #[test]
    fn remove_out_of_range_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ShortcutStore::new(dir.path()).unwrap();
        assert!(store.remove(0).is_err());
    }

    #[test]
    fn save_then_load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ShortcutStore::new(dir.path()).unwrap();
        for (url, icon) in [
            ("https://a.example", "https://a.example/icon.png"),
            ("", "file:///home/user/icon_123.png"),
            ("https://c.example", ""),
        ] {
            let index = store.add().unwrap();
            store.update(index, url, icon).unwrap();
        }
        let before = store.shortcuts().to_vec();

        let reloaded = ShortcutStore::new(dir.path()).unwrap();
        assert_eq!(reloaded.shortcuts(), &before[..]);
    }

    #[test]
    fn set_icon_leaves_the_link_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ShortcutStore::new(dir.path()).unwrap();
        let index = store.add().unwrap();
        store.update(index, "https://a.example", "old").unwrap();

        store.set_icon(index, "file:///tmp/icon_42.png").unwrap();
        assert_eq!(
            store.shortcuts()[index],
            shortcut("https://a.example", "file:///tmp/icon_42.png")
        );
    }
}
