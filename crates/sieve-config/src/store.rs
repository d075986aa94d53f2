use crate::document::{ConfigDocument, DebugExport, FilterList, UpdatePolicy};
use crate::DEFAULT_CONFIG_JSON;
use sieve_error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// The persisted configuration document, guarded end-to-end by a
/// reader/writer lock. Every mutator takes the exclusive lock, mutates
/// the in-memory document, and persists it to `path` before releasing
/// the lock; [`ConfigStore::save`] itself is crate-private and must
/// never be called without already holding that lock — doing so is a
/// bug class this type does not defend against at runtime, matching the
/// contract of the store this was ported from.
pub struct ConfigStore {
    path: PathBuf,
    document: RwLock<ConfigDocument>,
    first_launch: bool,
}

impl ConfigStore {
    /// Loads the configuration document at `path`. If no file exists
    /// there yet, the embedded default document is written verbatim,
    /// `first_launch` is recorded, and that default is what gets parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (content, first_launch) = match std::fs::read_to_string(&path) {
            Ok(content) => (content, false),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                std::fs::write(&path, DEFAULT_CONFIG_JSON)
                    .map_err(|e| Error::Config(format!("writing default config: {e}")))?;
                (DEFAULT_CONFIG_JSON.to_owned(), true)
            }
            Err(e) => return Err(Error::Config(format!("reading config file: {e}"))),
        };

        let document: ConfigDocument =
            serde_json::from_str(&content).map_err(|e| Error::Config(format!("parsing config file: {e}")))?;

        if first_launch {
            log::info!("no configuration file found at {}; wrote the default document", path.display());
        }

        Ok(Self {
            path,
            document: RwLock::new(document),
            first_launch,
        })
    }

    /// Whether this process had to write the embedded default document
    /// because none existed at `path` yet. A process-local fact, not
    /// itself persisted.
    pub fn first_launch(&self) -> bool {
        self.first_launch
    }

    fn save(&self, document: &ConfigDocument) -> Result<()> {
        let serialized =
            serde_json::to_vec_pretty(document).map_err(|e| Error::Config(format!("serializing config: {e}")))?;
        std::fs::write(&self.path, serialized).map_err(|e| Error::Config(format!("writing config file: {e}")))
    }

    /// The full path this store was loaded from and will persist to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All registered filter lists, enabled or not.
    pub fn filter_lists(&self) -> Vec<FilterList> {
        self.document.read().unwrap().filter.filter_lists.clone()
    }

    /// Registers a new filter list, unless one with the same URL is
    /// already present.
    pub fn add_filter_list(&self, list: FilterList) -> Result<()> {
        let mut document = self.document.write().unwrap();
        if document.filter.filter_lists.iter().any(|existing| existing.url == list.url) {
            return Err(Error::Config(format!("filter list with the URL '{}' already exists", list.url)));
        }
        document.filter.filter_lists.push(list);
        self.save(&document)
    }

    /// Removes the filter list with the given URL, if one is present.
    pub fn remove_filter_list(&self, url: &str) -> Result<()> {
        let mut document = self.document.write().unwrap();
        document.filter.filter_lists.retain(|list| list.url != url);
        self.save(&document)
    }

    /// Sets the enabled state of the filter list with the given URL.
    pub fn toggle_filter_list(&self, url: &str, enabled: bool) -> Result<()> {
        let mut document = self.document.write().unwrap();
        if let Some(list) = document.filter.filter_lists.iter_mut().find(|list| list.url == url) {
            list.enabled = enabled;
        }
        self.save(&document)
    }

    /// The user's own custom rule lines.
    pub fn my_rules(&self) -> Vec<String> {
        self.document.read().unwrap().filter.my_rules.clone()
    }

    pub fn set_my_rules(&self, rules: Vec<String>) -> Result<()> {
        let mut document = self.document.write().unwrap();
        document.filter.my_rules = rules;
        self.save(&document)
    }

    /// The port the proxy listens on.
    pub fn port(&self) -> u16 {
        self.document.read().unwrap().proxy.port
    }

    pub fn set_port(&self, port: u16) -> Result<()> {
        let mut document = self.document.write().unwrap();
        document.proxy.port = port;
        self.save(&document)
    }

    /// Hostnames the proxy should not intercept.
    pub fn ignored_hosts(&self) -> Vec<String> {
        self.document.read().unwrap().proxy.ignored_hosts.clone()
    }

    pub fn set_ignored_hosts(&self, hosts: Vec<String>) -> Result<()> {
        let mut document = self.document.write().unwrap();
        document.proxy.ignored_hosts = hosts;
        self.save(&document)
    }

    /// The PAC (proxy-autoconfig) server's port.
    pub fn pac_port(&self) -> u16 {
        self.document.read().unwrap().proxy.pac_port
    }

    /// Whether the MITM root certificate is installed in the system
    /// trust store.
    pub fn ca_installed(&self) -> bool {
        self.document.read().unwrap().certmanager.ca_installed
    }

    pub fn set_ca_installed(&self, installed: bool) -> Result<()> {
        let mut document = self.document.write().unwrap();
        document.certmanager.ca_installed = installed;
        self.save(&document)
    }

    pub fn update_policy(&self) -> UpdatePolicy {
        self.document.read().unwrap().update_policy
    }

    pub fn set_update_policy(&self, policy: UpdatePolicy) -> Result<()> {
        let mut document = self.document.write().unwrap();
        document.update_policy = policy;
        self.save(&document)
    }

    pub fn locale(&self) -> String {
        self.document.read().unwrap().locale.clone()
    }

    pub fn set_locale(&self, locale: String) -> Result<()> {
        let mut document = self.document.write().unwrap();
        document.locale = locale;
        self.save(&document)
    }

    /// The document the management UI's debug-export action reads:
    /// enabled filter list URLs, the user's own rules, and build
    /// platform/architecture/version.
    pub fn export_debug_data(&self) -> DebugExport {
        let document = self.document.read().unwrap();
        let enabled_filter_list_urls = document
            .filter
            .filter_lists
            .iter()
            .filter(|list| list.enabled)
            .map(|list| list.url.clone())
            .collect();

        DebugExport {
            enabled_filter_list_urls,
            custom_rules: document.filter.my_rules.clone(),
            platform: std::env::consts::OS.to_owned(),
            architecture: std::env::consts::ARCH.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FilterListType;

    fn temp_path() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        (dir, path)
    }

    #[test]
    fn first_load_writes_the_embedded_default_and_marks_first_launch() {
        let (_dir, path) = temp_path();
        let store = ConfigStore::load(&path).unwrap();
        assert!(store.first_launch());
        assert!(path.exists());
        assert_eq!(store.port(), 8080);
    }

    #[test]
    fn subsequent_load_does_not_report_first_launch() {
        let (_dir, path) = temp_path();
        ConfigStore::load(&path).unwrap();
        let second = ConfigStore::load(&path).unwrap();
        assert!(!second.first_launch());
    }

    #[test]
    fn mutator_persists_before_returning() {
        let (_dir, path) = temp_path();
        let store = ConfigStore::load(&path).unwrap();
        store.set_port(9090).unwrap();

        let reloaded = ConfigStore::load(&path).unwrap();
        assert_eq!(reloaded.port(), 9090);
    }

    #[test]
    fn add_filter_list_rejects_duplicate_urls() {
        let (_dir, path) = temp_path();
        let store = ConfigStore::load(&path).unwrap();
        let list = FilterList {
            name: "EasyList".into(),
            kind: FilterListType::Custom,
            url: "https://example.com/easylist.txt".into(),
            enabled: true,
            trusted: false,
        };
        store.add_filter_list(list.clone()).unwrap();
        assert!(store.add_filter_list(list).is_err());
        assert_eq!(store.filter_lists().len(), 1);
    }

    #[test]
    fn toggle_filter_list_flips_enabled_state() {
        let (_dir, path) = temp_path();
        let store = ConfigStore::load(&path).unwrap();
        let list = FilterList {
            name: "EasyList".into(),
            kind: FilterListType::Custom,
            url: "https://example.com/easylist.txt".into(),
            enabled: true,
            trusted: false,
        };
        store.add_filter_list(list).unwrap();
        store
            .toggle_filter_list("https://example.com/easylist.txt", false)
            .unwrap();
        assert!(!store.filter_lists()[0].enabled);
    }

    #[test]
    fn export_debug_data_only_includes_enabled_urls() {
        let (_dir, path) = temp_path();
        let store = ConfigStore::load(&path).unwrap();
        store
            .add_filter_list(FilterList {
                name: "on".into(),
                kind: FilterListType::Custom,
                url: "https://example.com/on.txt".into(),
                enabled: true,
                trusted: false,
            })
            .unwrap();
        store
            .add_filter_list(FilterList {
                name: "off".into(),
                kind: FilterListType::Custom,
                url: "https://example.com/off.txt".into(),
                enabled: false,
                trusted: false,
            })
            .unwrap();
        store.set_my_rules(vec!["example.com##.ad".into()]).unwrap();

        let debug = store.export_debug_data();
        assert_eq!(debug.enabled_filter_list_urls, vec!["https://example.com/on.txt"]);
        assert_eq!(debug.custom_rules, vec!["example.com##.ad"]);
    }
}
