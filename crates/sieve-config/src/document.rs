use serde::{Deserialize, Serialize};

/// The persisted configuration document's shape. Field names follow the
/// JSON vocabulary the document is exchanged in, not Rust conventions —
/// `#[serde(rename_all = "camelCase")]` bridges the two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub filter: FilterConfig,
    pub certmanager: CertManagerConfig,
    pub proxy: ProxyConfig,
    #[serde(rename = "updatePolicy")]
    pub update_policy: UpdatePolicy,
    pub locale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    pub filter_lists: Vec<FilterList>,
    pub my_rules: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertManagerConfig {
    pub ca_installed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    pub port: u16,
    pub ignored_hosts: Vec<String>,
    pub pac_port: u16,
}

/// One entry in `filter.filterLists`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterList {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FilterListType,
    pub url: String,
    pub enabled: bool,
    pub trusted: bool,
}

/// The only filter-list kind this document format carries today; kept
/// as an enum rather than a bare string so a future addition is a
/// non-breaking match arm, not a silent typo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterListType {
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdatePolicy {
    Automatic,
    Prompt,
    Disabled,
}

/// The shape produced by [`crate::ConfigStore::export_debug_data`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugExport {
    pub enabled_filter_list_urls: Vec<String>,
    pub custom_rules: Vec<String>,
    pub platform: String,
    pub architecture: String,
    pub version: String,
}
