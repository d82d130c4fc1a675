//! Persisted redaction settings.
//!
//! The region set, the two pagination offsets and the footer text live
//! under independent keys. Each key is read and written on its own, so one
//! corrupt value never invalidates the others; anything missing or
//! unreadable falls back to its default. Write failures are logged and
//! swallowed.

mod store;

pub use store::{FileStore, KeyValueStore, MemoryStore, APP_DIR_NAME};

use serde::Serialize;

use crate::model::{FooterAnnotation, PaginationConfig, RegionSet};

/// Region set as JSON.
pub const KEY_REGIONS: &str = "pdf_remove_areas";
/// First processed page, decimal.
pub const KEY_PROCESS_START_PAGE: &str = "pdf_process_start_page";
/// Page that is labelled "page 1", decimal.
pub const KEY_PAGE_NUMBER_START: &str = "pdf_page_number_start";
/// Footer annotation, raw text.
pub const KEY_FOOTER_TEXT: &str = "pdf_custom_text";

/// Everything the redaction tool remembers between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub regions: RegionSet,
    pub pagination: PaginationConfig,
    pub footer_text: FooterAnnotation,
}

/// Typed access to settings in a [`KeyValueStore`].
#[derive(Debug)]
pub struct ConfigStore<S> {
    store: S,
}

impl<S: KeyValueStore> ConfigStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load all settings, defaulting each key independently.
    pub fn load_config(&self) -> AppConfig {
        let defaults = PaginationConfig::default();
        AppConfig {
            regions: self.load_regions(),
            pagination: PaginationConfig {
                process_start_page: self
                    .load_page(KEY_PROCESS_START_PAGE)
                    .unwrap_or(defaults.process_start_page),
                page_number_start: self
                    .load_page(KEY_PAGE_NUMBER_START)
                    .unwrap_or(defaults.page_number_start),
            },
            footer_text: self
                .read(KEY_FOOTER_TEXT)
                .map(|text| FooterAnnotation::truncated(&text))
                .unwrap_or_default(),
        }
    }

    pub fn save_regions(&self, regions: &RegionSet) {
        match serde_json::to_string(regions) {
            Ok(json) => self.write(KEY_REGIONS, &json),
            Err(e) => log::warn!("Failed to encode regions: {}", e),
        }
    }

    pub fn save_pagination(&self, pagination: &PaginationConfig) {
        self.write(
            KEY_PROCESS_START_PAGE,
            &pagination.process_start_page.to_string(),
        );
        self.write(
            KEY_PAGE_NUMBER_START,
            &pagination.page_number_start.to_string(),
        );
    }

    pub fn save_footer_text(&self, text: &FooterAnnotation) {
        self.write(KEY_FOOTER_TEXT, text.as_str());
    }

    /// Overwrite every key with its default and return the defaults.
    pub fn reset(&self) -> AppConfig {
        let config = AppConfig::default();
        self.save_regions(&config.regions);
        self.save_pagination(&config.pagination);
        self.save_footer_text(&config.footer_text);
        config
    }

    fn load_regions(&self) -> RegionSet {
        let Some(json) = self.read(KEY_REGIONS) else {
            return RegionSet::default();
        };
        match serde_json::from_str::<RegionSet>(&json) {
            Ok(regions) => regions.sanitized(),
            Err(e) => {
                log::warn!("Ignoring malformed {}: {}", KEY_REGIONS, e);
                RegionSet::default()
            }
        }
    }

    fn load_page(&self, key: &str) -> Option<u32> {
        let raw = self.read(key)?;
        match raw.trim().parse::<u32>() {
            Ok(page) if page >= 1 => Some(page),
            _ => {
                log::warn!("Ignoring invalid {} value {:?}", key, raw);
                None
            }
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        self.store.get(key).unwrap_or_else(|e| {
            log::warn!("Failed to read {}: {}", key, e);
            None
        })
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            log::warn!("Failed to save {}: {}", key, e);
        }
    }
}
