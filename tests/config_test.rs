//! Integration tests for persisted settings.

use pagewipe::config::{KEY_FOOTER_TEXT, KEY_PAGE_NUMBER_START, KEY_PROCESS_START_PAGE, KEY_REGIONS};
use pagewipe::{
    default_region_set, set_dimension, set_enabled, AppConfig, ConfigStore, DimensionField,
    FileStore, FooterAnnotation, KeyValueStore, MemoryStore, PaginationConfig, ProcessRequest,
    RegionKind,
};

#[test]
fn test_corrupt_key_does_not_affect_others() {
    let store = MemoryStore::new();
    store.set(KEY_REGIONS, "{not json").unwrap();
    store.set(KEY_PROCESS_START_PAGE, "3").unwrap();
    store.set(KEY_PAGE_NUMBER_START, "zero").unwrap();
    store.set(KEY_FOOTER_TEXT, "Confidential").unwrap();

    let config = ConfigStore::new(store).load_config();
    assert_eq!(config.regions, default_region_set());
    assert_eq!(config.pagination, PaginationConfig::new(3, 1));
    assert_eq!(config.footer_text.as_str(), "Confidential");
}

#[test]
fn test_zero_page_falls_back() {
    let store = MemoryStore::new();
    store.set(KEY_PROCESS_START_PAGE, "0").unwrap();
    store.set(KEY_PAGE_NUMBER_START, " 4 ").unwrap();
    let config = ConfigStore::new(store).load_config();
    assert_eq!(config.pagination, PaginationConfig::new(1, 4));
}

#[test]
fn test_partial_regions_keep_defaults() {
    let store = MemoryStore::new();
    store
        .set(
            KEY_REGIONS,
            r#"{"headerLeft":{"enabled":true,"width":120,"height":80},"footerRight":"bogus"}"#,
        )
        .unwrap();
    let regions = ConfigStore::new(store).load_config().regions;

    let header_left = regions.get(RegionKind::HeaderLeft);
    assert!(header_left.enabled);
    assert_eq!(header_left.width(), Some(120.0));
    assert_eq!(header_left.height(), 80.0);
    assert_eq!(regions.get(RegionKind::FooterRight), default_region_set().get(RegionKind::FooterRight));
    assert!(regions.is_enabled(RegionKind::FooterFull));
}

#[test]
fn test_stale_geometry_is_reset() {
    let store = MemoryStore::new();
    store
        .set(KEY_REGIONS, r#"{"footerFull":{"enabled":false,"height":5}}"#)
        .unwrap();
    let regions = ConfigStore::new(store).load_config().regions;
    let footer = regions.get(RegionKind::FooterFull);
    assert!(!footer.enabled);
    assert_eq!(footer.height(), 50.0);
}

#[test]
fn test_overlong_footer_text_truncated_on_load() {
    let store = MemoryStore::new();
    store.set(KEY_FOOTER_TEXT, &"x".repeat(150)).unwrap();
    let config = ConfigStore::new(store).load_config();
    assert_eq!(
        config.footer_text.as_str().chars().count(),
        FooterAnnotation::MAX_CHARS
    );
}

#[test]
fn test_file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let regions = set_enabled(&default_region_set(), RegionKind::HeaderRight, true);
    let regions =
        set_dimension(&regions, RegionKind::HeaderRight, DimensionField::Width, 150.0).unwrap();

    {
        let config = ConfigStore::new(FileStore::in_dir(dir.path().join("nested")));
        config.save_regions(&regions);
        config.save_pagination(&PaginationConfig::new(2, 3));
        config.save_footer_text(&FooterAnnotation::new("Draft").unwrap());
    }

    let reopened = ConfigStore::new(FileStore::in_dir(dir.path().join("nested")));
    let loaded = reopened.load_config();
    assert_eq!(loaded.regions, regions);
    assert_eq!(loaded.pagination, PaginationConfig::new(2, 3));
    assert_eq!(loaded.footer_text.as_str(), "Draft");

    let request = ProcessRequest::from_config(&loaded);
    assert_eq!(request.process_start_page, 2);
    assert_eq!(request.page_number_start, 3);
    assert!(request.regions.is_enabled(RegionKind::HeaderRight));
}

#[test]
fn test_corrupt_settings_file_falls_back_and_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::in_dir(dir.path());
    std::fs::write(store.path(), "garbage").unwrap();

    let config = ConfigStore::new(store);
    assert_eq!(config.load_config(), AppConfig::default());

    config.save_pagination(&PaginationConfig::new(5, 5));
    assert_eq!(config.load_config().pagination, PaginationConfig::new(5, 5));
}

#[test]
fn test_reset_overwrites_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConfigStore::new(FileStore::in_dir(dir.path()));
    config.save_footer_text(&FooterAnnotation::new("Old").unwrap());
    config.reset();

    let reopened = ConfigStore::new(FileStore::in_dir(dir.path()));
    assert_eq!(reopened.load_config(), AppConfig::default());
}
