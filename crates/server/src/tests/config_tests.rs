use super::{apply_file_settings, normalize_database_url, prepare_database_url, Settings};

use std::{collections::HashMap, path::PathBuf};

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
}

#[test]
fn empty_database_url_falls_back_to_default() {
    assert_eq!(
        normalize_database_url("   "),
        Settings::default().database_url
    );
}

#[test]
fn keeps_memory_and_foreign_urls_untouched() {
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(
        normalize_database_url("postgres://db/portfolio"),
        "postgres://db/portfolio"
    );
}

#[test]
fn keeps_windows_absolute_path_with_single_sqlite_colon() {
    assert_eq!(
        normalize_database_url("sqlite:C:\\Users\\alice\\portfolio.db"),
        "sqlite:C:/Users/alice/portfolio.db"
    );
}

#[test]
fn converts_sqlite_double_slash_windows_path() {
    assert_eq!(
        normalize_database_url("sqlite://C:/Users/alice/portfolio.db"),
        "sqlite:C:/Users/alice/portfolio.db"
    );
}

#[test]
fn creates_parent_dir_for_sqlite_file() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("data").join("test.db");

    prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare db url");
    assert!(temp_root.path().join("data").exists());
}

#[test]
fn file_settings_override_defaults() {
    let raw = r#"
        bind_addr = "0.0.0.0:9000"
        upload_dir = "/srv/uploads"
        token_ttl_minutes = 30
        max_upload_bytes = 1024
    "#;
    let file_cfg: HashMap<String, toml::Value> = toml::from_str(raw).expect("toml");
    let mut settings = Settings::default();
    apply_file_settings(&mut settings, &file_cfg);

    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(settings.upload_dir, PathBuf::from("/srv/uploads"));
    assert_eq!(settings.token_ttl_minutes, 30);
    assert_eq!(settings.max_upload_bytes, 1024);
    assert_eq!(settings.database_url, Settings::default().database_url);
}

#[tokio::test]
async fn prepared_database_url_creates_openable_sqlite_file() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("server.db");

    let prepared = prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare");
    let storage = storage::Storage::new(&prepared).await.expect("open sqlite");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should be created: {}",
        db_path.display()
    );
}
