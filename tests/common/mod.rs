use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use supportchat::api::fake::FakeChatApi;
use supportchat::storage::LocalStore;

#[allow(dead_code)]
pub fn create_temp_store() -> (LocalStore, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("store.db");
    let store = LocalStore::new_with_path(db_path).expect("failed to create local store with path");
    (store, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

#[allow(dead_code)]
pub fn fake_api() -> Arc<FakeChatApi> {
    Arc::new(FakeChatApi::new())
}
