use super::*;

// =============================================================================
// MemoryStorage
// =============================================================================

#[tokio::test]
async fn memory_set_get_remove() {
    let storage = MemoryStorage::new();
    assert_eq!(storage.get_item("k").await.unwrap(), None);

    storage.set_item("k", "v1").await.unwrap();
    storage.set_item("k", "v2").await.unwrap();
    assert_eq!(storage.get_item("k").await.unwrap().as_deref(), Some("v2"));

    storage.remove_item("k").await.unwrap();
    assert_eq!(storage.get_item("k").await.unwrap(), None);
}

#[tokio::test]
async fn memory_remove_missing_is_ok() {
    let storage = MemoryStorage::new();
    assert!(storage.remove_item("absent").await.is_ok());
}

// =============================================================================
// FileStorage
// =============================================================================

#[tokio::test]
async fn file_missing_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::new(dir.path().join("session.json"));
    assert_eq!(storage.get_item("k").await.unwrap(), None);
}

#[tokio::test]
async fn file_creates_parent_dirs_and_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("session.json");

    FileStorage::new(&path).set_item("k", "v").await.unwrap();
    FileStorage::new(&path).set_item("other", "w").await.unwrap();

    let reopened = FileStorage::new(&path);
    assert_eq!(reopened.get_item("k").await.unwrap().as_deref(), Some("v"));
    assert_eq!(reopened.get_item("other").await.unwrap().as_deref(), Some("w"));
}

#[tokio::test]
async fn file_remove_keeps_other_keys() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::new(dir.path().join("session.json"));
    storage.set_item("a", "1").await.unwrap();
    storage.set_item("b", "2").await.unwrap();

    storage.remove_item("a").await.unwrap();
    assert_eq!(storage.get_item("a").await.unwrap(), None);
    assert_eq!(storage.get_item("b").await.unwrap().as_deref(), Some("2"));
}

#[tokio::test]
async fn file_corrupt_contents_is_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, b"{not json").unwrap();

    let err = FileStorage::new(&path).get_item("k").await.unwrap_err();
    assert!(matches!(err, ProviderError::Storage(_)));
}
