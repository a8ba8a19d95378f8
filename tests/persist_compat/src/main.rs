fn main() {
    println!("Run `cargo test -p persist-compat` to execute manifest persistence tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::future::Future;
    use std::path::PathBuf;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};

    use sharelift_client::{ContentRange, RangeStatus};
    use sharelift_engine::{StorageClient, UploadEngine, UploadError};
    use sharelift_transfer::{LocalFile, MemoryStore, UploadFile, UploadManifest};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Deserializes a fixture into a manifest, re-serializes it, and
    /// compares the JSON values (order-independent comparison). This is
    /// the compatibility contract: field names are stable across versions
    /// and no state is lost on the way through.
    fn roundtrip(name: &str) -> UploadManifest {
        let fixture = load_fixture(name);
        let manifest = UploadManifest::from_json(&fixture.to_string())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized: serde_json::Value =
            serde_json::from_str(&manifest.to_json().unwrap()).unwrap();

        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  ours:    {reserialized}"
        );
        manifest
    }

    #[test]
    fn fixture_in_progress_roundtrip() {
        let manifest = roundtrip("manifest_in_progress.json");

        assert_eq!(manifest.name(), "vacation-photos");
        assert_eq!(manifest.file_count(), 5);
        assert_eq!(manifest.next_file_index(), 2);
        assert_eq!(manifest.transferred_bytes(), 4_194_304);
        assert!(!manifest.is_complete());
        assert!(manifest.completed_at().is_none());
        assert!(manifest.share_url().is_empty());
        assert!(manifest.active_session_url().is_empty());
    }

    #[test]
    fn fixture_completed_roundtrip() {
        let manifest = roundtrip("manifest_completed.json");

        assert!(manifest.is_complete());
        assert_eq!(manifest.transferred_bytes(), manifest.total_bytes());
        assert!(manifest.completed_at().is_some());
        assert_eq!(manifest.share_url(), "https://1drv.example/s!AbCdEf");
    }

    #[test]
    fn fixtures_respect_invariants() {
        for name in ["manifest_in_progress.json", "manifest_completed.json"] {
            let manifest =
                UploadManifest::from_json(&load_fixture(name).to_string()).unwrap();
            assert!(manifest.transferred_bytes() <= manifest.total_bytes(), "{name}");
            assert_eq!(
                manifest.is_complete(),
                manifest.next_file_index() == manifest.file_count() as usize,
                "{name}"
            );
            assert_eq!(
                manifest.transferred_bytes() == manifest.total_bytes(),
                manifest.is_complete(),
                "{name}"
            );
        }
    }

    // --- Resume-across-serialization scenario ---

    /// Minimal storage mock: final ranges complete the item, earlier ones
    /// are accepted, and a single put index can be scripted to fail.
    #[derive(Default)]
    struct MockStorage {
        sessions: Mutex<Vec<String>>,
        links: Mutex<Vec<String>>,
        fail_put_at: Mutex<Option<usize>>,
        put_count: Mutex<usize>,
    }

    impl StorageClient for MockStorage {
        fn ensure_folder<'a>(
            &'a self,
            _path: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<bool, UploadError>> + Send + 'a>> {
            Box::pin(async move { Ok(true) })
        }

        fn create_session<'a>(
            &'a self,
            item_path: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<String, UploadError>> + Send + 'a>> {
            Box::pin(async move {
                let mut sessions = self.sessions.lock().unwrap();
                sessions.push(item_path.to_string());
                Ok(format!("https://up.example/session/{}", sessions.len()))
            })
        }

        fn put_range<'a>(
            &'a self,
            _upload_url: &'a str,
            range: ContentRange,
            _data: Vec<u8>,
        ) -> Pin<Box<dyn Future<Output = Result<RangeStatus, UploadError>> + Send + 'a>> {
            Box::pin(async move {
                let n = {
                    let mut count = self.put_count.lock().unwrap();
                    let n = *count;
                    *count += 1;
                    n
                };
                if *self.fail_put_at.lock().unwrap() == Some(n) {
                    return Err(UploadError::Remote {
                        status: 500,
                        detail: "injected failure".into(),
                    });
                }
                Ok(if range.is_final() {
                    RangeStatus::Complete
                } else {
                    RangeStatus::Accepted
                })
            })
        }

        fn delete_session<'a>(
            &'a self,
            _upload_url: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<(), UploadError>> + Send + 'a>> {
            Box::pin(async move { Ok(()) })
        }

        fn create_share_link<'a>(
            &'a self,
            item_path: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<String, UploadError>> + Send + 'a>> {
            Box::pin(async move {
                self.links.lock().unwrap().push(item_path.to_string());
                Ok("https://1drv.example/s!resumed".into())
            })
        }
    }

    #[tokio::test]
    async fn serialized_mid_upload_manifest_resumes_to_the_same_end_state() {
        let dir = tempfile::tempdir().unwrap();
        let names = ["a.bin", "b.bin", "c.bin", "d.bin", "e.bin"];
        let files: Vec<Arc<dyn UploadFile>> = names
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                std::fs::write(&path, vec![b'x'; 10]).unwrap();
                Arc::new(LocalFile::new(&path)) as Arc<dyn UploadFile>
            })
            .collect();

        let store = Arc::new(MemoryStore::new());
        let mut manifest = UploadManifest::create("resume", &files, store.as_ref()).unwrap();

        let mock = Arc::new(MockStorage::default());
        // Each 10-byte file takes 3 puts at a 4-byte chunk size; put 6 is
        // the first chunk of the third file.
        *mock.fail_put_at.lock().unwrap() = Some(6);

        let engine =
            UploadEngine::new(mock.clone(), store.clone()).with_chunk_size(4);
        let err = engine.run("Shared/resume", &mut manifest).await.unwrap_err();
        assert!(matches!(err, UploadError::Remote { .. }));
        assert_eq!(manifest.next_file_index(), 2);
        assert_eq!(manifest.transferred_bytes(), 20);

        // Persist mid-upload, as a caller would before shutting down.
        let snapshot = manifest.to_json().unwrap();
        drop(manifest);

        let mut restored = UploadManifest::from_json(&snapshot).unwrap();
        assert_eq!(restored.next_file_index(), 2);
        assert_eq!(restored.transferred_bytes(), 20);

        *mock.fail_put_at.lock().unwrap() = None;
        let sessions_before_resume = mock.sessions.lock().unwrap().len();

        engine.run("Shared/resume", &mut restored).await.unwrap();

        assert!(restored.is_complete());
        assert_eq!(restored.transferred_bytes(), 50);
        assert_eq!(restored.share_url(), "https://1drv.example/s!resumed");

        // Exactly the three unfinished files were uploaded on resume.
        let sessions = mock.sessions.lock().unwrap();
        assert_eq!(
            sessions[sessions_before_resume..],
            [
                "Shared/resume/c.bin".to_string(),
                "Shared/resume/d.bin".to_string(),
                "Shared/resume/e.bin".to_string(),
            ]
        );
        assert_eq!(*mock.links.lock().unwrap(), vec!["Shared/resume"]);
    }
}
