#[cfg(test)]
mod tests {
    use crate::cache::{CacheManager, fingerprint};
    use crate::config::CacheConfig;
    use tempfile::TempDir;

    fn cache_config(dir: &TempDir) -> CacheConfig {
        CacheConfig {
            enabled: true,
            cache_dir: dir.path().to_path_buf(),
            expire_hours: 24,
        }
    }

    #[test]
    fn test_fingerprint_is_order_independent() {
        let a = fingerprint(&[("query", "online scheduling"), ("offset", "0"), ("limit", "20")]);
        let b = fingerprint(&[("limit", "20"), ("query", "online scheduling"), ("offset", "0")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_differs_on_any_parameter() {
        let base = fingerprint(&[("query", "online scheduling"), ("offset", "0")]);
        let other_query = fingerprint(&[("query", "deadline-aware"), ("offset", "0")]);
        let other_offset = fingerprint(&[("query", "online scheduling"), ("offset", "20")]);

        assert_ne!(base, other_query);
        assert_ne!(base, other_offset);
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = fingerprint(&[("model", "m1"), ("prompt", "hello")]);
        let b = fingerprint(&[("model", "m1"), ("prompt", "hello")]);
        assert_eq!(a, b);
        // md5十六进制字符串
        assert_eq!(a.len(), 32);
    }

    #[tokio::test]
    async fn test_set_then_get_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let manager = CacheManager::new(cache_config(&temp_dir));

        let key = fingerprint(&[("query", "online scheduling")]);
        manager
            .set("search", &key, vec!["p1".to_string(), "p2".to_string()])
            .await
            .unwrap();

        let cached: Option<Vec<String>> = manager.get("search", &key).await.unwrap();
        assert_eq!(cached, Some(vec!["p1".to_string(), "p2".to_string()]));
    }

    #[tokio::test]
    async fn test_get_missing_entry() {
        let temp_dir = TempDir::new().unwrap();
        let manager = CacheManager::new(cache_config(&temp_dir));

        let cached: Option<String> = manager.get("search", "no-such-key").await.unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_disabled_cache_never_hits() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = cache_config(&temp_dir);
        config.enabled = false;
        let manager = CacheManager::new(config);

        manager.set("search", "key", "value").await.unwrap();
        let cached: Option<String> = manager.get("search", "key").await.unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_stale_entry_is_miss_but_file_is_kept() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = cache_config(&temp_dir);
        config.expire_hours = 0;
        let manager = CacheManager::new(config);

        manager.set("analysis", "key", 42u32).await.unwrap();
        // 稍等，确保时间戳差超过0小时的过期窗口
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        let cached: Option<u32> = manager.get("analysis", "key").await.unwrap();
        assert!(cached.is_none());
        // 过期条目不会被删除
        assert!(temp_dir.path().join("analysis").join("key.json").exists());
    }

    #[tokio::test]
    async fn test_corrupt_cache_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let manager = CacheManager::new(cache_config(&temp_dir));

        let category_dir = temp_dir.path().join("search");
        std::fs::create_dir_all(&category_dir).unwrap();
        std::fs::write(category_dir.join("broken.json"), "not json at all").unwrap();

        let result: anyhow::Result<Option<String>> = manager.get("search", "broken").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_set_with_model_records_model_name() {
        let temp_dir = TempDir::new().unwrap();
        let manager = CacheManager::new(cache_config(&temp_dir));

        manager
            .set_with_model("analysis", "key", "data", "test-model")
            .await
            .unwrap();

        let content =
            std::fs::read_to_string(temp_dir.path().join("analysis").join("key.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["model_name"], "test-model");
        assert_eq!(value["fingerprint"], "key");
    }
}
