#[cfg(test)]
mod tests {
    use crate::config::{Config, ResearchAreaConfig};
    use crate::pipeline::context::PipelineContext;
    use crate::pipeline::workflow::launch;
    use crate::staging::{SnapshotKeys, StageScope};
    use tempfile::TempDir;

    fn create_test_config(temp_dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.research_areas = vec![ResearchAreaConfig {
            name: "Dynamic Scheduling".to_string(),
            keywords: vec!["online scheduling".to_string()],
            target_count: 5,
        }];
        config.output_path = temp_dir.path().join("output");
        config.internal_path = temp_dir.path().join(".paperscope");
        config.cache.cache_dir = temp_dir.path().join(".paperscope").join("cache");
        config
    }

    fn create_test_context(temp_dir: &TempDir) -> PipelineContext {
        PipelineContext::new(create_test_config(temp_dir)).unwrap()
    }

    #[tokio::test]
    async fn test_launch_with_all_stages_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = create_test_config(&temp_dir);
        config.skip_collect = true;
        config.skip_analysis = true;
        config.skip_report = true;

        let result = launch(&config).await;
        assert!(result.is_ok());

        // 运行汇总快照总是会写出
        let context = PipelineContext::new(config).unwrap();
        assert!(
            context
                .has_snapshot(StageScope::RUN, SnapshotKeys::RUN_SUMMARY)
                .await
        );
    }

    #[tokio::test]
    async fn test_launch_rejects_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = create_test_config(&temp_dir);
        config.research_areas.clear();

        let result = launch(&config).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_pipeline_context_creation() {
        let temp_dir = TempDir::new().unwrap();
        let _context = create_test_context(&temp_dir);
    }

    #[tokio::test]
    async fn test_pipeline_context_snapshot_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let context = create_test_context(&temp_dir);

        assert!(!context.has_snapshot("collect", "dynamic-scheduling").await);
        context
            .write_snapshot("collect", "dynamic-scheduling", &vec![1, 2, 3])
            .await
            .unwrap();
        assert!(context.has_snapshot("collect", "dynamic-scheduling").await);

        let loaded: Option<Vec<i32>> = context
            .read_snapshot("collect", "dynamic-scheduling")
            .await
            .unwrap();
        assert_eq!(loaded, Some(vec![1, 2, 3]));

        let keys = context.list_snapshot_keys("collect").await.unwrap();
        assert_eq!(keys, vec!["dynamic-scheduling"]);
    }

    #[test]
    fn test_pipeline_context_survey_name() {
        let temp_dir = TempDir::new().unwrap();
        let context = create_test_context(&temp_dir);

        assert_eq!(context.config.get_survey_name(), "Dynamic Scheduling");
    }
}
