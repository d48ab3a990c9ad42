use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    cache::CacheManager, config::Config, llm::client::LLMClient, staging::StagingStore,
    types::summary::RunSummary,
};

/// 流水线上下文，贯穿三个阶段的共享资源
#[derive(Clone)]
pub struct PipelineContext {
    /// LLM调用器，用于与AI通信。
    pub llm_client: LLMClient,
    /// 配置
    pub config: Config,
    /// 缓存管理器
    pub cache_manager: Arc<RwLock<CacheManager>>,
    /// 阶段快照存储
    pub staging: Arc<RwLock<StagingStore>>,
    /// 运行统计累加器
    pub run_summary: Arc<RwLock<RunSummary>>,
}

impl PipelineContext {
    /// 创建新的流水线上下文
    pub fn new(config: Config) -> Result<Self> {
        let llm_client = LLMClient::new(config.clone())?;
        let cache_manager = Arc::new(RwLock::new(CacheManager::new(config.cache.clone())));
        let staging = Arc::new(RwLock::new(StagingStore::new(config.staging_dir())));
        let run_summary = Arc::new(RwLock::new(RunSummary::new(&config.get_survey_name())));

        Ok(Self {
            llm_client,
            config,
            cache_manager,
            staging,
            run_summary,
        })
    }

    /// 写入阶段快照
    pub async fn write_snapshot<T>(&self, stage: &str, key: &str, data: &T) -> Result<()>
    where
        T: Serialize + Send + Sync,
    {
        let staging = self.staging.read().await;
        staging.write_snapshot(stage, key, data).await
    }

    /// 读取阶段快照
    pub async fn read_snapshot<T>(&self, stage: &str, key: &str) -> Result<Option<T>>
    where
        T: for<'a> Deserialize<'a> + Send + Sync,
    {
        let staging = self.staging.read().await;
        staging.read_snapshot(stage, key).await
    }

    /// 检查阶段快照是否存在
    pub async fn has_snapshot(&self, stage: &str, key: &str) -> bool {
        let staging = self.staging.read().await;
        staging.has_snapshot(stage, key)
    }

    /// 列出某个阶段的所有快照键
    pub async fn list_snapshot_keys(&self, stage: &str) -> Result<Vec<String>> {
        let staging = self.staging.read().await;
        staging.list_keys(stage)
    }
}
