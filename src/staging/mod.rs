use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// 阶段快照的作用域常量
pub struct StageScope;

impl StageScope {
    pub const COLLECT: &'static str = "collect";
    pub const ANALYZE: &'static str = "analyze";
    pub const RUN: &'static str = "run";
}

/// 固定的快照键
pub struct SnapshotKeys;

impl SnapshotKeys {
    pub const ANALYZED: &'static str = "analyzed";
    pub const TOP_PAPERS: &'static str = "top_papers";
    pub const RUN_SUMMARY: &'static str = "run_summary";
}

/// 阶段间数据交接的持久化存储。
/// 每个阶段把自己的产出写成自描述的JSON快照，
/// 下游阶段只依赖快照文件本身，不要求上游进程仍在运行
#[derive(Debug)]
pub struct StagingStore {
    root: PathBuf,
}

impl StagingStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn snapshot_path(&self, stage: &str, key: &str) -> PathBuf {
        self.root.join(stage).join(format!("{}.json", key))
    }

    /// 写入快照
    pub async fn write_snapshot<T>(&self, stage: &str, key: &str, data: &T) -> Result<()>
    where
        T: Serialize,
    {
        let path = self.snapshot_path(stage, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context(format!("无法创建快照目录: {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(data).context("快照序列化失败")?;
        fs::write(&path, content)
            .await
            .context(format!("无法写入快照文件: {:?}", path))?;
        Ok(())
    }

    /// 读取快照。快照不存在时返回None；
    /// 文件存在但无法解析说明交接数据已损坏，直接报错
    pub async fn read_snapshot<T>(&self, stage: &str, key: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let path = self.snapshot_path(stage, key);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .context(format!("无法读取快照文件: {:?}", path))?;
        let data = serde_json::from_str(&content)
            .context(format!("快照文件已损坏: {:?}", path))?;
        Ok(Some(data))
    }

    /// 检查快照是否存在
    pub fn has_snapshot(&self, stage: &str, key: &str) -> bool {
        self.snapshot_path(stage, key).exists()
    }

    /// 列出某个阶段的所有快照键，按字典序排序以保证遍历顺序确定
    pub fn list_keys(&self, stage: &str) -> Result<Vec<String>> {
        let stage_dir = self.root.join(stage);
        if !stage_dir.exists() {
            return Ok(vec![]);
        }

        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&stage_dir)
            .context(format!("无法读取快照目录: {:?}", stage_dir))?
        {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().to_string();
            if let Some(key) = file_name.strip_suffix(".json") {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// 清空某个阶段的所有快照（用于强制重新执行）
    pub async fn clear_stage(&self, stage: &str) -> Result<()> {
        let stage_dir = self.root.join(stage);
        if stage_dir.exists() {
            fs::remove_dir_all(&stage_dir)
                .await
                .context(format!("无法清空快照目录: {:?}", stage_dir))?;
        }
        Ok(())
    }
}
