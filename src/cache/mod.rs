use anyhow::{Context, Result};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;

use crate::config::CacheConfig;

/// 计算请求指纹。参数按key=value排序后哈希，
/// 因此语义相同的请求无论参数书写顺序如何都会命中同一条缓存
pub fn fingerprint(params: &[(&str, &str)]) -> String {
    let mut pairs: Vec<String> = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();
    pairs.sort();

    let mut hasher = Md5::new();
    hasher.update(pairs.join("\n").as_bytes());
    format!("{:x}", hasher.finalize())
}

/// LLM请求的指纹：提示词、模型与采样参数共同决定一条缓存
pub fn llm_fingerprint(
    system_prompt: &str,
    user_prompt: &str,
    model: &str,
    temperature: f64,
) -> String {
    fingerprint(&[
        ("system", system_prompt),
        ("prompt", user_prompt),
        ("model", model),
        ("temperature", &temperature.to_string()),
    ])
}

/// 缓存管理器
pub struct CacheManager {
    config: CacheConfig,
}

/// 缓存条目
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: u64,
    /// 请求参数的指纹，用于缓存键的生成和验证
    pub fingerprint: String,
    /// 使用的模型名称（可选）
    pub model_name: Option<String>,
}

impl CacheManager {
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    /// 获取缓存文件路径
    fn get_cache_path(&self, category: &str, key: &str) -> PathBuf {
        self.config
            .cache_dir
            .join(category)
            .join(format!("{}.json", key))
    }

    /// 检查缓存是否过期。过期条目按未命中处理，文件保留在原处，
    /// 由外部按时间清理
    fn is_stale(&self, timestamp: u64) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let expire_seconds = self.config.expire_hours * 3600;
        now.saturating_sub(timestamp) > expire_seconds
    }

    /// 获取缓存。条目不存在或已过期时返回None；
    /// 文件存在但无法读取或解析说明缓存目录已损坏，直接报错
    pub async fn get<T>(&self, category: &str, key: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        if !self.config.enabled {
            return Ok(None);
        }

        let cache_path = self.get_cache_path(category, key);

        if !cache_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&cache_path)
            .await
            .context(format!("无法读取缓存文件: {:?}", cache_path))?;
        let entry: CacheEntry<T> = serde_json::from_str(&content)
            .context(format!("缓存文件已损坏: {:?}", cache_path))?;

        if self.is_stale(entry.timestamp) {
            return Ok(None);
        }

        Ok(Some(entry.data))
    }

    /// 设置缓存
    pub async fn set<T>(&self, category: &str, key: &str, data: T) -> Result<()>
    where
        T: Serialize,
    {
        self.write_entry(category, key, data, None).await
    }

    /// 设置缓存（记录产生数据的模型名称）
    pub async fn set_with_model<T>(
        &self,
        category: &str,
        key: &str,
        data: T,
        model_name: &str,
    ) -> Result<()>
    where
        T: Serialize,
    {
        self.write_entry(category, key, data, Some(model_name.to_string()))
            .await
    }

    async fn write_entry<T>(
        &self,
        category: &str,
        key: &str,
        data: T,
        model_name: Option<String>,
    ) -> Result<()>
    where
        T: Serialize,
    {
        if !self.config.enabled {
            return Ok(());
        }

        let cache_path = self.get_cache_path(category, key);

        // 确保目录存在
        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context(format!("无法创建缓存目录: {:?}", parent))?;
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        let entry = CacheEntry {
            data,
            timestamp,
            fingerprint: key.to_string(),
            model_name,
        };

        let content = serde_json::to_string_pretty(&entry).context("缓存条目序列化失败")?;
        fs::write(&cache_path, content)
            .await
            .context(format!("无法写入缓存文件: {:?}", cache_path))?;
        Ok(())
    }
}

// Include tests
#[cfg(test)]
mod tests;
