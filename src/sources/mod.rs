//! 文献检索源 - 对外部检索服务的统一访问接口

use async_trait::async_trait;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::cache::{CacheManager, fingerprint};
use crate::config::SearchConfig;
use crate::types::paper::PaperRecord;

pub mod arxiv;
pub mod semantic_scholar;

pub use arxiv::ArxivSource;
pub use semantic_scholar::SemanticScholarSource;

/// 检索服务错误分类
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("请求超时")]
    Timeout,

    #[error("服务端错误: HTTP {0}")]
    Server(u16),

    #[error("请求频率受限")]
    RateLimited,

    #[error("认证失败: HTTP {0}")]
    Auth(u16),

    #[error("请求被拒绝: HTTP {0}")]
    Rejected(u16),

    #[error("响应解析失败: {0}")]
    MalformedResponse(String),

    #[error("本地缓存错误: {0}")]
    Cache(String),

    #[error("网络错误: {0}")]
    Network(#[from] reqwest::Error),
}

impl SourceError {
    /// 由HTTP状态码归类错误
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => SourceError::RateLimited,
            401 | 403 => SourceError::Auth(status),
            500..=599 => SourceError::Server(status),
            _ => SourceError::Rejected(status),
        }
    }

    /// 瞬时错误可以重试，非瞬时错误重试没有意义
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Timeout | SourceError::Server(_) | SourceError::RateLimited => true,
            SourceError::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// 环境级错误需要终止整个运行，而不是降级为空结果
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::Cache(_))
    }
}

/// 按每分钟请求预算限制出站请求的最小间隔
pub struct RateLimiter {
    min_interval: Duration,
    last_request: tokio::sync::Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            min_interval: Duration::from_millis(60_000 / u64::from(requests_per_minute.max(1))),
            last_request: tokio::sync::Mutex::new(None),
        }
    }

    /// 等待直到允许发出下一个请求
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// 指数退避间隔：基础间隔按尝试次数翻倍，叠加随机抖动避免请求齐步
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let exponential = base_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(6));
    let jitter = rand::rng().random_range(0..=base_ms.max(2) / 2);
    Duration::from_millis(exponential + jitter)
}

/// 通用重试逻辑。只重试瞬时错误，重试耗尽后把最后的错误交还给调用方
pub async fn fetch_with_retry<T, F, Fut>(
    config: &SearchConfig,
    log_tag: &str,
    operation: F,
) -> Result<T, SourceError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let max_retries = config.retry_attempts;
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                attempts += 1;
                if !err.is_transient() || attempts >= max_retries {
                    return Err(err);
                }
                eprintln!(
                    "❌ 检索请求出错 [{}]，重试中 (第 {} / {} 次尝试): {}",
                    log_tag, attempts, max_retries, err
                );
                tokio::time::sleep(backoff_delay(config.retry_base_delay_ms, attempts)).await;
            }
        }
    }
}

/// 统一的检索源接口。fetch_page返回原始响应载荷（用于缓存），
/// parse_page把载荷规范化为论文记录，对缺失字段保持宽容
#[async_trait]
pub trait SearchSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_page(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<String, SourceError>;

    fn parse_page(&self, payload: &str, area: &str) -> Result<Vec<PaperRecord>, SourceError>;
}

/// 对单个检索源执行带缓存的分页检索。
/// 每一页请求先查缓存，未命中时经由重试逻辑发出网络请求并回填缓存，
/// 直到取满want篇或某一页返回空为止
pub async fn search_papers(
    source: &dyn SearchSource,
    cache: &CacheManager,
    config: &SearchConfig,
    query: &str,
    area: &str,
    want: usize,
) -> Result<Vec<PaperRecord>, SourceError> {
    let mut papers: Vec<PaperRecord> = Vec::new();
    let mut offset = 0usize;

    while papers.len() < want {
        let limit = config.page_size.min(want - papers.len()).max(1);
        let cache_key = fingerprint(&[
            ("source", source.name()),
            ("query", query),
            ("offset", &offset.to_string()),
            ("limit", &limit.to_string()),
        ]);

        let cached: Option<String> = cache
            .get("search", &cache_key)
            .await
            .map_err(|e| SourceError::Cache(e.to_string()))?;

        let payload = match cached {
            Some(payload) => payload,
            None => {
                let log_tag = format!("{}:{}", source.name(), query);
                let payload = fetch_with_retry(config, &log_tag, || {
                    source.fetch_page(query, offset, limit)
                })
                .await?;
                cache
                    .set("search", &cache_key, &payload)
                    .await
                    .map_err(|e| SourceError::Cache(e.to_string()))?;
                payload
            }
        };

        let page = source.parse_page(&payload, area)?;
        if page.is_empty() {
            break;
        }
        offset += page.len();
        papers.extend(page);
    }

    papers.truncate(want);
    Ok(papers)
}

// Include tests
#[cfg(test)]
mod tests;
