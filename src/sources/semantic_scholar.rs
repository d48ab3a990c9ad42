use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::config::SearchConfig;
use crate::sources::{RateLimiter, SearchSource, SourceError};
use crate::types::paper::{PaperRecord, SourceTag};

/// 检索请求携带的字段集合
const SEARCH_FIELDS: &str = "paperId,title,abstract,year,authors,venue,citationCount,references";

/// Semantic Scholar Graph API 检索源
pub struct SemanticScholarSource {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    limiter: RateLimiter,
}

impl SemanticScholarSource {
    pub fn new(config: &SearchConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            api_base: config.semantic_scholar_api_base.clone(),
            api_key: config.semantic_scholar_api_key.clone(),
            limiter: RateLimiter::new(config.requests_per_minute),
        })
    }
}

#[async_trait]
impl SearchSource for SemanticScholarSource {
    fn name(&self) -> &'static str {
        "semantic_scholar"
    }

    async fn fetch_page(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<String, SourceError> {
        self.limiter.acquire().await;

        let url = format!("{}/paper/search", self.api_base);
        let mut request = self.client.get(&url).query(&[
            ("query", query),
            ("offset", &offset.to_string()),
            ("limit", &limit.to_string()),
            ("fields", SEARCH_FIELDS),
        ]);
        if let Some(ref key) = self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout
            } else {
                SourceError::from(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::from_status(status.as_u16()));
        }

        response.text().await.map_err(SourceError::from)
    }

    fn parse_page(&self, payload: &str, area: &str) -> Result<Vec<PaperRecord>, SourceError> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| SourceError::MalformedResponse(e.to_string()))?;

        let mut papers = Vec::new();
        let Some(items) = value.get("data").and_then(Value::as_array) else {
            return Ok(papers);
        };

        for item in items {
            let title = text_field(item, "title");
            let abstract_text = text_field(item, "abstract");
            let year = item.get("year").and_then(Value::as_i64).map(|y| y as i32);

            let id = match item.get("paperId").and_then(Value::as_str) {
                Some(paper_id) if !paper_id.trim().is_empty() => paper_id.trim().to_string(),
                _ => PaperRecord::derived_id(&title, year),
            };

            let authors = item
                .get("authors")
                .and_then(Value::as_array)
                .map(|list| {
                    list.iter()
                        .filter_map(|author| author.get("name").and_then(Value::as_str))
                        .map(|name| name.to_string())
                        .collect()
                })
                .unwrap_or_default();

            let references = item
                .get("references")
                .and_then(Value::as_array)
                .map(|list| {
                    list.iter()
                        .filter_map(|reference| reference.get("paperId").and_then(Value::as_str))
                        .map(|paper_id| paper_id.to_string())
                        .collect()
                })
                .unwrap_or_default();

            papers.push(PaperRecord {
                id,
                title,
                abstract_text,
                authors,
                year,
                venue: text_field(item, "venue"),
                citation_count: item
                    .get("citationCount")
                    .and_then(Value::as_u64)
                    .unwrap_or(0) as u32,
                references,
                source: SourceTag::SemanticScholar,
                area: area.to_string(),
            });
        }

        Ok(papers)
    }
}

/// 宽容地取出字符串字段，缺失时回落为空串
fn text_field(item: &Value, key: &str) -> String {
    item.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}
