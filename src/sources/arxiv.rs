use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;

use crate::config::SearchConfig;
use crate::sources::{RateLimiter, SearchSource, SourceError};
use crate::types::paper::{PaperRecord, SourceTag};

static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<entry>(.*?)</entry>").unwrap());
static ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<id>\s*(.*?)\s*</id>").unwrap());
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title[^>]*>(.*?)</title>").unwrap());
static SUMMARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<summary[^>]*>(.*?)</summary>").unwrap());
static PUBLISHED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<published>\s*(\d{4})").unwrap());
static AUTHOR_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<name>\s*(.*?)\s*</name>").unwrap());

/// arXiv Atom API 检索源。响应是Atom XML，
/// 这里只按条目提取检索需要的少量字段
pub struct ArxivSource {
    client: Client,
    api_base: String,
    limiter: RateLimiter,
}

impl ArxivSource {
    pub fn new(config: &SearchConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            api_base: config.arxiv_api_base.clone(),
            limiter: RateLimiter::new(config.requests_per_minute),
        })
    }
}

#[async_trait]
impl SearchSource for ArxivSource {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    async fn fetch_page(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<String, SourceError> {
        self.limiter.acquire().await;

        let response = self
            .client
            .get(&self.api_base)
            .query(&[
                ("search_query", query),
                ("start", &offset.to_string()),
                ("max_results", &limit.to_string()),
                ("sortBy", "relevance"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await
            .map_err(|e| {
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
        if !payload.contains("<feed") {
            return Err(SourceError::MalformedResponse(
                "响应中没有Atom feed".to_string(),
            ));
        }

        let mut papers = Vec::new();
        for entry in ENTRY_RE.captures_iter(payload) {
            let body = &entry[1];

            let title = capture_text(&TITLE_RE, body);
            let abstract_text = capture_text(&SUMMARY_RE, body);
            let year = PUBLISHED_RE
                .captures(body)
                .and_then(|c| c[1].parse::<i32>().ok());

            let id = match ID_RE.captures(body) {
                Some(c) => arxiv_id_from_url(&c[1]),
                None => PaperRecord::derived_id(&title, year),
            };

            let authors = AUTHOR_NAME_RE
                .captures_iter(body)
                .map(|c| unescape_xml(&c[1]))
                .collect();

            papers.push(PaperRecord {
                id,
                title,
                abstract_text,
                authors,
                year,
                venue: "arXiv".to_string(),
                citation_count: 0,
                references: Vec::new(),
                source: SourceTag::Arxiv,
                area: area.to_string(),
            });
        }

        Ok(papers)
    }
}

/// 从Atom条目的id地址中提取arXiv标识
fn arxiv_id_from_url(url: &str) -> String {
    match url.rsplit_once("/abs/") {
        Some((_, id)) => format!("arxiv:{}", id),
        None => format!("arxiv:{}", url.trim()),
    }
}

/// 提取一段文本字段：反转义实体并压缩空白
fn capture_text(re: &Regex, body: &str) -> String {
    re.captures(body)
        .map(|c| {
            unescape_xml(&c[1])
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
