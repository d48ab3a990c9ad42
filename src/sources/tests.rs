#[cfg(test)]
mod tests {
    use crate::cache::CacheManager;
    use crate::config::{CacheConfig, SearchConfig};
    use crate::sources::{
        ArxivSource, SearchSource, SemanticScholarSource, SourceError, search_papers,
    };
    use crate::types::paper::{PaperRecord, SourceTag};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn search_config() -> SearchConfig {
        let mut config = SearchConfig::default();
        config.page_size = 2;
        config.retry_attempts = 2;
        config.retry_base_delay_ms = 1;
        config
    }

    fn cache_manager(dir: &TempDir) -> CacheManager {
        CacheManager::new(CacheConfig {
            enabled: true,
            cache_dir: dir.path().to_path_buf(),
            expire_hours: 24,
        })
    }

    fn paper(id: &str, title: &str) -> PaperRecord {
        PaperRecord {
            id: id.to_string(),
            title: title.to_string(),
            abstract_text: format!("abstract of {}", title),
            authors: vec!["A. Author".to_string()],
            year: Some(2020),
            venue: "TestConf".to_string(),
            citation_count: 1,
            references: vec![],
            source: SourceTag::SemanticScholar,
            area: "Dynamic Scheduling".to_string(),
        }
    }

    /// 用内存列表模拟检索源，payload直接是切片的JSON
    struct MockSource {
        papers: Vec<PaperRecord>,
        fetch_calls: AtomicUsize,
    }

    impl MockSource {
        fn new(papers: Vec<PaperRecord>) -> Self {
            Self {
                papers,
                fetch_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SearchSource for MockSource {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn fetch_page(
            &self,
            _query: &str,
            offset: usize,
            limit: usize,
        ) -> Result<String, SourceError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            let end = (offset + limit).min(self.papers.len());
            let page: Vec<PaperRecord> = if offset < end {
                self.papers[offset..end].to_vec()
            } else {
                Vec::new()
            };
            Ok(serde_json::to_string(&page).unwrap())
        }

        fn parse_page(
            &self,
            payload: &str,
            _area: &str,
        ) -> Result<Vec<PaperRecord>, SourceError> {
            serde_json::from_str(payload).map_err(|e| SourceError::MalformedResponse(e.to_string()))
        }
    }

    #[test]
    fn test_error_classification() {
        assert!(SourceError::Timeout.is_transient());
        assert!(SourceError::Server(503).is_transient());
        assert!(SourceError::RateLimited.is_transient());
        assert!(!SourceError::Auth(401).is_transient());
        assert!(!SourceError::Rejected(400).is_transient());
        assert!(!SourceError::MalformedResponse("bad".to_string()).is_transient());

        assert!(SourceError::Cache("io".to_string()).is_fatal());
        assert!(!SourceError::Timeout.is_fatal());
    }

    #[test]
    fn test_from_status() {
        assert!(matches!(SourceError::from_status(429), SourceError::RateLimited));
        assert!(matches!(SourceError::from_status(401), SourceError::Auth(401)));
        assert!(matches!(SourceError::from_status(503), SourceError::Server(503)));
        assert!(matches!(SourceError::from_status(404), SourceError::Rejected(404)));
    }

    #[test]
    fn test_semantic_scholar_parse_page() {
        let source = SemanticScholarSource::new(&search_config()).unwrap();
        let payload = r#"{
            "total": 2,
            "offset": 0,
            "data": [
                {
                    "paperId": "abc123",
                    "title": "Online Scheduling Under Uncertainty",
                    "abstract": "We study online scheduling.",
                    "year": 2021,
                    "venue": "SOSP",
                    "citationCount": 42,
                    "authors": [{"authorId": "1", "name": "Ada Lovelace"}],
                    "references": [{"paperId": "ref1"}, {"paperId": "ref2"}]
                },
                {
                    "title": "Deadline-Aware Placement",
                    "abstract": null,
                    "authors": []
                }
            ]
        }"#;

        let papers = source.parse_page(payload, "Dynamic Scheduling").unwrap();
        assert_eq!(papers.len(), 2);

        assert_eq!(papers[0].id, "abc123");
        assert_eq!(papers[0].title, "Online Scheduling Under Uncertainty");
        assert_eq!(papers[0].year, Some(2021));
        assert_eq!(papers[0].citation_count, 42);
        assert_eq!(papers[0].authors, vec!["Ada Lovelace"]);
        assert_eq!(papers[0].references, vec!["ref1", "ref2"]);
        assert_eq!(papers[0].area, "Dynamic Scheduling");
        assert_eq!(papers[0].source, SourceTag::SemanticScholar);

        // 缺失字段回落为默认值，不报错；缺失的ID由标题派生
        assert!(papers[1].has_derived_id());
        assert!(papers[1].abstract_text.is_empty());
        assert_eq!(papers[1].citation_count, 0);
        assert!(papers[1].year.is_none());
    }

    #[test]
    fn test_semantic_scholar_parse_empty_data() {
        let source = SemanticScholarSource::new(&search_config()).unwrap();
        let papers = source.parse_page(r#"{"total": 0}"#, "x").unwrap();
        assert!(papers.is_empty());
    }

    #[test]
    fn test_semantic_scholar_parse_garbage() {
        let source = SemanticScholarSource::new(&search_config()).unwrap();
        let result = source.parse_page("<html>rate limited</html>", "x");
        assert!(matches!(result, Err(SourceError::MalformedResponse(_))));
    }

    #[test]
    fn test_arxiv_parse_page() {
        let source = ArxivSource::new(&search_config()).unwrap();
        let payload = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query Results</title>
  <entry>
    <id>http://arxiv.org/abs/2301.01234v1</id>
    <title>Deadline-Aware Scheduling
        for Edge Clusters</title>
    <summary>We present a deadline-aware scheduler &amp; evaluate it.</summary>
    <published>2023-01-03T18:00:00Z</published>
    <author><name>Grace Hopper</name></author>
    <author><name>Alan Turing</name></author>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2205.04321v2</id>
    <title>Robust Online Placement</title>
    <summary>A robust approach.</summary>
    <published>2022-05-09T10:00:00Z</published>
    <author><name>Edsger Dijkstra</name></author>
  </entry>
</feed>"#;

        let papers = source.parse_page(payload, "Dynamic Scheduling").unwrap();
        assert_eq!(papers.len(), 2);

        assert_eq!(papers[0].id, "arxiv:2301.01234v1");
        // 多行标题被压缩为单行
        assert_eq!(papers[0].title, "Deadline-Aware Scheduling for Edge Clusters");
        assert_eq!(
            papers[0].abstract_text,
            "We present a deadline-aware scheduler & evaluate it."
        );
        assert_eq!(papers[0].year, Some(2023));
        assert_eq!(papers[0].authors, vec!["Grace Hopper", "Alan Turing"]);
        assert_eq!(papers[0].venue, "arXiv");
        assert_eq!(papers[0].citation_count, 0);
        assert_eq!(papers[0].source, SourceTag::Arxiv);

        assert_eq!(papers[1].id, "arxiv:2205.04321v2");
        assert_eq!(papers[1].year, Some(2022));
    }

    #[test]
    fn test_arxiv_parse_not_a_feed() {
        let source = ArxivSource::new(&search_config()).unwrap();
        let result = source.parse_page("service unavailable", "x");
        assert!(matches!(result, Err(SourceError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_search_papers_paginates_until_target() {
        let temp_dir = TempDir::new().unwrap();
        let cache = cache_manager(&temp_dir);
        let source = MockSource::new(vec![
            paper("p1", "Paper One"),
            paper("p2", "Paper Two"),
            paper("p3", "Paper Three"),
            paper("p4", "Paper Four"),
        ]);

        let papers = search_papers(&source, &cache, &search_config(), "scheduling", "area", 3)
            .await
            .unwrap();

        assert_eq!(papers.len(), 3);
        assert_eq!(papers[0].id, "p1");
        assert_eq!(papers[2].id, "p3");
        assert_eq!(source.fetch_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_search_papers_warm_cache_skips_network() {
        let temp_dir = TempDir::new().unwrap();
        let cache = cache_manager(&temp_dir);
        let config = search_config();

        let source = MockSource::new(vec![paper("p1", "Paper One"), paper("p2", "Paper Two")]);
        let first = search_papers(&source, &cache, &config, "scheduling", "area", 2)
            .await
            .unwrap();
        assert_eq!(source.fetch_calls.load(Ordering::SeqCst), 1);

        // 相同请求再次执行，直接命中缓存，不再发起网络请求
        let source_again =
            MockSource::new(vec![paper("p1", "Paper One"), paper("p2", "Paper Two")]);
        let second = search_papers(&source_again, &cache, &config, "scheduling", "area", 2)
            .await
            .unwrap();
        assert_eq!(source_again.fetch_calls.load(Ordering::SeqCst), 0);

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_search_papers_stops_on_empty_page() {
        let temp_dir = TempDir::new().unwrap();
        let cache = cache_manager(&temp_dir);
        let source = MockSource::new(vec![paper("p1", "Paper One")]);

        // 想要5篇但源里只有1篇：第二页为空，返回部分结果
        let papers = search_papers(&source, &cache, &search_config(), "scheduling", "area", 5)
            .await
            .unwrap();
        assert_eq!(papers.len(), 1);
    }
}
