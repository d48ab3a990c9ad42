#[cfg(test)]
mod tests {
    use crate::config::{Config, ResearchAreaConfig};
    use crate::pipeline::collect::{
        CollectedArea, collect_area, dedupe_papers, filter_papers, select_top,
    };
    use crate::pipeline::context::PipelineContext;
    use crate::sources::{SearchSource, SourceError};
    use crate::types::paper::{PaperRecord, SourceTag};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn paper(id: &str, title: &str, abstract_text: &str) -> PaperRecord {
        PaperRecord {
            id: id.to_string(),
            title: title.to_string(),
            abstract_text: abstract_text.to_string(),
            authors: vec!["A. Author".to_string()],
            year: Some(2020),
            venue: "TestConf".to_string(),
            citation_count: 0,
            references: vec![],
            source: SourceTag::SemanticScholar,
            area: "Dynamic Scheduling".to_string(),
        }
    }

    fn test_context(temp_dir: &TempDir) -> PipelineContext {
        let mut config = Config::default();
        config.research_areas = vec![ResearchAreaConfig {
            name: "Dynamic Scheduling".to_string(),
            keywords: vec!["online scheduling".to_string()],
            target_count: 3,
        }];
        config.internal_path = temp_dir.path().join(".paperscope");
        config.cache.cache_dir = temp_dir.path().join("cache");
        PipelineContext::new(config).unwrap()
    }

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

    /// 始终返回永久性错误的检索源
    struct BrokenSource;

    #[async_trait]
    impl SearchSource for BrokenSource {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn fetch_page(
            &self,
            _query: &str,
            _offset: usize,
            _limit: usize,
        ) -> Result<String, SourceError> {
            Err(SourceError::Rejected(400))
        }

        fn parse_page(
            &self,
            _payload: &str,
            _area: &str,
        ) -> Result<Vec<PaperRecord>, SourceError> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_dedupe_same_id_keeps_most_complete_abstract() {
        let mut sparse = paper("p1", "Online Scheduling", "short");
        sparse.citation_count = 50;
        let mut complete = paper("p1", "Online Scheduling", "a much longer and complete abstract");
        complete.citation_count = 10;

        let merged = dedupe_papers(vec![sparse, complete]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "p1");
        assert_eq!(merged[0].abstract_text, "a much longer and complete abstract");
        // 引用数取两者较大值
        assert_eq!(merged[0].citation_count, 50);
    }

    #[test]
    fn test_dedupe_by_title_similarity_prefers_source_id() {
        let mut s2 = paper("s2id", "Deadline-Aware Scheduling for Edge Clusters", "abstract");
        s2.references = vec!["r1".to_string()];
        let mut arxiv = paper(
            &PaperRecord::derived_id("Deadline-Aware Scheduling for Edge Clusters", Some(2020)),
            "Deadline-Aware Scheduling for Edge Clusters",
            "a noticeably longer abstract from the preprint version",
        );
        arxiv.source = SourceTag::Arxiv;

        let merged = dedupe_papers(vec![s2, arxiv]);
        assert_eq!(merged.len(), 1);
        // 摘要取更完整的arXiv版本，但标识保留检索服务给出的ID
        assert_eq!(merged[0].id, "s2id");
        assert!(merged[0].abstract_text.starts_with("a noticeably longer"));
        assert_eq!(merged[0].references, vec!["r1"]);
    }

    #[test]
    fn test_dedupe_keeps_distinct_papers() {
        let a = paper("p1", "Online Scheduling Survey", "abstract a");
        let b = paper("p2", "Knowledge Graph Reasoning", "abstract b");

        let merged = dedupe_papers(vec![a, b]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_dedupe_ignores_empty_titles_for_similarity() {
        let mut a = paper("p1", "", "abstract a");
        a.title = String::new();
        let mut b = paper("p2", "", "abstract b");
        b.title = String::new();

        // 两条都没有标题的记录不应该被相似度合并
        let merged = dedupe_papers(vec![a, b]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_filter_requires_title_and_abstract() {
        let valid = paper("p1", "Online Scheduling", "abstract");
        let no_abstract = paper("p2", "No Abstract", "");
        let mut no_title = paper("p3", "x", "abstract");
        no_title.title = "  ".to_string();

        let filtered = filter_papers(vec![valid, no_abstract, no_title], None);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "p1");
    }

    #[test]
    fn test_filter_by_year_floor() {
        let mut old = paper("p1", "Old Paper", "abstract");
        old.year = Some(2005);
        let mut recent = paper("p2", "Recent Paper", "abstract");
        recent.year = Some(2021);
        let mut unknown = paper("p3", "Unknown Year", "abstract");
        unknown.year = None;

        let filtered = filter_papers(vec![old, recent, unknown], Some(2015));
        let ids: Vec<&str> = filtered.iter().map(|p| p.id.as_str()).collect();
        // 年份过早的被过滤，年份未知的保留
        assert_eq!(ids, vec!["p2", "p3"]);
    }

    #[test]
    fn test_select_top_orders_by_citations_then_earlier_year() {
        let mut low = paper("p1", "Low Citations", "abstract");
        low.citation_count = 5;
        let mut high = paper("p2", "High Citations", "abstract");
        high.citation_count = 100;
        let mut seminal = paper("p3", "Seminal Work", "abstract");
        seminal.citation_count = 50;
        seminal.year = Some(2008);
        let mut modern = paper("p4", "Modern Work", "abstract");
        modern.citation_count = 50;
        modern.year = Some(2022);

        let selected = select_top(vec![low, high, modern, seminal], 3);
        let ids: Vec<&str> = selected.iter().map(|p| p.id.as_str()).collect();
        // 引用数降序，同引用数时更早的（开创性）工作优先
        assert_eq!(ids, vec!["p2", "p3", "p4"]);
    }

    #[tokio::test]
    async fn test_collect_area_truncates_to_target() {
        let temp_dir = TempDir::new().unwrap();
        let context = test_context(&temp_dir);
        let area = context.config.research_areas[0].clone();

        let sources: Vec<Box<dyn SearchSource>> = vec![Box::new(MockSource::new(vec![
            paper("p1", "Paper Alpha", "abstract alpha"),
            paper("p2", "Paper Beta", "abstract beta"),
            paper("p3", "Paper Gamma", "abstract gamma"),
            paper("p4", "Paper Delta", "abstract delta"),
        ]))];

        let collected = collect_area(&context, &sources, &area).await.unwrap();
        assert_eq!(collected.area, "Dynamic Scheduling");
        assert!(collected.papers.len() <= area.target_count);
        assert_eq!(collected.failed_queries, 0);
    }

    #[tokio::test]
    async fn test_collect_area_partial_failure_keeps_other_sources() {
        let temp_dir = TempDir::new().unwrap();
        let context = test_context(&temp_dir);
        let area = context.config.research_areas[0].clone();

        let sources: Vec<Box<dyn SearchSource>> = vec![
            Box::new(MockSource::new(vec![
                paper("p1", "Paper Alpha", "abstract alpha"),
                paper("p2", "Paper Beta", "abstract beta"),
            ])),
            Box::new(BrokenSource),
        ];

        let collected = collect_area(&context, &sources, &area).await.unwrap();
        // 一个检索源彻底失败不影响另一个的结果
        assert_eq!(collected.papers.len(), 2);
        assert_eq!(collected.failed_queries, 1);
        assert!(collected.papers.len() < collected.target_count);
    }

    #[tokio::test]
    async fn test_collect_area_is_idempotent_with_warm_cache() {
        let temp_dir = TempDir::new().unwrap();
        let context = test_context(&temp_dir);
        let area = context.config.research_areas[0].clone();

        let papers = vec![
            paper("p1", "Paper Alpha", "abstract alpha"),
            paper("p2", "Paper Beta", "abstract beta"),
            paper("p3", "Paper Gamma", "abstract gamma"),
        ];

        let first_source = MockSource::new(papers.clone());
        let sources: Vec<Box<dyn SearchSource>> = vec![Box::new(first_source)];
        let first = collect_area(&context, &sources, &area).await.unwrap();

        // 第二次运行命中缓存，产出逐字节一致
        let sources_again: Vec<Box<dyn SearchSource>> =
            vec![Box::new(MockSource::new(papers))];
        let second = collect_area(&context, &sources_again, &area).await.unwrap();

        assert_eq!(
            serde_json::to_string(&first.papers).unwrap(),
            serde_json::to_string(&second.papers).unwrap()
        );
    }

    #[test]
    fn test_collected_area_snapshot_round_trip() {
        let collected = CollectedArea {
            area: "Dynamic Scheduling".to_string(),
            target_count: 5,
            papers: vec![paper("p1", "Paper Alpha", "abstract alpha")],
            failed_queries: 1,
            collected_at: chrono::Utc::now(),
        };

        let json = serde_json::to_string(&collected).unwrap();
        let loaded: CollectedArea = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.area, collected.area);
        assert_eq!(loaded.papers.len(), 1);
        assert_eq!(loaded.failed_queries, 1);
        // PaperRecord的摘要字段以abstract为序列化名
        assert!(json.contains("\"abstract\":"));
    }
}
