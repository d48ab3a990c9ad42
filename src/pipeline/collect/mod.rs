use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::config::{ResearchAreaConfig, SearchConfig};
use crate::pipeline::context::PipelineContext;
use crate::sources::{ArxivSource, SearchSource, SemanticScholarSource, search_papers};
use crate::staging::StageScope;
use crate::types::paper::{PaperRecord, merge_records};
use crate::types::summary::AreaCollectStats;
use crate::utils::text::{normalize_title, slugify, title_similarity};
use crate::utils::threads::do_parallel_with_limit;

/// 两条记录被认定为同一篇论文的标题相似度下限
const TITLE_SIMILARITY_THRESHOLD: f64 = 0.9;

/// 采集阶段单个研究方向的快照
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CollectedArea {
    pub area: String,
    pub target_count: usize,
    pub papers: Vec<PaperRecord>,
    /// 所有重试耗尽后仍然失败的(检索源, 关键词)查询数量
    pub failed_queries: usize,
    pub collected_at: DateTime<Utc>,
}

/// 执行论文采集阶段
pub async fn execute(context: &PipelineContext) -> Result<()> {
    let start_time = Instant::now();
    let config = &context.config;

    println!("🔍 开始论文采集阶段...");

    let sources = build_sources(&config.search)?;
    if sources.is_empty() {
        bail!("没有启用任何检索源");
    }

    for area in &config.research_areas {
        let slug = slugify(&area.name);

        if !config.force_regenerate
            && context.has_snapshot(StageScope::COLLECT, &slug).await
        {
            println!("⏭️ 研究方向 [{}] 已有采集快照，跳过", area.name);
            if let Some(existing) = context
                .read_snapshot::<CollectedArea>(StageScope::COLLECT, &slug)
                .await?
            {
                record_area_stats(context, &existing).await;
            }
            continue;
        }

        println!(
            "📡 采集研究方向 [{}]，关键词 {} 个，目标 {} 篇...",
            area.name,
            area.keywords.len(),
            area.target_count
        );

        let collected = collect_area(context, &sources, area).await?;
        println!(
            "   📚 [{}] 保留 {} 篇论文（目标 {} 篇，失败查询 {} 个）",
            collected.area,
            collected.papers.len(),
            collected.target_count,
            collected.failed_queries
        );

        context
            .write_snapshot(StageScope::COLLECT, &slug, &collected)
            .await?;
        record_area_stats(context, &collected).await;
    }

    println!(
        "✅ 论文采集完成，耗时 {:.2}秒",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

async fn record_area_stats(context: &PipelineContext, collected: &CollectedArea) {
    let mut summary = context.run_summary.write().await;
    summary.collect.push(AreaCollectStats {
        area: collected.area.clone(),
        target_count: collected.target_count,
        collected: collected.papers.len(),
        failed_queries: collected.failed_queries,
    });
}

/// 根据配置构建启用的检索源
fn build_sources(config: &SearchConfig) -> Result<Vec<Box<dyn SearchSource>>> {
    let mut sources: Vec<Box<dyn SearchSource>> = Vec::new();
    if config.enable_semantic_scholar {
        sources.push(Box::new(SemanticScholarSource::new(config)?));
    }
    if config.enable_arxiv {
        sources.push(Box::new(ArxivSource::new(config)?));
    }
    Ok(sources)
}

/// 采集单个研究方向：对(检索源 × 关键词)做受限并发的分页检索，
/// 随后合并去重、过滤、按引用数截取
pub(crate) async fn collect_area(
    context: &PipelineContext,
    sources: &[Box<dyn SearchSource>],
    area: &ResearchAreaConfig,
) -> Result<CollectedArea> {
    let config = &context.config;

    let mut tasks = Vec::new();
    for keyword in &area.keywords {
        for source in sources {
            tasks.push(async move {
                let cache = context.cache_manager.read().await;
                match search_papers(
                    source.as_ref(),
                    &cache,
                    &config.search,
                    keyword,
                    &area.name,
                    area.target_count,
                )
                .await
                {
                    Ok(papers) => Ok((papers, false)),
                    Err(e) if e.is_fatal() => Err(anyhow!(e)),
                    Err(e) => {
                        // 单个查询的失败不影响其他查询，按空结果降级
                        eprintln!(
                            "⚠️ 查询 [{} @ {}] 重试耗尽后仍然失败，按空结果处理: {}",
                            keyword,
                            source.name(),
                            e
                        );
                        Ok((Vec::new(), true))
                    }
                }
            });
        }
    }

    let results =
        do_parallel_with_limit(tasks, config.search.max_concurrent_queries).await;

    let mut raw_papers = Vec::new();
    let mut failed_queries = 0usize;
    for result in results {
        let (papers, failed) = result?;
        if failed {
            failed_queries += 1;
        }
        raw_papers.extend(papers);
    }

    let merged = dedupe_papers(raw_papers);
    let filtered = filter_papers(merged, config.year_floor);
    let papers = select_top(filtered, area.target_count);

    Ok(CollectedArea {
        area: area.name.clone(),
        target_count: area.target_count,
        papers,
        failed_queries,
        collected_at: Utc::now(),
    })
}

/// 跨检索源合并重复记录：标识相同或标题高度相似的记录合并为一条，
/// 保留摘要更完整的一方
pub(crate) fn dedupe_papers(papers: Vec<PaperRecord>) -> Vec<PaperRecord> {
    let mut merged: Vec<PaperRecord> = Vec::new();

    'next_paper: for paper in papers {
        for existing in merged.iter_mut() {
            let same_id = existing.id == paper.id;
            // 空标题之间的相似度没有意义，只对有标题的记录做相似合并
            let similar_title = !normalize_title(&existing.title).is_empty()
                && !normalize_title(&paper.title).is_empty()
                && title_similarity(&existing.title, &paper.title)
                    >= TITLE_SIMILARITY_THRESHOLD;

            if same_id || similar_title {
                *existing = merge_records(existing.clone(), paper);
                continue 'next_paper;
            }
        }
        merged.push(paper);
    }

    merged
}

/// 过滤缺少必要字段或早于年份下限的记录
pub(crate) fn filter_papers(papers: Vec<PaperRecord>, year_floor: Option<i32>) -> Vec<PaperRecord> {
    papers
        .into_iter()
        .filter(|paper| {
            if paper.title.trim().is_empty() || paper.abstract_text.trim().is_empty() {
                return false;
            }
            match (year_floor, paper.year) {
                (Some(floor), Some(year)) => year >= floor,
                // 年份未知的记录保留，交给后续环节参考
                _ => true,
            }
        })
        .collect()
}

/// 截取到目标数量：引用数降序优先，同引用数时年份更早的（开创性工作）优先，
/// 最后按标识升序保证确定性
pub(crate) fn select_top(mut papers: Vec<PaperRecord>, target_count: usize) -> Vec<PaperRecord> {
    papers.sort_by(|a, b| {
        b.citation_count
            .cmp(&a.citation_count)
            .then_with(|| {
                a.year
                    .unwrap_or(i32::MAX)
                    .cmp(&b.year.unwrap_or(i32::MAX))
            })
            .then_with(|| a.id.cmp(&b.id))
    });
    papers.truncate(target_count);
    papers
}

// Include tests
#[cfg(test)]
mod tests;
