use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::cache::llm_fingerprint;
use crate::pipeline::collect::CollectedArea;
use crate::pipeline::context::PipelineContext;
use crate::staging::{SnapshotKeys, StageScope};
use crate::types::analysis::{AnalysisRecord, PaperAssessment, rank_analyses};
use crate::types::paper::PaperRecord;
use crate::utils::threads::do_parallel_with_limit;

pub mod validator;

use validator::{Validation, sanitize_assessment, validate_assessment};

/// 提示词模板版本，随模板内容一起演进，记录在每条分析结果上
pub const ANALYSIS_PROMPT_VERSION: &str = "v3";

const REPAIR_INSTRUCTION: &str = "IMPORTANT: your previous assessment was rejected for the reason given below. Produce the assessment again, strictly following the required structure. The relevance_score MUST be a number within [0, 10], key_contributions MUST NOT be empty, and summary MUST NOT be empty. Rejection reason: ";

/// 分析阶段的完整产出快照
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalyzedSet {
    pub survey_name: String,
    pub model: String,
    pub prompt_version: String,
    pub generated_at: DateTime<Utc>,
    pub records: Vec<AnalysisRecord>,
}

/// 高相关论文子集快照
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TopPapers {
    pub relevance_threshold: f64,
    pub generated_at: DateTime<Utc>,
    pub records: Vec<AnalysisRecord>,
}

/// 执行LLM分析阶段
pub async fn execute(context: &PipelineContext) -> Result<()> {
    let start_time = Instant::now();
    let config = &context.config;

    println!("🤖 开始LLM分析阶段...");

    if !config.force_regenerate
        && context
            .has_snapshot(StageScope::ANALYZE, SnapshotKeys::ANALYZED)
            .await
    {
        println!("⏭️ 已有分析快照，跳过LLM分析阶段");
        if let Some(existing) = context
            .read_snapshot::<AnalyzedSet>(StageScope::ANALYZE, SnapshotKeys::ANALYZED)
            .await?
        {
            record_analysis_stats(context, &existing.records).await;
        }
        return Ok(());
    }

    let papers = load_collected_papers(context).await?;
    if papers.is_empty() {
        println!("⚠️ 采集快照中没有任何论文，分析阶段产出为空");
    } else {
        println!(
            "🚀 启动并发分析，论文 {} 篇，最大并发数：{}",
            papers.len(),
            config.llm.max_parallels
        );
    }

    let tasks: Vec<_> = papers
        .into_iter()
        .map(|paper| analyze_paper(context, paper))
        .collect();
    let results = do_parallel_with_limit(tasks, config.llm.max_parallels).await;

    let mut records = Vec::new();
    for result in results {
        records.push(result?);
    }

    // 排序与并发完成顺序无关，保证重复运行产出一致
    rank_analyses(&mut records);

    record_analysis_stats(context, &records).await;

    let analyzed = AnalyzedSet {
        survey_name: config.get_survey_name(),
        model: config.llm.model_efficient.clone(),
        prompt_version: ANALYSIS_PROMPT_VERSION.to_string(),
        generated_at: Utc::now(),
        records,
    };
    context
        .write_snapshot(StageScope::ANALYZE, SnapshotKeys::ANALYZED, &analyzed)
        .await?;

    let top = TopPapers {
        relevance_threshold: config.relevance_threshold,
        generated_at: Utc::now(),
        records: select_top_papers(&analyzed.records, config.relevance_threshold),
    };
    println!(
        "   🏆 {} 篇论文达到高相关分数线 {:.1}",
        top.records.len(),
        config.relevance_threshold
    );
    context
        .write_snapshot(StageScope::ANALYZE, SnapshotKeys::TOP_PAPERS, &top)
        .await?;

    println!(
        "✅ LLM分析完成，耗时 {:.2}秒",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

async fn record_analysis_stats(context: &PipelineContext, records: &[AnalysisRecord]) {
    let analyzed = records.iter().filter(|r| r.is_analyzed()).count();
    let mut summary = context.run_summary.write().await;
    summary.analyzed = analyzed;
    summary.unanalyzed = records.len() - analyzed;
}

/// 读取采集阶段的所有快照，快照键按字典序遍历保证顺序确定
async fn load_collected_papers(context: &PipelineContext) -> Result<Vec<PaperRecord>> {
    let mut papers = Vec::new();
    for key in context.list_snapshot_keys(StageScope::COLLECT).await? {
        if let Some(collected) = context
            .read_snapshot::<CollectedArea>(StageScope::COLLECT, &key)
            .await?
        {
            papers.extend(collected.papers);
        }
    }
    Ok(papers)
}

/// 按分数线筛选高相关子集
pub(crate) fn select_top_papers(
    records: &[AnalysisRecord],
    relevance_threshold: f64,
) -> Vec<AnalysisRecord> {
    records
        .iter()
        .filter(|record| {
            record
                .relevance_score()
                .is_some_and(|score| score >= relevance_threshold)
        })
        .cloned()
        .collect()
}

/// 分析单篇论文。论文级的失败在这里终结为unanalyzed标记，
/// 只有环境级错误（缓存损坏等）才会向上传播
async fn analyze_paper(context: &PipelineContext, paper: PaperRecord) -> Result<AnalysisRecord> {
    let llm_config = &context.config.llm;

    if paper.abstract_text.trim().is_empty() {
        println!("   ⚠️ 论文 [{}] 没有摘要，标记为未分析", paper.title);
        return Ok(AnalysisRecord::unanalyzed(
            paper,
            "摘要缺失",
            &llm_config.model_efficient,
            ANALYSIS_PROMPT_VERSION,
        ));
    }

    let system_prompt = include_str!("prompts/paper_analyze_sys.tpl");
    let user_prompt = render_user_prompt(&paper);
    let cache_key = llm_fingerprint(
        system_prompt,
        &user_prompt,
        &llm_config.model_efficient,
        llm_config.temperature,
    );

    let cached: Option<PaperAssessment> = {
        let cache = context.cache_manager.read().await;
        cache.get("analysis", &cache_key).await?
    };
    if let Some(assessment) = cached {
        return Ok(AnalysisRecord::analyzed(
            paper,
            assessment,
            &llm_config.model_efficient,
            ANALYSIS_PROMPT_VERSION,
        ));
    }

    match request_assessment(context, system_prompt, &user_prompt).await {
        Ok(assessment) => {
            {
                let cache = context.cache_manager.read().await;
                cache
                    .set_with_model(
                        "analysis",
                        &cache_key,
                        &assessment,
                        &llm_config.model_efficient,
                    )
                    .await?;
            }
            println!("   ✓ 论文 [{}] 分析完成", paper.title);
            Ok(AnalysisRecord::analyzed(
                paper,
                assessment,
                &llm_config.model_efficient,
                ANALYSIS_PROMPT_VERSION,
            ))
        }
        Err(reason) => {
            eprintln!("   ❌ 论文 [{}] 分析失败: {}", paper.title, reason);
            Ok(AnalysisRecord::unanalyzed(
                paper,
                &reason,
                &llm_config.model_efficient,
                ANALYSIS_PROMPT_VERSION,
            ))
        }
    }
}

/// 请求并校验评估结果。校验不通过或提取失败时带修复指令重试一次，
/// 仍然失败则把原因交还给调用方
async fn request_assessment(
    context: &PipelineContext,
    system_prompt: &str,
    user_prompt: &str,
) -> Result<PaperAssessment, String> {
    match context
        .llm_client
        .extract::<PaperAssessment>(system_prompt, user_prompt)
        .await
    {
        Ok(assessment) => {
            let assessment = sanitize_assessment(assessment);
            match validate_assessment(&assessment) {
                Validation::Valid => Ok(assessment),
                Validation::RepairNeeded(reason) => {
                    repair_assessment(context, system_prompt, user_prompt, &reason).await
                }
                Validation::Unusable(reason) => Err(format!("评估结果不可用: {}", reason)),
            }
        }
        Err(e) => repair_assessment(context, system_prompt, user_prompt, &e.to_string()).await,
    }
}

async fn repair_assessment(
    context: &PipelineContext,
    system_prompt: &str,
    user_prompt: &str,
    reason: &str,
) -> Result<PaperAssessment, String> {
    let repair_prompt = format!("{}\n\n{}{}", user_prompt, REPAIR_INSTRUCTION, reason);

    match context
        .llm_client
        .extract::<PaperAssessment>(system_prompt, &repair_prompt)
        .await
    {
        Ok(assessment) => {
            let assessment = sanitize_assessment(assessment);
            match validate_assessment(&assessment) {
                Validation::Valid => Ok(assessment),
                Validation::RepairNeeded(reason) | Validation::Unusable(reason) => {
                    Err(format!("修复重试后评估结果仍不可用: {}", reason))
                }
            }
        }
        Err(e) => Err(format!("修复重试仍然失败: {}", e)),
    }
}

/// 渲染单篇论文的分析提示词
fn render_user_prompt(paper: &PaperRecord) -> String {
    format!(
        include_str!("prompts/paper_analyze_user.tpl"),
        paper.area,
        paper.title,
        if paper.authors.is_empty() {
            "unknown".to_string()
        } else {
            paper.authors.join(", ")
        },
        paper
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        if paper.venue.trim().is_empty() {
            "unknown"
        } else {
            &paper.venue
        },
        paper.abstract_text
    )
}
