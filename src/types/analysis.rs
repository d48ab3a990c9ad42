use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::paper::PaperRecord;

/// LLM对单篇论文的结构化评估结果
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PaperAssessment {
    /// 与调研主题的相关性评分，0-10
    pub relevance_score: f64,

    /// 论文的核心贡献，按重要性排列
    pub key_contributions: Vec<String>,

    /// 技术路线标签
    pub approach_tags: Vec<String>,

    /// 论文的亮点
    pub strengths: Vec<String>,

    /// 论文的不足
    pub limitations: Vec<String>,

    /// 与调研目标结合的切入点说明
    pub integration_notes: String,

    /// 一句话概括
    pub summary: String,
}

/// 分析状态。评估字段只在分析成功时存在，
/// 失败的论文携带明确的unanalyzed标记而不是编造的默认值
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisStatus {
    Analyzed,
    Unanalyzed { reason: String },
}

/// 一条论文记录加上LLM分析产出的衍生字段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub paper: PaperRecord,

    #[serde(flatten)]
    pub status: AnalysisStatus,

    pub assessment: Option<PaperAssessment>,

    /// 产生该分析的模型标识，用于复现与审计
    pub model: String,

    /// 分析所用提示词模板的版本
    pub prompt_version: String,

    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn analyzed(
        paper: PaperRecord,
        assessment: PaperAssessment,
        model: &str,
        prompt_version: &str,
    ) -> Self {
        Self {
            paper,
            status: AnalysisStatus::Analyzed,
            assessment: Some(assessment),
            model: model.to_string(),
            prompt_version: prompt_version.to_string(),
            analyzed_at: Utc::now(),
        }
    }

    pub fn unanalyzed(paper: PaperRecord, reason: &str, model: &str, prompt_version: &str) -> Self {
        Self {
            paper,
            status: AnalysisStatus::Unanalyzed {
                reason: reason.to_string(),
            },
            assessment: None,
            model: model.to_string(),
            prompt_version: prompt_version.to_string(),
            analyzed_at: Utc::now(),
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.status == AnalysisStatus::Analyzed
    }

    pub fn relevance_score(&self) -> Option<f64> {
        self.assessment.as_ref().map(|a| a.relevance_score)
    }
}

/// 对分析结果做确定性排序：相关性评分降序，引用数降序，
/// 年份降序（同分同引用时偏向较新的工作），最后按标识升序兜底。
/// 未分析的记录排在所有已分析记录之后
pub fn rank_analyses(records: &mut [AnalysisRecord]) {
    records.sort_by(|a, b| {
        let score_a = a.relevance_score().unwrap_or(f64::NEG_INFINITY);
        let score_b = b.relevance_score().unwrap_or(f64::NEG_INFINITY);
        score_b
            .partial_cmp(&score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.paper.citation_count.cmp(&a.paper.citation_count))
            .then_with(|| b.paper.year.unwrap_or(i32::MIN).cmp(&a.paper.year.unwrap_or(i32::MIN)))
            .then_with(|| a.paper.id.cmp(&b.paper.id))
    });
}
