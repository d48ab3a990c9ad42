use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::utils::text::normalize_title;

/// 论文的来源检索服务
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceTag {
    #[serde(rename = "semantic_scholar")]
    SemanticScholar,
    #[serde(rename = "arxiv")]
    Arxiv,
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceTag::SemanticScholar => write!(f, "semantic_scholar"),
            SourceTag::Arxiv => write!(f, "arxiv"),
        }
    }
}

/// 规范化后的论文记录。采集阶段合并完成后不再修改，
/// 分析阶段只读取它并产出独立的衍生记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRecord {
    /// 稳定标识。来源服务给出的ID，缺失时由标题+年份哈希派生
    pub id: String,

    pub title: String,

    #[serde(rename = "abstract")]
    pub abstract_text: String,

    pub authors: Vec<String>,

    pub year: Option<i32>,

    pub venue: String,

    pub citation_count: u32,

    /// 本记录引用的其他论文ID（来源服务提供时才有）
    #[serde(default)]
    pub references: Vec<String>,

    pub source: SourceTag,

    /// 采集该论文时所属的研究方向
    pub area: String,
}

impl PaperRecord {
    /// 由标题+年份派生稳定标识，用于来源服务没有给出ID的记录
    pub fn derived_id(title: &str, year: Option<i32>) -> String {
        let mut hasher = Md5::new();
        hasher.update(normalize_title(title).as_bytes());
        hasher.update(year.map(|y| y.to_string()).unwrap_or_default().as_bytes());
        format!("derived:{:x}", hasher.finalize())
    }

    pub fn has_derived_id(&self) -> bool {
        self.id.starts_with("derived:")
    }

    /// 摘要的完整程度，用于合并重复记录时选择保留方
    pub fn abstract_completeness(&self) -> usize {
        self.abstract_text.trim().len()
    }
}

/// 合并两条指向同一篇论文的记录。
/// 保留摘要更完整的一方作为主体，标识优先取来源服务给出的ID，
/// 引用数取较大值，引用列表取并集
pub fn merge_records(a: PaperRecord, b: PaperRecord) -> PaperRecord {
    let (mut primary, secondary) = if a.abstract_completeness() >= b.abstract_completeness() {
        (a, b)
    } else {
        (b, a)
    };

    if primary.has_derived_id() && !secondary.has_derived_id() {
        primary.id = secondary.id.clone();
    }
    primary.citation_count = primary.citation_count.max(secondary.citation_count);
    if primary.year.is_none() {
        primary.year = secondary.year;
    }
    if primary.venue.trim().is_empty() {
        primary.venue = secondary.venue;
    }
    if primary.authors.is_empty() {
        primary.authors = secondary.authors;
    }

    for reference in secondary.references {
        if !primary.references.contains(&reference) {
            primary.references.push(reference);
        }
    }
    primary.references.sort();

    primary
}
