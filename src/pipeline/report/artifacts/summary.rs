use anyhow::Result;
use std::collections::BTreeMap;

use crate::pipeline::analyze::AnalyzedSet;
use crate::types::analysis::AnalysisRecord;

/// 汇总中每个研究方向列出的高分论文数量上限
const TOP_PAPERS_PER_AREA: usize = 5;

/// 列出的技术标签数量上限
const TAG_TABLE_LIMIT: usize = 15;

/// 生成文字汇总产物：逐研究方向的统计行、排名靠前的论文、
/// 技术标签频次表
pub fn build(analyzed: &AnalyzedSet, relevance_threshold: f64) -> Result<String> {
    let mut doc = String::new();
    doc.push_str("# Research Survey Summary\n\n");
    doc.push_str(&format!("Survey: {}\n\n", analyzed.survey_name));
    doc.push_str(&format!(
        "Analysis model: {} (prompt {})\n\n",
        analyzed.model, analyzed.prompt_version
    ));
    doc.push_str(&format!(
        "Generated at: {}\n",
        analyzed.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    if analyzed.records.is_empty() {
        doc.push_str("\nNo papers were collected.\n");
        return Ok(doc);
    }

    // 按研究方向分组，BTreeMap保证方向的遍历顺序稳定
    let mut by_area: BTreeMap<&str, Vec<&AnalysisRecord>> = BTreeMap::new();
    for record in &analyzed.records {
        by_area.entry(record.paper.area.as_str()).or_default().push(record);
    }

    doc.push_str("\n## Research Areas\n\n");
    for (area, records) in &by_area {
        let analyzed_count = records.iter().filter(|r| r.is_analyzed()).count();
        let unanalyzed_count = records.len() - analyzed_count;
        let top_score = records
            .iter()
            .filter_map(|r| r.relevance_score())
            .fold(f64::NEG_INFINITY, f64::max);
        let top_score = if top_score.is_finite() {
            format!("{:.2}", top_score)
        } else {
            "n/a".to_string()
        };
        doc.push_str(&format!(
            "- {}: {} analyzed, {} unanalyzed, top score {}\n",
            area, analyzed_count, unanalyzed_count, top_score
        ));
    }

    doc.push_str(&format!(
        "\n## Top Papers (score ≥ {:.1})\n",
        relevance_threshold
    ));
    for (area, records) in &by_area {
        // records继承了全局排名顺序，这里只做筛选
        let top: Vec<&&AnalysisRecord> = records
            .iter()
            .filter(|r| {
                r.relevance_score()
                    .is_some_and(|score| score >= relevance_threshold)
            })
            .take(TOP_PAPERS_PER_AREA)
            .collect();

        doc.push_str(&format!("\n### {}\n\n", area));
        if top.is_empty() {
            doc.push_str("No papers reached the relevance threshold.\n");
            continue;
        }

        for (rank, record) in top.iter().enumerate() {
            let paper = &record.paper;
            let Some(assessment) = record.assessment.as_ref() else {
                continue;
            };
            doc.push_str(&format!(
                "{}. **{}** ({}, {}) — score {:.2}, {} citations\n",
                rank + 1,
                paper.title,
                paper
                    .year
                    .map(|y| y.to_string())
                    .unwrap_or_else(|| "?".to_string()),
                if paper.venue.is_empty() { "unknown venue" } else { &paper.venue },
                assessment.relevance_score,
                paper.citation_count
            ));
            for contribution in assessment.key_contributions.iter().take(3) {
                doc.push_str(&format!("   - {}\n", contribution));
            }
            if !assessment.approach_tags.is_empty() {
                doc.push_str(&format!(
                    "   - tags: {}\n",
                    assessment.approach_tags.join(", ")
                ));
            }
        }
    }

    let tag_counts = count_tags(&analyzed.records);
    if !tag_counts.is_empty() {
        doc.push_str("\n## Approach Tags\n\n");
        doc.push_str("| Tag | Papers |\n");
        doc.push_str("|-----|--------|\n");
        for (tag, count) in tag_counts.iter().take(TAG_TABLE_LIMIT) {
            doc.push_str(&format!("| {} | {} |\n", tag, count));
        }
    }

    Ok(doc)
}

/// 统计技术标签频次，按频次降序、同频次按字典序排列
fn count_tags(records: &[AnalysisRecord]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        if let Some(assessment) = &record.assessment {
            for tag in &assessment.approach_tags {
                *counts.entry(tag.clone()).or_insert(0) += 1;
            }
        }
    }

    let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
}
