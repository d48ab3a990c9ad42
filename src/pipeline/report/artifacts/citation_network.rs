use anyhow::Result;
use std::collections::{HashMap, HashSet};

use crate::pipeline::analyze::AnalyzedSet;
use crate::types::analysis::AnalysisRecord;

/// 节点标签中标题的最大长度
const MAX_TITLE_LEN: usize = 48;

/// 判定共同主题边所需的相同技术标签数量
const SHARED_TAG_THRESHOLD: usize = 2;

/// 生成引文网络产物。节点是论文，
/// 有引用关系时画引用边，没有时退化为按共享技术标签连接的共同主题边
pub fn build(analyzed: &AnalyzedSet) -> Result<String> {
    let records = &analyzed.records;

    let mut doc = String::new();
    doc.push_str("# Citation Network\n\n");

    if records.is_empty() {
        doc.push_str("No papers available.\n");
        return Ok(doc);
    }

    let node_ids: HashMap<&str, String> = records
        .iter()
        .enumerate()
        .map(|(index, record)| (record.paper.id.as_str(), format!("P{}", index + 1)))
        .collect();

    // 集合内部的引用边
    let mut citation_edges: Vec<(String, String)> = Vec::new();
    let mut seen = HashSet::new();
    for record in records.iter() {
        let from = &node_ids[record.paper.id.as_str()];
        for reference in &record.paper.references {
            if let Some(to) = node_ids.get(reference.as_str())
                && from != to
                && seen.insert((from.clone(), to.clone()))
            {
                citation_edges.push((from.clone(), to.clone()));
            }
        }
    }

    // 没有任何引用关系时退化为共同主题边
    let mut topic_edges: Vec<(String, String)> = Vec::new();
    if citation_edges.is_empty() {
        for i in 0..records.len() {
            for j in (i + 1)..records.len() {
                if shared_tag_count(&records[i], &records[j]) >= SHARED_TAG_THRESHOLD {
                    let from = &node_ids[records[i].paper.id.as_str()];
                    let to = &node_ids[records[j].paper.id.as_str()];
                    topic_edges.push((from.clone(), to.clone()));
                }
            }
        }
    }

    doc.push_str(&format!(
        "{} papers, {} citation links, {} co-topic links.\n\n",
        records.len(),
        citation_edges.len(),
        topic_edges.len()
    ));

    doc.push_str("```mermaid\ngraph LR\n");
    for record in records.iter() {
        doc.push_str(&format!(
            "    {}[\"{}\"]\n",
            node_ids[record.paper.id.as_str()],
            node_label(record)
        ));
    }
    for (from, to) in &citation_edges {
        doc.push_str(&format!("    {} --> {}\n", from, to));
    }
    for (from, to) in &topic_edges {
        doc.push_str(&format!("    {} -.- {}\n", from, to));
    }
    doc.push_str("```\n");

    if citation_edges.is_empty() && topic_edges.is_empty() {
        doc.push_str(
            "\nNo citation metadata or shared approach tags were available; only nodes are shown.\n",
        );
    }

    Ok(doc)
}

fn shared_tag_count(a: &AnalysisRecord, b: &AnalysisRecord) -> usize {
    let (Some(assessment_a), Some(assessment_b)) = (&a.assessment, &b.assessment) else {
        return 0;
    };
    let tags_a: HashSet<&str> = assessment_a.approach_tags.iter().map(String::as_str).collect();
    assessment_b
        .approach_tags
        .iter()
        .filter(|tag| tags_a.contains(tag.as_str()))
        .count()
}

fn node_label(record: &AnalysisRecord) -> String {
    let mut title: String = record.paper.title.chars().take(MAX_TITLE_LEN).collect();
    if record.paper.title.chars().count() > MAX_TITLE_LEN {
        title.push('…');
    }
    // mermaid标签里双引号会截断标签
    let title = title.replace('"', "'");

    let year = record
        .paper
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "?".to_string());
    format!("{} ({}) · {} citations", title, year, record.paper.citation_count)
}
