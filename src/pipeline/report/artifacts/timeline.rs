use anyhow::Result;
use std::collections::BTreeMap;

use crate::pipeline::analyze::AnalyzedSet;

/// 生成发表年份时间线产物：按年份分桶的直方图
pub fn build(analyzed: &AnalyzedSet) -> Result<String> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for record in &analyzed.records {
        if let Some(year) = record.paper.year {
            *counts.entry(year).or_insert(0) += 1;
        }
    }

    let mut doc = String::new();
    doc.push_str("# Publication Timeline\n\n");

    if counts.is_empty() {
        doc.push_str("No publication year information available.\n");
        return Ok(doc);
    }

    doc.push_str("| Year | Papers | |\n");
    doc.push_str("|------|--------|---|\n");
    for (year, count) in &counts {
        doc.push_str(&format!(
            "| {} | {} | {} |\n",
            year,
            count,
            "█".repeat(*count)
        ));
    }

    let total: usize = counts.values().sum();
    let first = counts.keys().next().unwrap();
    let last = counts.keys().next_back().unwrap();
    doc.push_str(&format!(
        "\n{} papers with known publication year, spanning {}–{}.\n",
        total, first, last
    ));

    Ok(doc)
}
