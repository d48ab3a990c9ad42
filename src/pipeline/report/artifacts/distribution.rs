use anyhow::Result;

use crate::pipeline::analyze::AnalyzedSet;

/// 生成相关性评分分布产物：0-10分成十个桶的直方图和基本统计量
pub fn build(analyzed: &AnalyzedSet) -> Result<String> {
    let scores: Vec<f64> = analyzed
        .records
        .iter()
        .filter_map(|record| record.relevance_score())
        .collect();

    let unanalyzed = analyzed.records.len() - scores.len();

    let mut doc = String::new();
    doc.push_str("# Relevance Score Distribution\n\n");

    if scores.is_empty() {
        doc.push_str("No relevance scores available.\n");
        return Ok(doc);
    }

    let mut buckets = [0usize; 10];
    for score in &scores {
        let index = (score.floor() as usize).min(9);
        buckets[index] += 1;
    }

    doc.push_str("| Score | Papers | |\n");
    doc.push_str("|-------|--------|---|\n");
    for (index, count) in buckets.iter().enumerate() {
        let upper = if index == 9 { "10]".to_string() } else { format!("{})", index + 1) };
        doc.push_str(&format!(
            "| [{}, {} | {} | {} |\n",
            index,
            upper,
            count,
            "█".repeat(*count)
        ));
    }

    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let median = median(&scores);
    let variance =
        scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;

    doc.push_str(&format!(
        "\nMean: {:.2} · Median: {:.2} · Std: {:.2}\n",
        mean,
        median,
        variance.sqrt()
    ));
    doc.push_str(&format!(
        "\n{} analyzed papers, {} unanalyzed.\n",
        scores.len(),
        unanalyzed
    ));

    Ok(doc)
}

fn median(scores: &[f64]) -> f64 {
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
