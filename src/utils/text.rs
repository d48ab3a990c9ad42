use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// 标题规范化：小写、去掉标点、压缩空白。
/// 用于跨检索源的同篇论文识别与派生标识计算
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let replaced = NON_ALNUM.replace_all(&lowered, " ");
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 规范化标题的词级Jaccard相似度，范围0-1
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let normalized_a = normalize_title(a);
    let normalized_b = normalize_title(b);
    let tokens_a: HashSet<&str> = normalized_a.split(' ').filter(|t| !t.is_empty()).collect();
    let tokens_b: HashSet<&str> = normalized_b.split(' ').filter(|t| !t.is_empty()).collect();

    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    intersection as f64 / union as f64
}

/// 把研究方向名称转为可做文件名的slug
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let replaced = NON_ALNUM.replace_all(&lowered, "-");
    replaced.trim_matches('-').to_string()
}
