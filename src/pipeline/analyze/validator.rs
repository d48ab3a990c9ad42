use crate::types::analysis::PaperAssessment;

/// 对LLM评估结果的显式校验结论。
/// 绝不对不合格的结果做猜测性修补，要么修复重试要么放弃
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// 结果可用
    Valid,
    /// 结果有瑕疵，值得带着修复指令重试一次
    RepairNeeded(String),
    /// 结果无法使用，重试也没有意义
    Unusable(String),
}

/// 清理评估结果：去掉字段两端空白、丢弃空项、技术标签小写并去重
pub fn sanitize_assessment(mut assessment: PaperAssessment) -> PaperAssessment {
    let tidy_list = |items: Vec<String>| -> Vec<String> {
        items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    };

    assessment.key_contributions = tidy_list(assessment.key_contributions);
    assessment.strengths = tidy_list(assessment.strengths);
    assessment.limitations = tidy_list(assessment.limitations);

    let mut tags: Vec<String> = assessment
        .approach_tags
        .into_iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect();
    tags.dedup();
    assessment.approach_tags = tags;

    assessment.integration_notes = assessment.integration_notes.trim().to_string();
    assessment.summary = assessment.summary.trim().to_string();
    assessment
}

/// 校验评估结果是否满足结构约定
pub fn validate_assessment(assessment: &PaperAssessment) -> Validation {
    if !assessment.relevance_score.is_finite() {
        return Validation::Unusable("相关性评分不是有效数字".to_string());
    }
    if !(0.0..=10.0).contains(&assessment.relevance_score) {
        return Validation::RepairNeeded(format!(
            "相关性评分 {} 超出0-10范围",
            assessment.relevance_score
        ));
    }
    if assessment.key_contributions.is_empty() {
        return Validation::RepairNeeded("核心贡献列表为空".to_string());
    }
    if assessment.summary.trim().is_empty() {
        return Validation::RepairNeeded("缺少一句话概括".to_string());
    }
    Validation::Valid
}
