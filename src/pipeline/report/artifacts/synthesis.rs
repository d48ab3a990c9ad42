use anyhow::{Result, bail};

use crate::cache::llm_fingerprint;
use crate::llm::client::utils::evaluate_befitting_model;
use crate::pipeline::analyze::AnalyzedSet;
use crate::pipeline::context::PipelineContext;

/// 参与综述的论文数量上限，避免提示词无限膨胀
const SYNTHESIS_PAPER_LIMIT: usize = 12;

/// 生成LLM综述产物：跨论文的主题、洞察、研究空白与建议。
/// 结果进缓存，相同的分析集不会重复消耗推理
pub async fn build(context: &PipelineContext, analyzed: &AnalyzedSet) -> Result<String> {
    let digest = render_digest(analyzed);
    if digest.is_empty() {
        bail!("没有已分析的论文可供综述");
    }

    let system_prompt = include_str!("prompts/synthesis_sys.tpl");
    let user_prompt = format!(
        include_str!("prompts/synthesis_user.tpl"),
        analyzed.survey_name, digest
    );

    let llm_config = &context.config.llm;
    let (model, _) = evaluate_befitting_model(llm_config, system_prompt, &user_prompt);
    let cache_key = llm_fingerprint(system_prompt, &user_prompt, &model, llm_config.temperature);

    let cached: Option<String> = {
        let cache = context.cache_manager.read().await;
        cache.get("synthesis", &cache_key).await?
    };
    if let Some(content) = cached {
        println!("   🎯 综述命中缓存");
        return Ok(content);
    }

    let content = context.llm_client.prompt(system_prompt, &user_prompt).await?;

    {
        let cache = context.cache_manager.read().await;
        cache
            .set_with_model("synthesis", &cache_key, &content, &model)
            .await?;
    }

    Ok(content)
}

/// 把排名靠前的已分析论文压缩成综述提示词用的摘要块
fn render_digest(analyzed: &AnalyzedSet) -> String {
    let mut digest = String::new();

    for record in analyzed
        .records
        .iter()
        .filter(|record| record.is_analyzed())
        .take(SYNTHESIS_PAPER_LIMIT)
    {
        let Some(assessment) = &record.assessment else {
            continue;
        };
        digest.push_str(&format!(
            "### {} ({})\n",
            record.paper.title,
            record
                .paper
                .year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "?".to_string())
        ));
        digest.push_str(&format!("- area: {}\n", record.paper.area));
        digest.push_str(&format!(
            "- relevance: {:.1}\n",
            assessment.relevance_score
        ));
        digest.push_str(&format!("- summary: {}\n", assessment.summary));
        if !assessment.key_contributions.is_empty() {
            digest.push_str(&format!(
                "- contributions: {}\n",
                assessment.key_contributions.join("; ")
            ));
        }
        if !assessment.approach_tags.is_empty() {
            digest.push_str(&format!(
                "- tags: {}\n",
                assessment.approach_tags.join(", ")
            ));
        }
        if !assessment.integration_notes.is_empty() {
            digest.push_str(&format!(
                "- integration: {}\n",
                assessment.integration_notes
            ));
        }
        digest.push('\n');
    }

    digest
}
