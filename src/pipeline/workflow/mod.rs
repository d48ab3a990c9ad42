use anyhow::Result;
use tokio::time::Instant;

use crate::config::Config;
use crate::pipeline::context::PipelineContext;
use crate::staging::{SnapshotKeys, StageScope};

/// 启动采集 → 分析 → 报告的三阶段流水线
pub async fn launch(config: &Config) -> Result<()> {
    config.validate()?;

    let context = PipelineContext::new(config.clone())?;
    let start_time = Instant::now();

    println!("🚀 paperscope 启动，调研主题: {}", config.get_survey_name());

    if !config.skip_collect {
        crate::pipeline::collect::execute(&context).await?;
    } else {
        println!("⏭️ 跳过论文采集阶段");
    }

    if !config.skip_analysis {
        // 启动分析前检查模型连接
        context.llm_client.check_connection().await?;
        crate::pipeline::analyze::execute(&context).await?;
    } else {
        println!("⏭️ 跳过LLM分析阶段");
    }

    if !config.skip_report {
        crate::pipeline::report::execute(&context).await?;
    } else {
        println!("⏭️ 跳过报告生成阶段");
    }

    let summary = context.run_summary.read().await.clone();
    context
        .write_snapshot(StageScope::RUN, SnapshotKeys::RUN_SUMMARY, &summary)
        .await?;

    println!("\n{}", summary.render_console());
    println!(
        "✅ 全部完成，总耗时 {:.2}秒",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

// Include tests
#[cfg(test)]
mod tests;
