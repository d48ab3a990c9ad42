use anyhow::{Context, Result, anyhow};
use std::fs;
use tokio::time::Instant;

use crate::pipeline::analyze::AnalyzedSet;
use crate::pipeline::context::PipelineContext;
use crate::staging::{SnapshotKeys, StageScope};

pub mod artifacts;

/// 执行报告生成阶段。
/// 每个产物独立生成，单个产物失败只记录不阻塞其他产物；
/// 输出目录不可写等本地IO问题则直接终止
pub async fn execute(context: &PipelineContext) -> Result<()> {
    let start_time = Instant::now();
    let config = &context.config;

    println!("🖊️ 开始报告生成阶段...");

    let analyzed: AnalyzedSet = context
        .read_snapshot(StageScope::ANALYZE, SnapshotKeys::ANALYZED)
        .await?
        .ok_or_else(|| anyhow!("找不到分析阶段快照，请先运行分析阶段"))?;

    // 报告永远可以从源数据重建，每次生成前清空输出目录
    let output_dir = &config.output_path;
    if output_dir.exists() {
        fs::remove_dir_all(output_dir)
            .context(format!("无法清空输出目录: {:?}", output_dir))?;
    }
    fs::create_dir_all(output_dir).context(format!("无法创建输出目录: {:?}", output_dir))?;

    let mut built: Vec<(&str, Result<String>)> = vec![
        (
            "citation_network.md",
            artifacts::citation_network::build(&analyzed),
        ),
        ("timeline.md", artifacts::timeline::build(&analyzed)),
        (
            "relevance_distribution.md",
            artifacts::distribution::build(&analyzed),
        ),
        (
            "summary.md",
            artifacts::summary::build(&analyzed, config.relevance_threshold),
        ),
    ];

    if config.llm_synthesis {
        built.push((
            "synthesis.md",
            artifacts::synthesis::build(context, &analyzed).await,
        ));
    }

    for (name, result) in built {
        match result {
            Ok(content) => {
                let path = output_dir.join(name);
                fs::write(&path, content).context(format!("无法写入产物文件: {:?}", path))?;
                println!("💾 已保存产物: {}", path.display());
                context
                    .run_summary
                    .write()
                    .await
                    .artifacts_written
                    .push(name.to_string());
            }
            Err(e) => {
                // 单个产物失败不影响其他产物
                eprintln!("⚠️ 产物 {} 生成失败: {}", name, e);
                context
                    .run_summary
                    .write()
                    .await
                    .artifacts_failed
                    .push(name.to_string());
            }
        }
    }

    println!(
        "✅ 报告生成完成，输出目录: {}，耗时 {:.2}秒",
        output_dir.display(),
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}
