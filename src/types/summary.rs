use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 采集阶段单个研究方向的统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaCollectStats {
    pub area: String,
    pub target_count: usize,
    pub collected: usize,
    /// 所有重试耗尽后仍然失败的(检索源, 关键词)查询数量
    pub failed_queries: usize,
}

/// 一次运行的汇总统计，结束时打印到控制台并写入阶段快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub survey_name: String,
    pub started_at: DateTime<Utc>,
    pub collect: Vec<AreaCollectStats>,
    pub analyzed: usize,
    pub unanalyzed: usize,
    pub artifacts_written: Vec<String>,
    pub artifacts_failed: Vec<String>,
}

impl RunSummary {
    pub fn new(survey_name: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            survey_name: survey_name.to_string(),
            started_at: Utc::now(),
            collect: Vec::new(),
            analyzed: 0,
            unanalyzed: 0,
            artifacts_written: Vec::new(),
            artifacts_failed: Vec::new(),
        }
    }

    /// 生成面向控制台的运行报告
    pub fn render_console(&self) -> String {
        let mut report = String::new();
        report.push_str(&format!("运行报告 [{}]\n", self.survey_name));

        if !self.collect.is_empty() {
            report.push_str("\n采集阶段:\n");
            for stats in &self.collect {
                let shortfall = if stats.collected < stats.target_count {
                    format!("（未达目标 {}）", stats.target_count)
                } else {
                    String::new()
                };
                report.push_str(&format!(
                    "- {}: 采集 {} 篇，失败查询 {} 个{}\n",
                    stats.area, stats.collected, stats.failed_queries, shortfall
                ));
            }
        }

        if self.analyzed + self.unanalyzed > 0 {
            report.push_str(&format!(
                "\n分析阶段: {} 篇已分析，{} 篇未分析\n",
                self.analyzed, self.unanalyzed
            ));
        }

        if !self.artifacts_written.is_empty() || !self.artifacts_failed.is_empty() {
            report.push_str(&format!(
                "\n报告阶段: 生成 {} 个产物",
                self.artifacts_written.len()
            ));
            if !self.artifacts_failed.is_empty() {
                report.push_str(&format!("，失败 {} 个", self.artifacts_failed.len()));
            }
            report.push('\n');
        }

        report
    }
}
