use crate::config::{Config, LLMProvider};
use clap::Parser;
use std::path::PathBuf;

/// paperscope - 由Rust与AI驱动的文献调研流水线引擎
#[derive(Parser, Debug)]
#[command(name = "paperscope")]
#[command(
    about = "AI-based research survey pipeline. It collects academic papers from bibliographic search services, analyzes abstracts with LLMs, and renders citation networks, timelines and relevance reports."
)]
#[command(author = "Sopaco")]
#[command(version)]
pub struct Args {
    /// 报告输出路径
    #[arg(short, long, default_value = "./paperscope.report")]
    pub output_path: PathBuf,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 调研主题名称
    #[arg(short, long)]
    pub name: Option<String>,

    /// 是否跳过论文采集阶段
    #[arg(long)]
    pub skip_collect: bool,

    /// 是否跳过LLM分析阶段
    #[arg(long)]
    pub skip_analysis: bool,

    /// 是否跳过报告生成阶段
    #[arg(long)]
    pub skip_report: bool,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,

    /// 高能效模型，优先用于单篇论文的常规分析任务
    #[arg(long)]
    pub model_efficient: Option<String>,

    /// 高质量模型，用于跨论文综述，以及作为efficient失效情况下的兜底
    #[arg(long)]
    pub model_powerful: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 最大tokens数
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// 并发分析的论文数量上限
    #[arg(long)]
    pub max_parallels: Option<usize>,

    /// LLM Provider (openai, mistral, openrouter, anthropic, deepseek)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// 高相关论文子集的入选分数线（0-10）
    #[arg(long)]
    pub relevance_threshold: Option<f64>,

    /// 发表年份下限
    #[arg(long)]
    pub year_floor: Option<i32>,

    /// 是否禁用缓存
    #[arg(long)]
    pub no_cache: bool,

    /// 是否禁用LLM综述报告
    #[arg(long)]
    pub no_synthesis: bool,

    /// 强制重新执行（忽略已有阶段快照）
    #[arg(long)]
    pub force_regenerate: bool,
}

impl Args {
    /// 将CLI参数转换为配置，CLI参数优先级高于配置文件
    pub fn into_config(self) -> Config {
        let mut config = if let Some(config_path) = &self.config {
            // 如果显式指定了配置文件路径，从该路径加载
            Config::from_file(config_path)
                .unwrap_or_else(|_| panic!("⚠️ 警告: 无法读取配置文件 {:?}", config_path))
        } else {
            // 如果没有显式指定配置文件，尝试从默认位置加载
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| std::path::PathBuf::from("."))
                .join("paperscope.toml");

            if default_config_path.exists() {
                Config::from_file(&default_config_path).unwrap_or_else(|_| {
                    panic!("⚠️ 警告: 无法读取默认配置文件 {:?}", default_config_path)
                })
            } else {
                // 默认配置文件不存在，使用默认值
                Config::default()
            }
        };

        config.output_path = self.output_path;

        // 调研主题名称：CLI参数优先级最高
        if let Some(name) = self.name {
            config.survey_name = Some(name);
        }

        // 覆盖LLM配置
        if let Some(provider_str) = self.llm_provider {
            if let Ok(provider) = provider_str.parse::<LLMProvider>() {
                config.llm.provider = provider;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的provider: {}，使用默认provider",
                    provider_str
                );
            }
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(model_efficient) = self.model_efficient {
            config.llm.model_efficient = model_efficient;
        }
        if let Some(model_powerful) = self.model_powerful {
            config.llm.model_powerful = model_powerful;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }
        if let Some(max_parallels) = self.max_parallels {
            config.llm.max_parallels = max_parallels;
        }

        // 筛选配置
        if let Some(relevance_threshold) = self.relevance_threshold {
            config.relevance_threshold = relevance_threshold;
        }
        if let Some(year_floor) = self.year_floor {
            config.year_floor = Some(year_floor);
        }

        // 缓存配置
        if self.no_cache {
            config.cache.enabled = false;
        }
        if self.no_synthesis {
            config.llm_synthesis = false;
        }

        // 其他配置
        config.force_regenerate = self.force_regenerate;
        config.skip_collect = self.skip_collect;
        config.skip_analysis = self.skip_analysis;
        config.skip_report = self.skip_report;
        config.verbose = self.verbose;

        config
    }
}
