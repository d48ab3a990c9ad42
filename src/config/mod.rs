use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "moonshot")]
    Moonshot,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "mistral")]
    Mistral,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Moonshot => write!(f, "moonshot"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::Mistral => write!(f, "mistral"),
            LLMProvider::OpenRouter => write!(f, "openrouter"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Gemini => write!(f, "gemini"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "moonshot" => Ok(LLMProvider::Moonshot),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "mistral" => Ok(LLMProvider::Mistral),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "gemini" => Ok(LLMProvider::Gemini),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 单个研究方向的采集配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ResearchAreaConfig {
    /// 研究方向名称，同时作为论文的area标签
    pub name: String,

    /// 检索关键词列表
    pub keywords: Vec<String>,

    /// 该方向保留的论文目标数量
    pub target_count: usize,
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 调研主题名称
    pub survey_name: Option<String>,

    /// 研究方向列表
    pub research_areas: Vec<ResearchAreaConfig>,

    /// 报告输出路径
    pub output_path: PathBuf,

    /// 内部工作目录路径 (.paperscope)，缓存与各阶段快照都存放在这里
    pub internal_path: PathBuf,

    /// 高相关论文子集的入选分数线（0-10）
    pub relevance_threshold: f64,

    /// 发表年份下限，早于该年份的论文在采集阶段被过滤
    pub year_floor: Option<i32>,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 检索服务配置
    pub search: SearchConfig,

    /// 缓存配置
    pub cache: CacheConfig,

    /// 强制重新执行（忽略已有阶段快照）
    pub force_regenerate: bool,

    /// 跳过论文采集阶段
    pub skip_collect: bool,

    /// 跳过LLM分析阶段
    pub skip_analysis: bool,

    /// 跳过报告生成阶段
    pub skip_report: bool,

    /// 是否生成LLM综述报告（synthesis产物）
    pub llm_synthesis: bool,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址
    pub api_base_url: String,

    /// 高能效模型，优先用于单篇论文的常规分析任务
    pub model_efficient: String,

    /// 高质量模型，用于跨论文综述，以及作为efficient失效情况下的兜底
    pub model_powerful: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 重试次数
    pub retry_attempts: u32,

    /// 重试基础间隔（毫秒），实际间隔按尝试次数指数增长
    pub retry_delay_ms: u64,

    /// 超时时间（秒）
    pub timeout_seconds: u64,

    /// 并发分析的论文数量上限
    pub max_parallels: usize,
}

/// 检索服务配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    /// 单页请求的论文数量
    pub page_size: usize,

    /// 每分钟允许发出的检索请求数（速率预算）
    pub requests_per_minute: u32,

    /// 单个请求的重试次数上限
    pub retry_attempts: u32,

    /// 重试基础间隔（毫秒），实际间隔按尝试次数指数增长
    pub retry_base_delay_ms: u64,

    /// 单个请求的超时时间（秒）
    pub timeout_seconds: u64,

    /// 同时在途的检索查询数量上限
    pub max_concurrent_queries: usize,

    /// 是否启用Semantic Scholar检索源
    pub enable_semantic_scholar: bool,

    /// 是否启用arXiv检索源
    pub enable_arxiv: bool,

    /// Semantic Scholar API基地址
    pub semantic_scholar_api_base: String,

    /// Semantic Scholar API KEY（可选，用于更高速率限额）
    pub semantic_scholar_api_key: Option<String>,

    /// arXiv API基地址
    pub arxiv_api_base: String,
}

/// 缓存配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// 是否启用缓存
    pub enabled: bool,

    /// 缓存目录
    pub cache_dir: PathBuf,

    /// 缓存过期时间（小时）。过期条目按未命中处理，但文件不会被删除
    pub expire_hours: u64,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 获取调研主题名称，优先使用配置的survey_name，否则取第一个研究方向的名称
    pub fn get_survey_name(&self) -> String {
        if let Some(ref name) = self.survey_name
            && !name.trim().is_empty()
        {
            return name.clone();
        }

        self.research_areas
            .first()
            .map(|area| area.name.clone())
            .unwrap_or_else(|| "paperscope survey".to_string())
    }

    /// 校验配置的合法性。配置错误属于环境级问题，直接终止运行
    pub fn validate(&self) -> Result<()> {
        if self.research_areas.is_empty() {
            bail!("配置中没有任何研究方向（research_areas为空）");
        }
        for area in &self.research_areas {
            if area.name.trim().is_empty() {
                bail!("存在未命名的研究方向");
            }
            if area.keywords.is_empty() {
                bail!("研究方向 {} 的关键词列表为空", area.name);
            }
            if area.target_count == 0 {
                bail!("研究方向 {} 的目标论文数必须大于0", area.name);
            }
        }
        if !(0.0..=10.0).contains(&self.relevance_threshold) {
            bail!(
                "relevance_threshold必须在0-10之间，当前为 {}",
                self.relevance_threshold
            );
        }
        Ok(())
    }

    /// 阶段快照的根目录
    pub fn staging_dir(&self) -> PathBuf {
        self.internal_path.join("staging")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            survey_name: None,
            research_areas: vec![],
            output_path: PathBuf::from("./paperscope.report"),
            internal_path: PathBuf::from("./.paperscope"),
            relevance_threshold: 7.0,
            year_floor: None,
            llm: LLMConfig::default(),
            search: SearchConfig::default(),
            cache: CacheConfig::default(),
            force_regenerate: false,
            skip_collect: false,
            skip_analysis: false,
            skip_report: false,
            llm_synthesis: true,
            verbose: false,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: std::env::var("PAPERSCOPE_LLM_API_KEY").unwrap_or_default(),
            api_base_url: String::from("https://api-inference.modelscope.cn/v1"),
            model_efficient: String::from("Qwen/Qwen3-Next-80B-A3B-Instruct"),
            model_powerful: String::from("Qwen/Qwen3-235B-A22B-Instruct-2507"),
            max_tokens: 8192,
            temperature: 0.3,
            retry_attempts: 5,
            retry_delay_ms: 2000,
            timeout_seconds: 300,
            max_parallels: 3,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            requests_per_minute: 30,
            retry_attempts: 5,
            retry_base_delay_ms: 1000,
            timeout_seconds: 30,
            max_concurrent_queries: 4,
            enable_semantic_scholar: true,
            enable_arxiv: true,
            semantic_scholar_api_base: String::from("https://api.semanticscholar.org/graph/v1"),
            semantic_scholar_api_key: std::env::var("PAPERSCOPE_S2_API_KEY").ok(),
            arxiv_api_base: String::from("http://export.arxiv.org/api/query"),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: PathBuf::from(".paperscope/cache"),
            expire_hours: 8760,
        }
    }
}
