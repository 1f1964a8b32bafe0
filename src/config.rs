use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;

/// 默认的配置文件名（位于当前工作目录）
pub const CONFIG_FILE_NAME: &str = "labgen.toml";

/// Gemini 的 OpenAI 兼容端点
const GEMINI_OPENAI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// 程序配置
///
/// 加载顺序：默认值 → `labgen.toml`（或 `LABGEN_CONFIG` 指定的文件）→ 环境变量。
/// 命令行参数由编排层在此之后覆盖。
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: Option<String>,
    pub llm_api_base_url: String,
    /// 生成实验文档使用的模型
    pub llm_model_name: String,
    pub llm_temperature: f32,
    /// 从文本中提取实验目的使用的模型
    pub llm_extract_model_name: String,
    pub llm_extract_temperature: f32,
    /// 网络错误时的最大重试次数
    pub llm_max_retries: usize,
    // --- 转换配置 ---
    pub converter_program: String,
    pub template_file: PathBuf,
    /// Markdown 文件根目录，实际目录为 `{md_root_dir}/{科目}`
    pub md_root_dir: PathBuf,
    /// DOCX 文件根目录，实际目录为 `{docx_root_dir}/{科目}`
    pub docx_root_dir: PathBuf,
    pub convert_first: u32,
    pub convert_last: u32,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            llm_api_key: None,
            llm_api_base_url: GEMINI_OPENAI_BASE_URL.to_string(),
            llm_model_name: "gemini-2.5-pro".to_string(),
            llm_temperature: 1.0,
            llm_extract_model_name: "gemini-flash-latest".to_string(),
            llm_extract_temperature: 0.5,
            llm_max_retries: 2,
            converter_program: "pandoc".to_string(),
            template_file: PathBuf::from("template/template.docx"),
            md_root_dir: home.join("Documents"),
            docx_root_dir: home.join("college"),
            convert_first: 1,
            convert_last: 12,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 按默认顺序加载完整配置
    pub fn load() -> Result<Self, ConfigError> {
        // .env 不存在是正常情况
        let _ = dotenvy::dotenv();

        let path = std::env::var("LABGEN_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE_NAME));

        let base = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        base.with_env(|name| std::env::var(name).ok())
    }

    /// 从 TOML 文件加载，未出现的字段使用默认值
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
                path: path.to_path_buf(),
                source,
            })?;
        config.expand_paths();
        Ok(config)
    }

    /// 用环境变量覆盖当前配置
    ///
    /// `lookup` 返回变量值，便于测试时不修改进程环境
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("LLM_API_KEY").or_else(|| non_empty("GOOGLE_API_KEY")) {
            self.llm_api_key = Some(key);
        }
        if let Some(v) = non_empty("LLM_API_BASE_URL") {
            self.llm_api_base_url = v;
        }
        if let Some(v) = non_empty("LLM_MODEL_NAME") {
            self.llm_model_name = v;
        }
        if let Some(v) = non_empty("LLM_EXTRACT_MODEL_NAME") {
            self.llm_extract_model_name = v;
        }
        if let Some(v) = non_empty("LLM_MAX_RETRIES") {
            self.llm_max_retries = parse_var("LLM_MAX_RETRIES", &v, "usize")?;
        }
        if let Some(v) = non_empty("CONVERTER_PROGRAM") {
            self.converter_program = v;
        }
        if let Some(v) = non_empty("TEMPLATE_FILE") {
            self.template_file = PathBuf::from(v);
        }
        if let Some(v) = non_empty("MD_ROOT_DIR") {
            self.md_root_dir = PathBuf::from(v);
        }
        if let Some(v) = non_empty("DOCX_ROOT_DIR") {
            self.docx_root_dir = PathBuf::from(v);
        }
        if let Some(v) = non_empty("CONVERT_FIRST") {
            self.convert_first = parse_var("CONVERT_FIRST", &v, "u32")?;
        }
        if let Some(v) = non_empty("CONVERT_LAST") {
            self.convert_last = parse_var("CONVERT_LAST", &v, "u32")?;
        }
        if let Some(v) = non_empty("VERBOSE_LOGGING") {
            self.verbose_logging = parse_var("VERBOSE_LOGGING", &v, "bool")?;
        }

        self.validate()?;
        self.expand_paths();
        Ok(self)
    }

    /// 默认转换范围必须是从正数开始的非空范围
    fn validate(&self) -> Result<(), ConfigError> {
        if self.convert_first == 0 {
            return Err(ConfigError::EnvVarParseFailed {
                var_name: "CONVERT_FIRST".to_string(),
                value: "0".to_string(),
                expected_type: "正整数".to_string(),
            });
        }
        if self.convert_first > self.convert_last {
            return Err(ConfigError::InvalidConvertRange {
                first: self.convert_first,
                last: self.convert_last,
            });
        }
        Ok(())
    }

    /// 在任何远程调用之前确认存在 API 密钥
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.llm_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// 某个科目的 Markdown 默认目录
    pub fn md_dir_for(&self, subject: &str) -> PathBuf {
        self.md_root_dir.join(sanitize_subject(subject))
    }

    /// 某个科目的 DOCX 默认目录
    pub fn docx_dir_for(&self, subject: &str) -> PathBuf {
        self.docx_root_dir.join(sanitize_subject(subject))
    }

    fn expand_paths(&mut self) {
        self.template_file = expand_home(&self.template_file);
        self.md_root_dir = expand_home(&self.md_root_dir);
        self.docx_root_dir = expand_home(&self.docx_root_dir);
    }
}

fn parse_var<T: FromStr>(var_name: &str, value: &str, expected_type: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type: expected_type.to_string(),
        })
}

/// 展开路径开头的 `~`
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// 把科目名转换成可以安全用作目录名的形式
///
/// 空格变为 `_`，只保留 ASCII 字母数字、`_` 和 `-`，结果为空时返回 `subject`
pub fn sanitize_subject(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();

    if cleaned.is_empty() {
        "subject".to_string()
    } else {
        cleaned
    }
}
