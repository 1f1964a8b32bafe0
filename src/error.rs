use std::path::PathBuf;

use thiserror::Error;

/// 应用程序错误类型
///
/// 各模块的错误类型在应用层直接转换为 `anyhow::Error`
#[derive(Debug, Error)]
pub enum AppError {
    /// 文件操作错误
    #[error("文件错误 ({}): {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 没有可用的 API 密钥
    #[error("缺少 API 密钥，请设置 LLM_API_KEY 或 GOOGLE_API_KEY")]
    MissingApiKey,
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 默认转换范围无效
    #[error("转换范围无效: CONVERT_FIRST ({first}) 大于 CONVERT_LAST ({last})")]
    InvalidConvertRange { first: u32, last: u32 },
    /// 配置文件读取失败
    #[error("无法读取配置文件 {path}: {source}")]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("无法解析配置文件 {path}: {source}")]
    TomlParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 构建请求失败
    #[error("构建 LLM 请求失败 (模型: {model}): {source}")]
    RequestBuildFailed {
        model: String,
        #[source]
        source: async_openai::error::OpenAIError,
    },
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}, 尝试 {attempts} 次): {source}")]
    ApiCallFailed {
        model: String,
        attempts: usize,
        #[source]
        source: async_openai::error::OpenAIError,
    },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 结构化输出不符合预期
    #[error("LLM返回的结构化数据无效: {reason}")]
    InvalidPayload { reason: String },
}

/// 文档转换错误
#[derive(Debug, Error)]
pub enum ConvertError {
    /// 转换程序不存在或无法启动
    #[error("无法启动转换程序 '{program}'，请确认已安装并在 PATH 中: {source}")]
    ToolUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// 转换程序运行但返回失败
    #[error("转换程序返回失败 (退出码: {code:?}): {stderr}")]
    Failed { code: Option<i32>, stderr: String },
    /// 与转换进程通信失败
    #[error("与转换进程通信失败: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// 是否是整批致命错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConvertError::ToolUnavailable { .. })
    }
}

/// 实验编号选择错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// 无法解析的片段
    #[error("无法解析的编号片段: '{0}'")]
    InvalidPart(String),
    /// 编号必须为正数
    #[error("实验编号必须大于 0: '{0}'")]
    NotPositive(String),
    /// 范围起点大于终点
    #[error("范围起点大于终点: '{0}'")]
    ReversedRange(String),
}

impl AppError {
    /// 创建文件错误
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::File {
            path: path.into(),
            source,
        }
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
