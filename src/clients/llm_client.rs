//! LLM API 客户端
//!
//! 封装所有与远程文本生成服务的调用
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（默认是 Gemini 的兼容端点）

use std::sync::LazyLock;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value as JsonValue;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::utils::logging::truncate_text;

/// 网络错误重试前的等待时间
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// 文本生成能力
///
/// 服务层只依赖这个 trait，测试中可以替换成假的实现
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// 发送 system + user 两条消息，返回去掉首尾代码围栏后的文本
    ///
    /// 空内容视为失败
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError>;

    /// 按 JSON Schema 约束输出，返回解析后的 JSON
    async fn generate_structured(
        &self,
        prompt: &str,
        schema_name: &str,
        schema: &JsonValue,
    ) -> Result<JsonValue, LlmError>;
}

/// LLM 客户端
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    max_retries: usize,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(
        api_key: &str,
        api_base_url: &str,
        model_name: impl Into<String>,
        temperature: f32,
        max_retries: usize,
    ) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: model_name.into(),
            temperature,
            max_retries,
        }
    }

    fn build_request(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        response_format: Option<ResponseFormat>,
    ) -> Result<CreateChatCompletionRequest, LlmError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature);
        if let Some(format) = response_format {
            args.response_format(format);
        }
        args.build().map_err(|source| self.build_failed(source))
    }

    fn build_failed(&self, source: OpenAIError) -> LlmError {
        LlmError::RequestBuildFailed {
            model: self.model_name.clone(),
            source,
        }
    }

    /// 发送请求，网络层错误最多重试 `max_retries` 次
    async fn send(&self, request: CreateChatCompletionRequest) -> Result<String, LlmError> {
        let mut attempt = 0;
        let response = loop {
            attempt += 1;
            debug!("调用 LLM API，模型: {} (第 {} 次)", self.model_name, attempt);

            match self.client.chat().create(request.clone()).await {
                Ok(response) => break response,
                Err(e) if should_retry(attempt, self.max_retries, is_transient(&e)) => {
                    warn!(
                        "LLM 网络错误 (尝试 {}/{}), {} 秒后重试: {}",
                        attempt,
                        self.max_retries + 1,
                        RETRY_DELAY.as_secs(),
                        e
                    );
                    sleep(RETRY_DELAY).await;
                }
                Err(source) => {
                    warn!("LLM API 调用失败: {}", source);
                    return Err(LlmError::ApiCallFailed {
                        model: self.model_name.clone(),
                        attempts: attempt,
                        source,
                    });
                }
            }
        };

        debug!("LLM API 调用成功");

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        debug!("用户消息长度: {} 字符", user_prompt.len());

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt)
            .build()
            .map_err(|e| self.build_failed(e))?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_prompt)
            .build()
            .map_err(|e| self.build_failed(e))?;

        let request = self.build_request(
            vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ],
            None,
        )?;

        let content = strip_code_fence(&self.send(request).await?);
        if content.is_empty() {
            return Err(LlmError::EmptyContent {
                model: self.model_name.clone(),
            });
        }
        Ok(content)
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        schema_name: &str,
        schema: &JsonValue,
    ) -> Result<JsonValue, LlmError> {
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| self.build_failed(e))?;

        let format = ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: None,
                name: schema_name.to_string(),
                schema: Some(schema.clone()),
                strict: Some(true),
            },
        };

        let request =
            self.build_request(vec![ChatCompletionRequestMessage::User(user_msg)], Some(format))?;
        let content = self.send(request).await?;

        serde_json::from_str(&content).map_err(|e| LlmError::InvalidPayload {
            reason: format!("{} (响应: {})", e, truncate_text(&content, 120)),
        })
    }
}

/// 只有传输层错误会重试
fn is_transient(err: &OpenAIError) -> bool {
    matches!(err, OpenAIError::Reqwest(_))
}

/// 第 `attempt` 次调用失败后是否再试一次（总调用次数最多 `max_retries + 1`）
fn should_retry(attempt: usize, max_retries: usize, transient: bool) -> bool {
    transient && attempt <= max_retries
}

static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*[ \t]*(\r?\n|$)").unwrap());
static CLOSING_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(^|\n)```[ \t]*$").unwrap());

/// 去掉包裹整段文本的代码围栏（可带语言标记），正文中的代码块保持不变
///
/// 只有开头存在围栏时才去掉结尾的围栏，以免破坏以代码块结尾的文档
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if !OPENING_FENCE.is_match(trimmed) {
        return trimmed.to_string();
    }
    let without_open = OPENING_FENCE.replace(trimmed, "");
    let without_close = CLOSING_FENCE.replace(without_open.trim_end(), "");
    without_close.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence_with_language_tag() {
        let raw = "```markdown\n# Experiment 1\n\nBody\n```";
        assert_eq!(strip_code_fence(raw), "# Experiment 1\n\nBody");
    }

    #[test]
    fn test_strip_code_fence_json() {
        let raw = "  ```json\n{\"experiments\": []}\n```  \n";
        assert_eq!(strip_code_fence(raw), "{\"experiments\": []}");
    }

    #[test]
    fn test_strip_code_fence_without_fence() {
        assert_eq!(strip_code_fence("  plain text \n"), "plain text");
    }

    #[test]
    fn test_strip_code_fence_keeps_inner_blocks() {
        let raw = "# Title\n\n## Program\n\n```c\nint main() {}\n```\n\nDone.";
        assert_eq!(strip_code_fence(raw), raw);
    }

    #[test]
    fn test_strip_code_fence_keeps_trailing_program_block() {
        let raw = "# Title\n\n## Program\n\n```python\nprint(1)\n```";
        assert_eq!(strip_code_fence(raw), raw);
    }

    #[test]
    fn test_strip_code_fence_only_fences() {
        assert_eq!(strip_code_fence("```\n```"), "");
        assert_eq!(strip_code_fence("```"), "");
    }

    #[test]
    fn test_should_retry_limits_attempts() {
        assert!(should_retry(1, 2, true));
        assert!(should_retry(2, 2, true));
        assert!(!should_retry(3, 2, true));
        assert!(!should_retry(1, 0, true));
        assert!(!should_retry(1, 2, false));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_retried() {
        // 本机 1 号端口没有服务，连接会被拒绝
        let client = LlmClient::new("test-key", "http://127.0.0.1:1/v1", "test-model", 0.5, 1);

        let err = client.generate("system", "user").await.unwrap_err();

        match err {
            LlmError::ApiCallFailed { attempts, model, .. } => {
                assert_eq!(attempts, 2);
                assert_eq!(model, "test-model");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    /// 测试真实的 LLM 调用
    ///
    /// 运行方式：
    /// ```bash
    /// LLM_API_KEY=... cargo test test_generate_live -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_generate_live() {
        let _ = tracing_subscriber::fmt::try_init();

        let config = crate::config::Config::load().unwrap();
        let client = LlmClient::new(
            config.require_api_key().unwrap(),
            &config.llm_api_base_url,
            &config.llm_extract_model_name,
            config.llm_extract_temperature,
            config.llm_max_retries,
        );

        let response = client
            .generate("You are a concise assistant.", "Say hello in one word.")
            .await
            .unwrap();
        println!("LLM 响应: {}", response);
        assert!(!response.is_empty());
    }
}
