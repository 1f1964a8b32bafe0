//! 实验目的提取服务 - 业务能力层
//!
//! 从一段粘贴的文本中找出所有实验的编号和目的。
//!
//! 提取策略按顺序排列，前一个失败才尝试下一个：
//! 1. `StructuredExtraction` - JSON Schema 约束输出，严格但并非所有模型都支持
//! 2. `FreeTextJsonExtraction` - 要求模型直接返回 JSON 文本，本地解析
//!
//! 全部失败时返回 `None`，由调用方提示"无法推断"。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::clients::TextGenerator;
use crate::error::LlmError;
use crate::models::{ExperimentItem, ExperimentList};
use crate::utils::truncate_text;

/// 一次提取请求
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRequest<'a> {
    /// 用户粘贴的原始文本
    pub text: &'a str,
    /// 用户附加的系统指令（可选）
    pub system_instruction: Option<&'a str>,
    pub subject: &'a str,
}

impl ExtractionRequest<'_> {
    fn instruction(&self) -> &str {
        self.system_instruction.map(str::trim).unwrap_or_default()
    }
}

/// 提取策略
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// 策略名称（用于日志）
    fn name(&self) -> &'static str;

    /// 返回至少一个有效条目，否则返回错误
    async fn extract(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<Vec<ExperimentItem>, LlmError>;
}

/// 提取成功的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedAims {
    pub items: Vec<ExperimentItem>,
    /// 成功的策略名称
    pub strategy: &'static str,
}

/// 结构化输出策略
pub struct StructuredExtraction {
    generator: Arc<dyn TextGenerator>,
}

impl StructuredExtraction {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    fn build_prompt(request: &ExtractionRequest<'_>) -> String {
        format!(
            "You are an AI assistant for the subject '{}'. {}\n\n\
             Analyze the following text and extract a list of experiments. \
             For each experiment return the number (integer) and a concise aim (string). \
             Return the result strictly in the structured JSON format defined by the schema.\n\n\
             Text:\n{}",
            request.subject,
            request.instruction(),
            request.text
        )
    }
}

#[async_trait]
impl ExtractionStrategy for StructuredExtraction {
    fn name(&self) -> &'static str {
        "structured"
    }

    async fn extract(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<Vec<ExperimentItem>, LlmError> {
        let prompt = Self::build_prompt(request);
        let value = self
            .generator
            .generate_structured(&prompt, "experiments", &ExperimentList::json_schema())
            .await?;

        let list: ExperimentList =
            serde_json::from_value(value).map_err(|e| LlmError::InvalidPayload {
                reason: format!("结构不符合 schema: {}", e),
            })?;

        non_empty(list.into_valid_items())
    }
}

/// 自由文本 JSON 策略
pub struct FreeTextJsonExtraction {
    generator: Arc<dyn TextGenerator>,
}

/// 模型有时直接返回数组而不是对象
#[derive(Deserialize)]
#[serde(untagged)]
enum LoosePayload {
    Object(ExperimentList),
    Array(Vec<ExperimentItem>),
}

impl FreeTextJsonExtraction {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    fn build_system_prompt(request: &ExtractionRequest<'_>) -> String {
        format!(
            "You are an AI assistant for the subject '{}'. \
             Your task is to analyze the provided text and extract the aims for each experiment. {}. \
             You must return a JSON object with a single key 'experiments' which is an array of objects, \
             where each object has 'number' and 'aim' keys.",
            request.subject,
            request.instruction()
        )
    }

    /// 解析模型返回的 JSON 文本，允许带着代码围栏
    ///
    /// JSON 里不会有合法的围栏，所以任何位置的围栏标记都直接去掉
    pub fn parse_response(raw: &str) -> Result<Vec<ExperimentItem>, LlmError> {
        let cleaned = raw.replace("```json", "").replace("```", "");
        let cleaned = cleaned.trim();
        let payload: LoosePayload =
            serde_json::from_str(cleaned).map_err(|e| LlmError::InvalidPayload {
                reason: format!("{} (响应: {})", e, truncate_text(cleaned, 120)),
            })?;

        let list = match payload {
            LoosePayload::Object(list) => list,
            LoosePayload::Array(experiments) => ExperimentList { experiments },
        };
        non_empty(list.into_valid_items())
    }
}

#[async_trait]
impl ExtractionStrategy for FreeTextJsonExtraction {
    fn name(&self) -> &'static str {
        "free-text-json"
    }

    async fn extract(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<Vec<ExperimentItem>, LlmError> {
        let system_prompt = Self::build_system_prompt(request);
        let raw = self.generator.generate(&system_prompt, request.text).await?;
        Self::parse_response(&raw)
    }
}

fn non_empty(items: Vec<ExperimentItem>) -> Result<Vec<ExperimentItem>, LlmError> {
    if items.is_empty() {
        Err(LlmError::InvalidPayload {
            reason: "没有找到有效的实验条目".to_string(),
        })
    } else {
        Ok(items)
    }
}

/// 实验目的提取服务
///
/// 职责：
/// - 按顺序尝试每个策略
/// - 吞掉所有策略错误，只记录日志
/// - 不写文件，不关心后续流程
pub struct AimExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl AimExtractor {
    /// 默认策略顺序：结构化输出 → 自由文本 JSON
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self::with_strategies(vec![
            Box::new(StructuredExtraction::new(generator.clone())),
            Box::new(FreeTextJsonExtraction::new(generator)),
        ])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// 依次尝试所有策略，全部失败时返回 `None`
    pub async fn extract(&self, request: &ExtractionRequest<'_>) -> Option<ExtractedAims> {
        debug!(
            "开始提取实验目的，文本长度: {} 字符，策略: {:?}",
            request.text.len(),
            self.strategy_names()
        );

        for (idx, strategy) in self.strategies.iter().enumerate() {
            match strategy.extract(request).await {
                Ok(items) => {
                    info!(
                        "✓ 策略 {} 提取到 {} 个实验",
                        strategy.name(),
                        items.len()
                    );
                    return Some(ExtractedAims {
                        items,
                        strategy: strategy.name(),
                    });
                }
                Err(e) if idx + 1 < self.strategies.len() => {
                    warn!("⚠️ 策略 {} 失败 ({})，尝试下一个策略", strategy.name(), e);
                }
                Err(e) => {
                    warn!("❌ 策略 {} 失败: {}", strategy.name(), e);
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_with_fence() {
        let raw = "```json\n{\"experiments\": [{\"number\": 2, \"aim\": \"Queue\"}, {\"number\": 1, \"aim\": \"Stack\"}]}\n```";
        let items = FreeTextJsonExtraction::parse_response(raw).unwrap();
        assert_eq!(
            items,
            vec![ExperimentItem::new(1, "Stack"), ExperimentItem::new(2, "Queue")]
        );
    }

    #[test]
    fn test_parse_response_with_inline_fence() {
        let raw = "```json{\"experiments\":[{\"number\":1,\"aim\":\"Linked list\"}]}```";
        let items = FreeTextJsonExtraction::parse_response(raw).unwrap();
        assert_eq!(items, vec![ExperimentItem::new(1, "Linked list")]);
    }

    #[test]
    fn test_parse_response_with_only_trailing_fence() {
        let raw = "{\"experiments\":[{\"number\":4,\"aim\":\"Heap sort\"}]}\n```";
        let items = FreeTextJsonExtraction::parse_response(raw).unwrap();
        assert_eq!(items, vec![ExperimentItem::new(4, "Heap sort")]);
    }

    #[test]
    fn test_parse_response_accepts_bare_array() {
        let raw = r#"[{"number": 3, "aim": "Binary search"}]"#;
        let items = FreeTextJsonExtraction::parse_response(raw).unwrap();
        assert_eq!(items, vec![ExperimentItem::new(3, "Binary search")]);
    }

    #[test]
    fn test_parse_response_rejects_garbage() {
        assert!(matches!(
            FreeTextJsonExtraction::parse_response("I could not find any experiments."),
            Err(LlmError::InvalidPayload { .. })
        ));
        assert!(matches!(
            FreeTextJsonExtraction::parse_response(r#"{"experiments": []}"#),
            Err(LlmError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_prompts_include_subject_and_instruction() {
        let request = ExtractionRequest {
            text: "Exp 1: measure g",
            system_instruction: Some("  Keep aims short "),
            subject: "Physics",
        };
        let structured = StructuredExtraction::build_prompt(&request);
        assert!(structured.contains("'Physics'"));
        assert!(structured.contains("Keep aims short"));
        assert!(structured.ends_with("Text:\nExp 1: measure g"));

        let free = FreeTextJsonExtraction::build_system_prompt(&request);
        assert!(free.contains("'experiments'"));
        assert!(free.contains("Keep aims short"));
    }
}
