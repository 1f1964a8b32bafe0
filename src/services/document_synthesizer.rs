//! 文档合成服务 - 业务能力层
//!
//! 根据实验编号和目的生成完整的 Markdown 实验报告。
//! LLM 失败时退回固定骨架，对调用方永远返回可用的文档。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clients::{strip_code_fence, TextGenerator};
use crate::error::{AppError, AppResult, LlmError};
use crate::models::{markdown_path, ExperimentItem, LabDocument};
use crate::utils::truncate_text;

/// 文档合成服务
pub struct DocumentSynthesizer {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl DocumentSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator: Some(generator),
        }
    }

    /// 不调用 LLM，总是生成骨架
    pub fn offline() -> Self {
        Self { generator: None }
    }

    /// 合成一个实验文档，不会失败
    pub async fn synthesize(&self, item: &ExperimentItem, subject: &str) -> LabDocument {
        let Some(generator) = &self.generator else {
            debug!("未配置 LLM，实验 {} 使用骨架模板", item.number);
            return LabDocument::skeleton(item.number, &item.aim);
        };

        info!(
            "🤖 正在生成实验 {}: {}",
            item.number,
            truncate_text(&item.aim, 60)
        );

        match self.generate_body(generator.as_ref(), item, subject).await {
            Ok(body) => LabDocument::generated(item.number, body),
            Err(e) => {
                warn!(
                    "⚠️ 实验 {} AI 生成失败 ({})，改用骨架模板",
                    item.number, e
                );
                LabDocument::skeleton(item.number, &item.aim)
            }
        }
    }

    /// 合成文档并写入 `{output_dir}/Experiment {n}.md`，返回写入的路径
    pub async fn write_document(
        &self,
        item: &ExperimentItem,
        subject: &str,
        output_dir: &Path,
    ) -> AppResult<PathBuf> {
        let document = self.synthesize(item, subject).await;

        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| AppError::file(output_dir, e))?;

        let path = markdown_path(output_dir, item.number);
        tokio::fs::write(&path, &document.body)
            .await
            .map_err(|e| AppError::file(&path, e))?;

        info!(
            "✅ 已创建 Markdown 文件 ({}): {}",
            document.source,
            path.display()
        );
        Ok(path)
    }

    async fn generate_body(
        &self,
        generator: &dyn TextGenerator,
        item: &ExperimentItem,
        subject: &str,
    ) -> Result<String, LlmError> {
        let system_prompt = build_system_prompt(subject);
        let user_prompt = build_user_prompt(item);

        let raw = generator.generate(&system_prompt, &user_prompt).await?;
        let body = strip_code_fence(&raw);
        if body.is_empty() {
            return Err(LlmError::InvalidPayload {
                reason: "去掉代码围栏后内容为空".to_string(),
            });
        }
        Ok(body)
    }
}

fn build_system_prompt(subject: &str) -> String {
    format!(
        "You are an assistant that writes lab experiment markdown files for the subject '{}'. \
         Produce a clear, student-friendly Markdown document for a single experiment. \
         Include a top-level H1 title, an 'Aim' section, and a 'Program' section if the experiment involves code. \
         Keep headings in Markdown and keep the content concise but useful. \
         Return ONLY the Markdown content, do not surround it with backticks.",
        subject
    )
}

fn build_user_prompt(item: &ExperimentItem) -> String {
    format!(
        "Experiment {} — Aim: {}\n\nWrite the lab file.",
        item.number, item.aim
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value as JsonValue;
    use std::sync::Mutex;

    use crate::models::{DocumentSource, SKELETON_SECTIONS};

    /// 返回预设结果的假生成器
    struct ScriptedGenerator {
        reply: Result<String, ()>,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedGenerator {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
            self.prompts
                .lock()
                .unwrap()
                .push((system_prompt.to_string(), user_prompt.to_string()));
            self.reply.clone().map_err(|_| LlmError::EmptyContent {
                model: "scripted".to_string(),
            })
        }

        async fn generate_structured(
            &self,
            _prompt: &str,
            _schema_name: &str,
            _schema: &JsonValue,
        ) -> Result<JsonValue, LlmError> {
            unreachable!("synthesizer never asks for structured output")
        }
    }

    #[tokio::test]
    async fn test_generated_document() {
        let generator = ScriptedGenerator::replying("```markdown\n# Stacks\n\n## Aim\n\nPush and pop\n```");
        let synthesizer = DocumentSynthesizer::new(generator.clone());

        let doc = synthesizer
            .synthesize(&ExperimentItem::new(5, "Push and pop"), "Data Structures")
            .await;

        assert_eq!(doc.source, DocumentSource::Generated);
        assert_eq!(doc.body, "# Stacks\n\n## Aim\n\nPush and pop");

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].0.contains("'Data Structures'"));
        assert_eq!(prompts[0].1, "Experiment 5 — Aim: Push and pop\n\nWrite the lab file.");
    }

    #[tokio::test]
    async fn test_generation_failure_falls_back_to_skeleton() {
        let synthesizer = DocumentSynthesizer::new(ScriptedGenerator::failing());

        let doc = synthesizer
            .synthesize(&ExperimentItem::new(7, "Sort an array with quicksort"), "DSA")
            .await;

        assert_eq!(doc.source, DocumentSource::Skeleton);
        assert!(!doc.body.is_empty());
        assert!(doc.body.contains("Sort an array with quicksort"));
        for section in SKELETON_SECTIONS {
            assert!(doc.body.contains(section));
        }
    }

    #[tokio::test]
    async fn test_fence_only_reply_falls_back_to_skeleton() {
        let synthesizer = DocumentSynthesizer::new(ScriptedGenerator::replying("```\n```"));

        let doc = synthesizer.synthesize(&ExperimentItem::new(1, "aim"), "DSA").await;
        assert!(doc.is_skeleton());
    }

    #[tokio::test]
    async fn test_write_document_names_file_by_number() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested");
        let synthesizer = DocumentSynthesizer::offline();

        let path = synthesizer
            .write_document(&ExperimentItem::new(7, "Measure resistance"), "Physics", &out)
            .await
            .unwrap();

        assert_eq!(path, out.join("Experiment 7.md"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Experiment - 7\n"));
        assert!(content.contains("**Aim:** Measure resistance"));
    }

    #[tokio::test]
    async fn test_write_document_reports_unusable_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let err = DocumentSynthesizer::offline()
            .write_document(&ExperimentItem::new(1, "aim"), "DSA", &blocker)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::File { ref path, .. } if path == &blocker));
    }
}
