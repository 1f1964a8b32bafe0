//! 实验文档

use std::fmt;

/// 文档内容的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSource {
    /// 由 LLM 生成
    Generated,
    /// LLM 不可用或失败时使用的固定骨架
    Skeleton,
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Generated => write!(f, "AI"),
            DocumentSource::Skeleton => write!(f, "骨架模板"),
        }
    }
}

/// 合成后的实验文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabDocument {
    pub number: u32,
    pub source: DocumentSource,
    /// Markdown 正文，保证非空
    pub body: String,
}

/// 骨架文档中的章节标题（按顺序）
pub const SKELETON_SECTIONS: &[&str] = &[
    "Theory",
    "Materials / Apparatus",
    "Procedure",
    "Observations",
    "Analysis",
    "Conclusion",
    "Program",
];

impl LabDocument {
    /// 根据编号和实验目的确定性地生成骨架文档
    pub fn skeleton(number: u32, aim: &str) -> Self {
        let body = format!(
            "# Experiment - {number}\n\
             \n\
             **Aim:** {aim}\n\
             \n\
             ## Theory\n\
             \n\
             *Add theory here.*\n\
             \n\
             ## Materials / Apparatus\n\
             \n\
             - ...\n\
             \n\
             ## Procedure\n\
             \n\
             1. ...\n\
             \n\
             ## Observations\n\
             \n\
             *Record your observations here.*\n\
             \n\
             ## Analysis\n\
             \n\
             *Add analysis here.*\n\
             \n\
             ## Conclusion\n\
             \n\
             *Add conclusion here.*\n\
             \n\
             ## Program\n\
             \n\
             ```\n\
             # Add program/code here if required\n\
             ```\n"
        );

        Self {
            number,
            source: DocumentSource::Skeleton,
            body,
        }
    }

    pub fn generated(number: u32, body: String) -> Self {
        Self {
            number,
            source: DocumentSource::Generated,
            body,
        }
    }

    pub fn is_skeleton(&self) -> bool {
        self.source == DocumentSource::Skeleton
    }
}
