//! 实验条目与文件命名约定

use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SelectionError;

/// 单个实验：编号 + 实验目的
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentItem {
    /// 实验编号（正整数，同一批次内唯一）
    pub number: u32,
    /// 实验目的
    pub aim: String,
}

impl ExperimentItem {
    pub fn new(number: u32, aim: impl Into<String>) -> Self {
        Self {
            number,
            aim: aim.into(),
        }
    }

    /// 编号为正且目的非空
    pub fn is_valid(&self) -> bool {
        self.number > 0 && !self.aim.trim().is_empty()
    }
}

/// 提取结果的 JSON 结构：`{"experiments": [{"number": 1, "aim": "..."}]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentList {
    pub experiments: Vec<ExperimentItem>,
}

impl ExperimentList {
    /// 丢弃无效条目，同一编号只保留第一次出现，并按编号排序
    pub fn into_valid_items(self) -> Vec<ExperimentItem> {
        let mut seen = BTreeSet::new();
        let mut items: Vec<ExperimentItem> = self
            .experiments
            .into_iter()
            .filter(|item| item.is_valid())
            .filter(|item| seen.insert(item.number))
            .map(|item| ExperimentItem {
                aim: item.aim.trim().to_string(),
                ..item
            })
            .collect();
        items.sort_by_key(|item| item.number);
        items
    }

    /// 结构化输出使用的 JSON Schema
    pub fn json_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "experiments": {
                    "type": "array",
                    "description": "List of experiments",
                    "items": {
                        "type": "object",
                        "properties": {
                            "number": { "type": "integer", "description": "Experiment number" },
                            "aim": { "type": "string", "description": "Aim of the experiment" }
                        },
                        "required": ["number", "aim"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["experiments"],
            "additionalProperties": false
        })
    }
}

/// Markdown 源文件名，例如 `Experiment 7.md`
pub fn markdown_file_name(number: u32) -> String {
    format!("Experiment {}.md", number)
}

/// 转换后的文件名，例如 `experiment7.docx`
pub fn docx_file_name(number: u32) -> String {
    format!("experiment{}.docx", number)
}

pub fn markdown_path(dir: &Path, number: u32) -> PathBuf {
    dir.join(markdown_file_name(number))
}

pub fn docx_path(dir: &Path, number: u32) -> PathBuf {
    dir.join(docx_file_name(number))
}

/// 解析实验编号选择，例如 `8-12`、`3,5,7`、`1-4,6,8`
///
/// 返回去重并排序后的编号，空输入返回空列表
pub fn parse_selection(selection: &str) -> Result<Vec<u32>, SelectionError> {
    let compact: String = selection.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Ok(Vec::new());
    }

    let mut numbers = BTreeSet::new();
    for part in compact.split(',') {
        numbers.extend(parse_part(part)?);
    }

    Ok(numbers.into_iter().collect())
}

/// 解析连续范围 `A-B` 或单个编号 `N`
pub fn parse_range(range: &str) -> Result<RangeInclusive<u32>, SelectionError> {
    let compact: String = range.chars().filter(|c| !c.is_whitespace()).collect();
    parse_part(&compact)
}

fn parse_part(part: &str) -> Result<RangeInclusive<u32>, SelectionError> {
    let parse_number = |s: &str| -> Result<u32, SelectionError> {
        let n: i64 = s
            .parse()
            .map_err(|_| SelectionError::InvalidPart(part.to_string()))?;
        if n <= 0 {
            return Err(SelectionError::NotPositive(part.to_string()));
        }
        u32::try_from(n).map_err(|_| SelectionError::InvalidPart(part.to_string()))
    };

    match part.split_once('-') {
        // 负数没有意义，"-3" 视为无效片段
        Some(("", _)) => Err(SelectionError::InvalidPart(part.to_string())),
        Some((start, end)) => {
            let start = parse_number(start)?;
            let end = parse_number(end)?;
            if end < start {
                return Err(SelectionError::ReversedRange(part.to_string()));
            }
            Ok(start..=end)
        }
        None => {
            let n = parse_number(part)?;
            Ok(n..=n)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        assert_eq!(markdown_file_name(7), "Experiment 7.md");
        assert_eq!(docx_file_name(7), "experiment7.docx");
        assert_eq!(
            markdown_path(Path::new("/labs"), 12),
            PathBuf::from("/labs/Experiment 12.md")
        );
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("8-12").unwrap(), vec![8, 9, 10, 11, 12]);
        assert_eq!(parse_selection("3,5,7").unwrap(), vec![3, 5, 7]);
        assert_eq!(parse_selection("1-4, 6,8").unwrap(), vec![1, 2, 3, 4, 6, 8]);
        assert_eq!(parse_selection("10").unwrap(), vec![10]);
        assert_eq!(parse_selection("5,1-3,2").unwrap(), vec![1, 2, 3, 5]);
        assert!(parse_selection("  ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_selection_rejects_bad_input() {
        assert_eq!(
            parse_selection("0"),
            Err(SelectionError::NotPositive("0".to_string()))
        );
        assert_eq!(
            parse_selection("5-3"),
            Err(SelectionError::ReversedRange("5-3".to_string()))
        );
        assert_eq!(
            parse_selection("1,x"),
            Err(SelectionError::InvalidPart("x".to_string()))
        );
        assert!(parse_selection("-3").is_err());
        assert!(parse_selection("1,,2").is_err());
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("1-12").unwrap(), 1..=12);
        assert_eq!(parse_range("4").unwrap(), 4..=4);
        assert!(parse_range("3-1").is_err());
    }

    #[test]
    fn test_into_valid_items() {
        let list = ExperimentList {
            experiments: vec![
                ExperimentItem::new(3, "  Study stacks "),
                ExperimentItem::new(0, "invalid number"),
                ExperimentItem::new(1, "Study arrays"),
                ExperimentItem::new(2, "   "),
                ExperimentItem::new(3, "duplicate"),
            ],
        };

        assert_eq!(
            list.into_valid_items(),
            vec![
                ExperimentItem::new(1, "Study arrays"),
                ExperimentItem::new(3, "Study stacks"),
            ]
        );
    }

    #[test]
    fn test_deserialize_list() {
        let list: ExperimentList =
            serde_json::from_str(r#"{"experiments":[{"number":1,"aim":"Measure g"}]}"#).unwrap();
        assert_eq!(list.experiments, vec![ExperimentItem::new(1, "Measure g")]);
    }
}
