//! 文档清理 - 业务能力层
//!
//! 转换前删除已知的样板文字，并在开头插入实验标题

/// 默认删除的样板文字
pub const DEFAULT_DENY_LIST: &[&str] = &[
    "**Description and definitions:**",
    "### **How certain keywords are used in the above example**",
];

/// 文档清理器
#[derive(Debug, Clone)]
pub struct Cleanup {
    deny_list: Vec<String>,
}

impl Default for Cleanup {
    fn default() -> Self {
        Self::new(DEFAULT_DENY_LIST.iter().copied())
    }
}

impl Cleanup {
    /// 空字符串会被忽略
    pub fn new<I, S>(deny_list: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            deny_list: deny_list
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        }
    }

    pub fn deny_list(&self) -> &[String] {
        &self.deny_list
    }

    /// 删除所有样板文字（匹配任意位置，不限于行首）
    ///
    /// 删除后拼接出的新匹配也会被删掉，结果中不再包含任何样板文字
    pub fn remove_boilerplate(&self, content: &str) -> String {
        let mut current = content.to_string();
        loop {
            let next = self
                .deny_list
                .iter()
                .fold(current.clone(), |acc, needle| acc.replace(needle.as_str(), ""));
            if next == current {
                return current;
            }
            current = next;
        }
    }

    /// 清理后加上 `# Experiment - {n}` 标题和一个空行
    pub fn prepare(&self, number: u32, content: &str) -> String {
        format!("{}{}", heading(number), self.remove_boilerplate(content))
    }
}

/// 插入到文档开头的标题
pub fn heading(number: u32) -> String {
    format!("# Experiment - {}\n\n", number)
}
