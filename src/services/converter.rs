//! 文档转换器 - 基础设施能力
//!
//! 把 Markdown 文本交给外部转换程序（默认 pandoc）生成 DOCX

use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::ConvertError;

/// 文档转换能力
///
/// 编排层只依赖这个 trait，测试中可以替换成假的实现
pub trait DocumentConverter: Send + Sync {
    /// 把 `markdown` 转换后写到 `output`，`template` 作为样式参考文档
    fn convert(&self, markdown: &str, template: &Path, output: &Path) -> Result<(), ConvertError>;
}

/// 调用 pandoc 命令行
#[derive(Debug, Clone)]
pub struct PandocConverter {
    program: String,
}

impl PandocConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn build_command(&self, template: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(["--from", "markdown", "--to", "docx", "--no-highlight"])
            .arg("--reference-doc")
            .arg(template)
            .arg("--output")
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        command
    }
}

impl Default for PandocConverter {
    fn default() -> Self {
        Self::new("pandoc")
    }
}

impl DocumentConverter for PandocConverter {
    fn convert(&self, markdown: &str, template: &Path, output: &Path) -> Result<(), ConvertError> {
        debug!("运行 {} -> {}", self.program, output.display());

        let mut child = self
            .build_command(template, output)
            .spawn()
            .map_err(|source| ConvertError::ToolUnavailable {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = write_input(&mut stdin, markdown) {
                drop(stdin);
                let _ = child.kill();
                let _ = child.wait();
                return Err(e.into());
            }
        }

        let result = child.wait_with_output()?;
        if result.status.success() {
            Ok(())
        } else {
            Err(ConvertError::Failed {
                code: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            })
        }
    }
}

/// 写入 Markdown 并关闭输入
///
/// 进程提前退出时写入会断管，真实原因以退出码为准
fn write_input(stdin: &mut impl Write, markdown: &str) -> std::io::Result<()> {
    match stdin.write_all(markdown.as_bytes()) {
        Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_command_arguments() {
        let converter = PandocConverter::default();
        let command =
            converter.build_command(Path::new("template/template.docx"), Path::new("out/experiment1.docx"));

        assert_eq!(command.get_program(), "pandoc");
        let args: Vec<PathBuf> = command.get_args().map(PathBuf::from).collect();
        assert_eq!(
            args,
            [
                "--from",
                "markdown",
                "--to",
                "docx",
                "--no-highlight",
                "--reference-doc",
                "template/template.docx",
                "--output",
                "out/experiment1.docx",
            ]
            .iter()
            .map(PathBuf::from)
            .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_missing_program_is_fatal() {
        let converter = PandocConverter::new("labgen-no-such-converter-binary");
        let err = converter
            .convert("# x", Path::new("t.docx"), Path::new("o.docx"))
            .unwrap_err();

        assert!(err.is_fatal());
        assert!(matches!(err, ConvertError::ToolUnavailable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_not_fatal() {
        // `false` 忽略参数并以 1 退出
        let converter = PandocConverter::new("false");
        let err = converter
            .convert("# x", Path::new("t.docx"), Path::new("o.docx"))
            .unwrap_err();

        assert!(!err.is_fatal());
        assert!(matches!(err, ConvertError::Failed { code: Some(1), .. }));
    }

    /// 每次写入都返回指定错误
    struct FailingWriter(ErrorKind);

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(self.0))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_input_ignores_broken_pipe_only() {
        assert!(write_input(&mut FailingWriter(ErrorKind::BrokenPipe), "# x").is_ok());

        let err = write_input(&mut FailingWriter(ErrorKind::PermissionDenied), "# x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);

        let mut buf = Vec::new();
        write_input(&mut buf, "# Experiment - 1").unwrap();
        assert_eq!(buf, b"# Experiment - 1");
    }
}
