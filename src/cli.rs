//! 命令行参数

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "labgen", version, about = "Generate lab report files and convert them to DOCX")]
pub struct Cli {
    /// 显示详细日志
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Enter aims manually (one line per experiment on stdin) and generate Markdown files
    Generate(GenerateArgs),
    /// Let the AI deduce experiment aims from a pasted text blob
    Deduce(DeduceArgs),
    /// Convert existing Markdown files to DOCX
    Convert(ConvertArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SubjectArgs {
    /// Subject name, e.g. "Physics"
    #[arg(short, long)]
    pub subject: String,

    /// Directory for the Markdown files (default: {MD_ROOT_DIR}/{subject})
    #[arg(long)]
    pub md_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct OutputArgs {
    /// Directory for the DOCX files (default: {DOCX_ROOT_DIR}/{subject})
    #[arg(long)]
    pub docx_dir: Option<PathBuf>,

    /// Reference document used for styling
    #[arg(long)]
    pub template: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub subject: SubjectArgs,

    /// Experiment numbers, e.g. "8-12", "3,5,7" or "1-4,6,8"
    #[arg(long)]
    pub select: String,

    /// Skip the AI and write skeleton documents only
    #[arg(long)]
    pub offline: bool,

    /// Convert the generated files to DOCX afterwards
    #[arg(long)]
    pub convert: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct DeduceArgs {
    #[command(flatten)]
    pub subject: SubjectArgs,

    /// Extra system instruction for the AI
    #[arg(long)]
    pub instruction: Option<String>,

    /// Read the text blob from a file instead of stdin
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Generate Markdown files for the deduced experiments
    #[arg(long)]
    pub generate: bool,

    /// Convert the generated files to DOCX afterwards
    #[arg(long, requires = "generate")]
    pub convert: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub subject: SubjectArgs,

    /// Experiment range, e.g. "1-12" (default: CONVERT_FIRST-CONVERT_LAST)
    #[arg(long)]
    pub range: Option<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from([
            "labgen", "generate", "--subject", "Physics", "--select", "1-3", "--convert",
        ])
        .unwrap();

        match cli.command {
            Command::Generate(args) => {
                assert_eq!(args.subject.subject, "Physics");
                assert_eq!(args.select, "1-3");
                assert!(args.convert);
                assert!(!args.offline);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_deduce_convert_requires_generate() {
        let result = Cli::try_parse_from(["labgen", "deduce", "-s", "DSA", "--convert"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_convert_with_range() {
        let cli = Cli::try_parse_from([
            "labgen", "-v", "convert", "-s", "DSA", "--range", "2-5", "--template", "ref.docx",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Command::Convert(args) => {
                assert_eq!(args.range.as_deref(), Some("2-5"));
                assert_eq!(args.output.template, Some(PathBuf::from("ref.docx")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
