use anyhow::Result;
use clap::Parser;
use labgen::cli::Cli;
use labgen::{logger, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logger::init(cli.verbose || config.verbose_logging);

    App::new(config).run(cli.command).await
}
