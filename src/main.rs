use anyhow::Result;
use paper_wizard::utils::logging;
use paper_wizard::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置，第一个参数可以指定草稿文件
    let mut config = Config::from_env();
    if let Some(draft_file) = std::env::args().nth(1) {
        config.draft_file = draft_file;
    }

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
