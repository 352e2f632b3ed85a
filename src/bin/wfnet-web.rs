use anyhow::Result;

use wfnet::config::{AnalysisConfig, DEFAULT_CONFIG_FILE};

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::var("WFNET_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("WFNET_LOG")
            .write_style("WFNET_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
    let config = AnalysisConfig::load_from_file(&path)?;
    log::debug!("config: {:?}", config);

    wfnet::server::serve(config).await
}
