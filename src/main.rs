use brrtcontainer::cli::{run_cli, Cli};
use brrtcontainer::logging::{init_logging_with_config, LogConfig};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut log_config = LogConfig::from_env();
    if std::env::var("BRRTC_LOG_LEVEL").is_err() {
        // Keep stdout readable for the printed response
        log_config.log_level = "warn".to_string();
    }
    init_logging_with_config(&log_config)?;
    run_cli(cli)
}
