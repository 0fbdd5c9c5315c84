use chitchat::Backend;
use chitchat::core::config;
use clap::Parser;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;

#[derive(Parser)]
#[command(name = "chitchat", about = "Live group chat in the terminal")]
struct Args {
    /// Identity and storage backend (overrides config and CHITCHAT_BACKEND)
    #[arg(short, long, value_enum)]
    backend: Option<Backend>,

    /// Log level written to chitchat.log
    #[arg(long, default_value_t = LevelFilter::Debug)]
    log_level: LevelFilter,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to chitchat.log in current directory
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create("chitchat.log") {
        let _ = WriteLogger::init(args.log_level, log_config, log_file);
    }

    let file_config = config::load_config().unwrap_or_else(|e| {
        log::warn!("{}; falling back to defaults", e);
        config::ChitchatConfig::default()
    });
    let resolved = config::resolve(&file_config, args.backend);

    log::info!("chitchat starting up with backend: {:?}", resolved.backend);

    chitchat::tui::run(resolved)
}
