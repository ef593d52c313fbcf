use std::env;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use ipset_blocker::config::Config;
use ipset_blocker::output::{OutputFormat, OutputHandler};
use ipset_blocker::{HttpIpSetStore, InvocationHandler};

/// Handles one detection event: reads it from the path given as the first
/// argument (stdin when absent) and blocks its attacker address.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config_path = env::var("IPSET_BLOCKER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));
    let config = Config::load_or_default(&config_path)?;

    let raw_event = match env::args().nth(1) {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    log::info!("Received event: {}", raw_event.trim());

    let store = Arc::new(HttpIpSetStore::new(&config.store)?);
    let handler = InvocationHandler::new(store);

    let mut output_handler = OutputHandler::new(
        OutputFormat::from_name(&config.output.format),
        config.output.file_path.clone(),
    )?;

    match handler.handle_json(&raw_event).await {
        Ok(Some(result)) => output_handler.write_result(&result)?,
        Ok(None) => output_handler.write_noop()?,
        Err(e) => {
            log::error!(
                "Invocation failed ({:?}, retryable: {}): {}",
                e.kind(),
                e.is_retryable(),
                e
            );
            return Err(e.into());
        }
    }

    output_handler.flush()?;
    Ok(())
}
