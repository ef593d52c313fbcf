use std::path::PathBuf;
use std::sync::Arc;
use structopt::StructOpt;

use ipset_blocker::config::{Config, TargetConfig};
use ipset_blocker::output::{OutputFormat, OutputHandler};
use ipset_blocker::store::{HttpIpSetStore, InMemoryIpSetStore, IpSetStore};
use ipset_blocker::{extract_attacker_address, DetectionEvent, InvocationHandler, Scope};

/// IP set blocker command line interface
#[derive(StructOpt, Debug)]
#[structopt(name = "ipset", about = "Block attacker addresses from detection findings")]
pub enum Cli {
    /// Handle one detection event
    Invoke {
        /// Path to the event JSON
        #[structopt(short, long)]
        event: PathBuf,
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
        /// IP set name (overrides IP_SET_NAME)
        #[structopt(long)]
        ip_set_name: Option<String>,
        /// Scope: REGIONAL or CLOUDFRONT (overrides WAF_SCOPE)
        #[structopt(long)]
        scope: Option<Scope>,
        /// Run against an in-memory IP set instead of the configured endpoint
        #[structopt(long)]
        local: bool,
        /// Addresses the in-memory IP set starts with (with --local)
        #[structopt(long)]
        seed: Vec<String>,
    },
    /// Generate a default configuration file
    Config {
        /// Output path for the configuration file
        #[structopt(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
    /// Show the attacker address extracted from an event file
    Extract {
        /// Path to the event JSON
        #[structopt(short, long)]
        event: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    match Cli::from_args() {
        Cli::Invoke {
            event,
            config,
            ip_set_name,
            scope,
            local,
            seed,
        } => {
            let config = Config::load_or_default(&config)?;
            let target = TargetConfig::with_overrides(ip_set_name, scope, |key| {
                std::env::var(key).ok()
            })?;

            let store: Arc<dyn IpSetStore> = if local {
                let memory = InMemoryIpSetStore::new();
                let seed: Vec<&str> = seed.iter().map(String::as_str).collect();
                memory.create_ip_set(&target.ip_set_name, target.scope, &seed);
                Arc::new(memory)
            } else {
                Arc::new(HttpIpSetStore::new(&config.store)?)
            };

            let raw = std::fs::read_to_string(&event)?;
            let detection = DetectionEvent::from_json_str(&raw)?;
            let handler = InvocationHandler::new(store);

            let mut output_handler = OutputHandler::new(
                OutputFormat::from_name(&config.output.format),
                config.output.file_path.clone(),
            )?;
            match handler.handle_for_target(&detection, &target).await? {
                Some(result) => output_handler.write_result(&result)?,
                None => println!("No attacker address in {:?}; nothing to do", event),
            }
            output_handler.flush()?;
        }
        Cli::Config { output } => {
            let config = Config::default();
            config.to_file(&output)?;
            println!("Default configuration written to: {:?}", output);
        }
        Cli::Extract { event } => {
            if !event.exists() {
                eprintln!("File not found: {:?}", event);
                std::process::exit(1);
            }

            let raw = std::fs::read_to_string(&event)?;
            let detection = DetectionEvent::from_json_str(&raw)?;
            match extract_attacker_address(&detection) {
                Some(address) => println!("{}", address),
                None => {
                    eprintln!("No attacker address in {:?}", event);
                    std::process::exit(2);
                }
            }
        }
    }

    Ok(())
}
