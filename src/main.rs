//! Ghostshell command line
//!
//! Exercises the shell core from a terminal: resolve and decode addresses,
//! discover a relay transport, and seal candidate lists for publishing.

use std::env;
use std::process;
use std::sync::Arc;

use ghostshell::config::{DiscoveryConfig, RouterConfig};
use ghostshell::storage::JsonFileStore;
use ghostshell::transport::{open_list, seal_list};
use ghostshell::utils::SystemClock;
use ghostshell::{NAME, Resolution, Router, ShellOptions, TransportDiscovery, VERSION};
use ring::rand::{SecureRandom, SystemRandom};

const USAGE: &str = "usage:
  ghostshell resolve <input>              resolve typed input to a request url
  ghostshell decode <url>                 decode a request url to its address
  ghostshell discover <list-url>...       find a reachable relay transport
  ghostshell seal <passphrase> <ws-url>... seal a candidate list as JSON

environment:
  GHOSTSHELL_OPTIONS  path of a JSON options store (optional)
  RUST_LOG            log filter, e.g. ghostshell=debug";

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        println!("{} v{}\n\n{}", NAME, VERSION, USAGE);
        return;
    };

    let outcome = match command.as_str() {
        "resolve" => resolve(rest),
        "decode" => decode(rest),
        "discover" => discover(rest).await,
        "seal" => seal(rest),
        "--version" | "-V" => {
            println!("{} {}", NAME, VERSION);
            Ok(())
        }
        _ => Err(USAGE.to_string()),
    };

    if let Err(message) = outcome {
        eprintln!("{}", message);
        process::exit(2);
    }
}

fn load_options() -> ShellOptions {
    match env::var("GHOSTSHELL_OPTIONS") {
        Ok(path) => match JsonFileStore::open(&path) {
            Ok(store) => ShellOptions::load(&store),
            Err(e) => {
                log::warn!("cannot open options store {}: {}", path, e);
                ShellOptions::default()
            }
        },
        Err(_) => ShellOptions::default(),
    }
}

fn router() -> Router {
    Router::new(RouterConfig::default(), load_options(), Arc::new(SystemClock))
}

fn resolve(args: &[String]) -> Result<(), String> {
    let input = args.join(" ");
    match router().resolve(&input) {
        Resolution::NewTab => println!("new tab"),
        Resolution::Internal { route, path } => println!("{}\t{}", route.display(), path),
        Resolution::Passthrough(url) => println!("passthrough\t{}", url),
        Resolution::Relayed {
            literal,
            backend,
            request,
        } => println!("{}\t{}\t{}", backend.as_str(), literal, request),
        Resolution::Unknown(raw) => return Err(format!("unknown route: {}", raw)),
    }
    Ok(())
}

fn decode(args: &[String]) -> Result<(), String> {
    let [url] = args else {
        return Err(USAGE.to_string());
    };
    println!("{}", router().decode(url));
    Ok(())
}

async fn discover(args: &[String]) -> Result<(), String> {
    if args.is_empty() {
        return Err(USAGE.to_string());
    }
    let list_urls: Vec<&str> = args.iter().map(String::as_str).collect();
    let discovery = TransportDiscovery::new(DiscoveryConfig::default());
    let endpoint = discovery
        .resolve(&load_options(), &list_urls)
        .await
        .map_err(|e| e.to_string())?;
    println!("{}", endpoint);
    Ok(())
}

fn seal(args: &[String]) -> Result<(), String> {
    let Some((passphrase, endpoints)) = args.split_first() else {
        return Err(USAGE.to_string());
    };
    if endpoints.is_empty() {
        return Err(USAGE.to_string());
    }

    let rng = SystemRandom::new();
    let mut salt = [0u8; 16];
    let mut iv = [0u8; 12];
    rng.fill(&mut salt)
        .and_then(|_| rng.fill(&mut iv))
        .map_err(|_| "random source unavailable".to_string())?;

    let config = DiscoveryConfig::default();
    let sealed = seal_list(endpoints, passphrase, config.pbkdf2_iterations, &salt, iv)
        .map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(&sealed).map_err(|e| e.to_string())?;

    // Make sure the list opens before handing it out
    open_list(&sealed, passphrase, config.pbkdf2_iterations).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}
