//! AquaRoute back-office server.
//!
//! ```bash
//! aquaroute-backoffice                       # config from AQUAROUTE_CONFIG or the platform dir
//! aquaroute-backoffice --config ./dev.toml
//! ```

use std::path::PathBuf;

#[tokio::main]
async fn main() {
    aquaroute_backoffice::init_tracing();

    let mut args = std::env::args().skip(1);
    let mut config_path: Option<PathBuf> = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => config_path = args.next().map(PathBuf::from),
            "--help" | "-h" => {
                println!("Usage: aquaroute-backoffice [--config <PATH>]");
                return;
            }
            other => tracing::warn!(arg = %other, "Ignoring unknown argument"),
        }
    }

    if let Err(e) = aquaroute_backoffice::run(config_path).await {
        tracing::error!(error = %e, "Back office stopped with an error");
        std::process::exit(1);
    }
}
