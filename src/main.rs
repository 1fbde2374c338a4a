//! # Data Server - Entry Point
//! src/main.rs

use dataserver::config::Config;
use dataserver::logging::init_logging;
use dataserver::server::Server;
use std::process;
use tracing::error;

fn main() {
    let config = Config::new();
    init_logging(config.level);

    if let Err(e) = config.validate().and_then(|_| config.validate_root()) {
        error!("invalid configuration: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    config.print_summary();

    let mut server = match Server::new(config) {
        Ok(server) => server,
        Err(e) => {
            error!("cannot start: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        error!("fatal server error: {}", e);
        process::exit(1);
    }
}
