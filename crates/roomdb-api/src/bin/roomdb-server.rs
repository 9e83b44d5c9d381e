//! Serve a room database over TCP.
//!
//! Usage: `roomdb-server [config.yaml]`
//!
//! Without an argument the defaults are used (`rooms.db` in the working
//! directory, `127.0.0.1:1099`).

use roomdb::logging::LogConfig;
use roomdb::{Data, RemoteConfig, RemoteServer, Result, ServerConfig};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

fn main() -> ExitCode {
    let config = match std::env::args_os().nth(1) {
        Some(path) => match ServerConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("roomdb-server: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => ServerConfig::default(),
    };

    let mut log = LogConfig::default().with_level(config.log_level.clone());
    if let Some(file) = &config.log_file {
        log = log.with_both(file);
    }
    let _guard = match log.init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("roomdb-server: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &ServerConfig) -> Result<()> {
    config.validate()?;
    let addr = config.socket_addr()?;

    let data = Data::open_with_config(&config.database_path, config.data_config())?;
    info!(
        path = %config.database_path.display(),
        records = data.record_count()?,
        "Opened database"
    );

    let remote = RemoteConfig {
        read_timeout: config.read_timeout(),
    };
    RemoteServer::bind(addr, Arc::new(data))?
        .with_config(remote)
        .serve()
}
