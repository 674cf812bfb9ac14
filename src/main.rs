use clap::Parser;
use std::process::ExitCode;

use nocache_server::cli::Args;
use nocache_server::config::Config;
use nocache_server::error::StartupError;
use nocache_server::logger;
use nocache_server::server::Server;

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), StartupError> {
    let mut cfg = Config::load_from(&args.config)?;
    cfg.apply_args(args);
    cfg.validate()?;

    logger::init(&cfg.logging).map_err(StartupError::Logger)?;

    // Build the Tokio runtime, sizing worker threads from configuration
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build().map_err(StartupError::Runtime)?;

    runtime.block_on(async {
        let configured = cfg.socket_addr()?;
        let server = Server::bind(&cfg)?;
        let addr = server
            .local_addr()
            .map_err(|source| StartupError::Bind { addr: configured, source })?;
        logger::log_server_start(&addr, server.root(), &cfg.logging);
        server.run().await;
        Ok(())
    })
}
