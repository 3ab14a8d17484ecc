mod cli;
mod error_fmt;
mod logging;
mod run;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use cli::{Cli, Commands, JSON_MODE};
use geofix_core::EngineCfg;
use geofix_sim::SimParams;

fn load_config(cli: &Cli) -> eyre::Result<geofix_config::Config> {
    let cfg = match cli.config.as_deref() {
        Some(path) => geofix_config::load_toml_file(path)?,
        None => geofix_config::Config::default(),
    };
    cfg.validate()?;
    Ok(cfg)
}

fn dispatch(cli: Cli, cfg: &geofix_config::Config) -> eyre::Result<()> {
    let engine_cfg = EngineCfg::from(cfg);
    match cli.cmd {
        Commands::Replay { trace, no_drain } => {
            run::run_replay(&engine_cfg, &trace, !no_drain, cli.json)
        }
        Commands::Simulate {
            max_wait_ms,
            fail_start,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                tracing::warn!(error = %e, "failed to install Ctrl-C handler");
            }
            run::run_simulate(
                &engine_cfg,
                SimParams::from(&cfg.simulation),
                max_wait_ms,
                fail_start,
                cli.json,
                shutdown,
            )
        }
        Commands::CheckConfig => {
            run::run_check_config(&engine_cfg, cli.json);
            Ok(())
        }
        Commands::SelfCheck => {
            run::run_self_check(&engine_cfg, SimParams::from(&cfg.simulation), cli.json)
        }
    }
}

fn try_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli)?;
    let level = cli
        .log_level
        .clone()
        .or_else(|| cfg.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    logging::init(&level, cli.json, &cfg.logging)?;
    tracing::debug!(config = ?cli.config, %level, "geofix starting");
    dispatch(cli, &cfg)
}

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporter: {e}");
    }

    if let Err(err) = try_main(cli) {
        let code = error_fmt::exit_code_for_error(&err);
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", error_fmt::format_error_json(&err));
        } else {
            eprintln!("{}", error_fmt::humanize(&err));
        }
        std::process::exit(code);
    }
}
