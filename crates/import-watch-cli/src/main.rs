mod commands;
mod logging;
mod progress;

use std::process;
use std::time::SystemTime;

use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, WindowArgs};
use dotenv::dotenv;
use import_watch_core::config::{self, AppConfig};
use import_watch_core::import::ImportOptions;
use import_watch_core::model::WatchTarget;
use import_watch_core::scanner::TimeWindow;
use import_watch_core::service::CliService;
use import_watch_core::ImportEngine;
use progress::CliReporter;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return;
    };

    let config = match config::load_configuration(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let result = match command {
        Commands::Run(window) => run(&config, &window),
        Commands::Scan(window) => scan(&config, &window),
        Commands::PrintConfig => {
            println!("Configuration: {:#?}", config);
            Ok(())
        }
    };

    // Only configuration problems change the exit status; per-file failures
    // are in the run log.
    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn window_for(config: &AppConfig, args: &WindowArgs) -> anyhow::Result<TimeWindow> {
    let hours = args.window_hours.unwrap_or(config.window_hours);
    Ok(TimeWindow::from_hours(SystemTime::now(), hours)?)
}

fn load_targets(config: &AppConfig) -> anyhow::Result<Vec<WatchTarget>> {
    let targets = config::load_watch_targets(&config.watch_list, &config.suffix_file)?;
    info!("Loaded {} watch targets from {}", targets.len(), config.watch_list.display());
    Ok(targets)
}

fn run(config: &AppConfig, args: &WindowArgs) -> anyhow::Result<()> {
    let admin = config.admin_credential()?;
    let settings = config.service_settings()?;
    let window = window_for(config, args)?;
    let targets = load_targets(config)?;

    let service = CliService::new(settings.clone());
    let engine = ImportEngine::new(&service, config.descriptor.clone(), &config.companion_glob)?
        .with_options(ImportOptions {
            depth: config.service.depth,
            parallel: config.service.parallel,
        });

    engine.run(&targets, &admin, &window, &CliReporter::new());
    Ok(())
}

fn scan(config: &AppConfig, args: &WindowArgs) -> anyhow::Result<()> {
    let window = window_for(config, args)?;
    let targets = load_targets(config)?;

    // Planning never contacts the service, so an unset host is fine here.
    let service = CliService::new(config.service.clone());
    let engine = ImportEngine::new(&service, config.descriptor.clone(), &config.companion_glob)?;

    for target in &targets {
        println!("{}", target.root.display().to_string().bold());
        let plan = match engine.plan(target, &window) {
            Ok(plan) => plan,
            Err(reason) => {
                println!("  {} {}", "skipped:".yellow(), reason);
                continue;
            }
        };
        for item in &plan.work {
            println!(
                "  {} {} as {} into {}",
                "import".green(),
                item.file.path.display(),
                item.identity.identity_name(),
                item.identity.container_id()
            );
        }
        for (set, identity) in &plan.companion_sets {
            if set.companions.is_empty() {
                println!("  {} {} (no companion yet)", "defer".yellow(), set.descriptor.display());
                continue;
            }
            for path in set.upload_order() {
                println!(
                    "  {} {} as {} on {}",
                    "annotate".cyan(),
                    path.display(),
                    identity.identity_name(),
                    identity.container_id()
                );
            }
        }
        for outcome in &plan.skipped {
            if let import_watch_core::OutcomeStatus::Skipped(reason) = &outcome.status {
                println!("  {} {}: {}", "skip".yellow(), outcome.path.display(), reason);
            }
        }
    }
    Ok(())
}
