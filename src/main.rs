mod config;
mod providers;
mod rate_limiter;
mod runner;
mod search_history;

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::{error, info};

use config::{BackendKind, InstanceConfig};
use providers::radarr::RadarrProvider;
use providers::sonarr::SonarrProvider;
use providers::SearchProvider;
use runner::InstanceRunner;

fn create_provider(instance: &InstanceConfig) -> Box<dyn SearchProvider> {
    match instance.kind {
        BackendKind::Sonarr => Box::new(SonarrProvider::new(instance.clone())),
        BackendKind::Radarr => Box::new(RadarrProvider::new(instance.clone())),
    }
}

fn run_all(runners: &mut [InstanceRunner]) {
    for runner in runners {
        runner.run();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Info);
    clog.init();

    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let data_dir = PathBuf::from(std::env::var("DATA_PATH").unwrap_or_else(|_| "data".to_string()));

    info!("Loading config from {}", config_path);
    let config = match config::load_config(Path::new(&config_path)) {
        Ok(config) => config,
        Err(err) => {
            error!("Fatal: {}", err);
            return Err(err.into());
        }
    };
    info!("Loaded {} instance(s)", config.instances.len());

    let mut runners: Vec<InstanceRunner> = config
        .instances
        .iter()
        .map(|instance| InstanceRunner::new(instance.clone(), create_provider(instance), &data_dir))
        .collect();

    if config.schedule.interval_minutes == 0 {
        info!("Running once (interval_minutes = 0)");
        run_all(&mut runners);
        info!("Done");
        return Ok(());
    }

    loop {
        run_all(&mut runners);
        info!(
            "Sleeping for {} minute(s)...",
            config.schedule.interval_minutes
        );
        thread::sleep(Duration::from_secs(config.schedule.interval_minutes * 60));
    }
}
