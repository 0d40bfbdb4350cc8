//! TIRE - Turn-by-turn Indoor Routing Engine daemon

use std::env;
use std::path::Path;

use tire::config::Config;
use tire::engine::Engine;
use tire::error::Result;
use tire::hardware::create_hardware;
use tire::navigation::graph::NavigationGraph;
use tire::positioning::FingerprintLocalizer;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("TIRE v{} starting...", env!("CARGO_PKG_VERSION"));

    // Config path from args, or tire.toml, or built-in defaults
    let config = match env::args().nth(1) {
        Some(path) => {
            log::info!("Using config: {}", path);
            Config::load(&path)?
        }
        None if Path::new("tire.toml").exists() => {
            log::info!("Using config: tire.toml");
            Config::load("tire.toml")?
        }
        None => {
            log::info!("No config file, using defaults");
            Config::default()
        }
    };

    // Hardware bring-up is fatal on failure; the engine does not start
    let mut hardware = create_hardware(&config)?;
    hardware.initialize()?;
    log::info!("Hardware backend: {}", config.hardware.backend);

    let graph = NavigationGraph::load(&config.maps.graph_path)?;

    let mut localizer = FingerprintLocalizer::new(config.localizer.k);
    match &config.maps.radio_map_path {
        Some(path) => localizer.load_map(path)?,
        None => {
            log::warn!("No radio map configured, using placeholder hallway map");
            localizer.load_placeholder_map();
        }
    }

    let mut engine = Engine::new(config, hardware, graph, localizer);
    engine.run()
}
