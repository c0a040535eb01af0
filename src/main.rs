use std::error::Error;

use courier::config::TrainingConfig;
use courier::infra::{CompositeObserver, CsvObserver, DefaultObserver, TrainingObserver, persistence};
use courier::planners::Trainer;
use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_logging() -> Result<(), Box<dyn Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("courier=info,warn"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn build_observer(config: &TrainingConfig) -> Result<CompositeObserver, Box<dyn Error>> {
    let default: Box<dyn TrainingObserver + Send> = Box::new(DefaultObserver);
    let mut observer = CompositeObserver::new(vec![default]);
    if let Some(path) = &config.training_log_path {
        observer.push(Box::new(CsvObserver::create(path)?));
        info!("Writing training log to {}", path.display());
    }
    Ok(observer)
}

fn run(config: &TrainingConfig, observer: &mut dyn TrainingObserver) -> Result<(), Box<dyn Error>> {
    let mut trainer = Trainer::new(config.clone())?;

    if config.load_q_table
        && let Some(path) = &config.q_table_path
        && let Err(e) = persistence::load_q_table(path, trainer.planner_mut())
    {
        warn!("Could not load Q-table from {}: {}, starting fresh", path.display(), e);
    }

    let report = trainer.train(observer);

    if let Some(path) = &config.q_table_path {
        persistence::save_q_table(path, trainer.planner())?;
    }

    if config.demo && !report.closed {
        let summary = trainer.demo(observer);
        info!(
            "Demo {} in {} steps",
            if summary.success { "succeeded" } else { "failed" },
            summary.steps
        );
    }
    Ok(())
}

#[cfg(feature = "visualizer")]
fn run_with_visualizer(config: TrainingConfig) -> Result<(), Box<dyn Error>> {
    use courier::infra::{ControlSignal, Snapshot, VisualizingObserver};
    use courier::visualizer::run_visualizer;
    use std::sync::{Arc, Mutex, mpsc};

    let shared_state: Arc<Mutex<Option<Snapshot>>> = Arc::new(Mutex::new(None));
    let trainer_state = Arc::clone(&shared_state);
    let (signal_tx, signal_rx) = mpsc::channel();

    let trainer_config = config.clone();
    let handle = std::thread::spawn(move || -> Result<(), String> {
        let mut observer = build_observer(&trainer_config).map_err(|e| e.to_string())?;
        observer.push(Box::new(VisualizingObserver::new(trainer_state, signal_rx)));
        run(&trainer_config, &mut observer).map_err(|e| e.to_string())
    });

    run_visualizer(shared_state, signal_tx.clone());

    // Window closed: stop training after the current episode
    let _ = signal_tx.send(ControlSignal::Close);
    match handle.join() {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err("training thread panicked".into()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    init_logging()?;

    let config = TrainingConfig::from_env()?;
    info!("Visualizer enabled: {}", config.visualizer);

    #[cfg(feature = "visualizer")]
    if config.visualizer {
        return run_with_visualizer(config);
    }
    #[cfg(not(feature = "visualizer"))]
    if config.visualizer {
        warn!("Built without the `visualizer` feature, running headless");
    }

    let mut observer = build_observer(&config)?;
    run(&config, &mut observer)
}
