use clap::Parser;
use pollution_grid_core::core_types::Degrees;
use pollution_grid_core::ingest::write_table;
use pollution_grid_core::{
    load_observations, load_raw_readings, prepare_observations, ObservationTable,
    PipelineConfig, PipelineOutcome, PipelineReport, PipelineResult, PollutionPipeline, Scenario,
    WindConditions,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Air quality analysis over monitoring station data
#[derive(Parser, Debug)]
#[command(name = "pollution-grid-demo")]
#[command(about = "Pollution severity, spread and alert analysis", long_about = None)]
struct Args {
    /// Raw long-format station readings (CSV)
    #[arg(short, long, conflicts_with = "observations", required_unless_present = "observations")]
    readings: Option<PathBuf>,

    /// Cleaned wide-format observations (CSV)
    #[arg(short, long)]
    observations: Option<PathBuf>,

    /// Pipeline configuration (JSON); command-line wind and intensity override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Wind direction in degrees (0=East, 90=North)
    #[arg(long, default_value_t = 90.0)]
    wind_direction: f64,

    /// Wind strength (0-1)
    #[arg(long, default_value_t = 0.3)]
    wind_strength: f64,

    /// Spread intensity factor
    #[arg(long, default_value_t = 0.2)]
    intensity: f64,

    /// Scenario (normal, industrial-surge, high-wind-spread, emergency-containment)
    #[arg(short, long, default_value = "normal")]
    scenario: String,

    /// Only analyse this state
    #[arg(long)]
    state: Option<String>,

    /// Seed for the volatility draws
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Write the enriched table to this CSV file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Print the full report as JSON instead of tables
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> PipelineResult<()> {
    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    }
    .with_wind(WindConditions::new(
        Degrees::new(args.wind_direction),
        args.wind_strength,
    ))
    .with_intensity(args.intensity);

    let scenario: Scenario = args.scenario.parse()?;
    let table = load_table(args)?;
    let table = match &args.state {
        Some(state) => {
            info!(%state, "Filtering to state");
            table.filter_state(state)
        }
        None => table,
    };

    let pipeline = PollutionPipeline::new(config)?;
    let mut rng = StdRng::seed_from_u64(args.seed);
    let outcome = pipeline.run(&table, scenario, &mut rng)?;

    let report = match &outcome {
        PipelineOutcome::Complete(report) => report,
        PipelineOutcome::InsufficientData { reliability } => {
            println!("Insufficient geolocated data for spatial analysis.");
            println!("Data reliability: {:.4}", reliability.score);
            return Ok(());
        }
    };

    if args.json {
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| pollution_grid_core::PipelineError::Io(e.to_string()))?;
        println!("{json}");
    } else {
        print_report(report);
    }

    if let Some(path) = &args.export {
        write_table(&report.table, File::create(path)?)?;
        info!(path = %path.display(), "Enriched table exported");
    }

    Ok(())
}

fn load_table(args: &Args) -> PipelineResult<ObservationTable> {
    if let Some(path) = &args.observations {
        return load_observations(path);
    }
    match &args.readings {
        Some(path) => Ok(prepare_observations(&load_raw_readings(path)?)),
        None => Ok(ObservationTable::default()),
    }
}

fn print_report(report: &PipelineReport) {
    let summary = &report.summary;

    println!("=== Pollution Analysis: {} ===\n", report.scenario);
    println!("Data reliability:   {:.4}", summary.reliability);
    println!("Cities analysed:    {}", summary.cities_analyzed);
    if let Some(city) = &summary.highest_risk_city {
        println!("Highest risk city:  {city}");
    }
    if let (Some(max), Some(mean)) = (
        summary.highest_predicted_severity,
        summary.mean_predicted_severity,
    ) {
        println!("Predicted severity: max {max:.3}, mean {mean:.3}");
    }
    if let Some(source) = report.source.location() {
        println!(
            "Estimated source:   {:.5}, {:.5}",
            source.latitude, source.longitude
        );
    }

    println!("\nPriority alerts");
    println!("State                | City                 | Risk score | Level");
    println!("---------------------|----------------------|------------|---------");
    for alert in &report.alerts {
        println!(
            "{:20} | {:20} | {:10.3} | {}",
            alert.state, alert.city, alert.risk_score, alert.alert_level
        );
    }

    println!("\nRisk momentum (top 10)");
    println!("City                 | Momentum | Level");
    println!("---------------------|----------|---------");
    for record in report.top_momentum(10) {
        println!(
            "{:20} | {:8.3} | {}",
            record.city,
            record.risk_momentum.unwrap_or_default(),
            record.momentum_level.map_or("", |l| l.as_str())
        );
    }

    println!("\n7-day projection (top 10)");
    println!("City                 | Projected | Alert");
    println!("---------------------|-----------|---------");
    for record in report.top_projected(10) {
        println!(
            "{:20} | {:9.3} | {}",
            record.city,
            record.projected_7day_severity.unwrap_or_default(),
            record.projected_alert.map_or("", |a| a.as_str())
        );
    }

    println!("\nUrban vs rural");
    for area in &report.area_summary {
        println!(
            "  {:6} mean predicted severity {:.3} over {} records",
            area.area_type.as_str(),
            area.mean_predicted_severity,
            area.records
        );
    }
}
