//! SWEEP - Structure Wildfire Emissions Estimator and Predictor
//!
//! Command-line front end over the `sweep` library.
//!
//! # Usage
//!
//! ```bash
//! # Emissions for an inventory, grouped by county
//! sweep estimate --input bsdb.geojson --aggregate COUNTY
//!
//! # Only the 2020 North Complex, DINS5 consumption
//! sweep estimate --input bsdb.csv --filter-field "Wildfire Name" --values "NORTH COMPLEX" \
//!     --start-date 2020-08-17 --end-date 2020-12-03 --consumption DINS5
//!
//! # Scenario: 35% of the parcels inside the AOI polygons burn
//! sweep predict --parcels parcels.geojson --aoi perimeter.geojson --ratio-destroyed 0.35 --seed 7
//!
//! # Effective configuration and config file checks
//! sweep show-config
//! sweep check-config sweep.toml
//! ```
//!
//! # Environment Variables
//!
//! - `SWEEP_CONFIG`: path to the run config (default: ./sweep.toml)
//! - `RUST_LOG`: logging level (default: info)

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use sweep::config::{defaults, validation, RunConfig};
use sweep::inventory::load_inventory;
use sweep::predictor::assign_damage;
use sweep::report::write_reports;
use sweep::selection::{select, Aoi, SelectionCriteria};
use sweep::{run_estimate, RunOutput, RunSettings, StructureRecord};
use tracing::{info, warn};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "sweep")]
#[command(about = "Structure Wildfire Emissions Estimator and Predictor")]
#[command(version)]
struct CliArgs {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(Subcommand, Debug)]
enum SubCommand {
    /// Estimate emissions for a damage inventory
    Estimate {
        /// Inventory file (.geojson, .json or .csv)
        #[arg(long)]
        input: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Assign synthetic damage to candidate structures, then estimate
    Predict {
        /// Candidate structure points (.geojson, .json or .csv)
        #[arg(long)]
        parcels: PathBuf,

        /// Share of candidates destroyed, 0 to 1
        #[arg(long)]
        ratio_destroyed: Option<f64>,

        /// Seed for the damage assignment
        #[arg(long)]
        seed: Option<u64>,

        /// Incident name stamped on the scenario
        #[arg(long)]
        incident_name: Option<String>,

        /// Scenario date (YYYY-MM-DD); today when unset
        #[arg(long)]
        incident_date: Option<NaiveDate>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Print the effective configuration as TOML
    ShowConfig {
        /// Config file (default: $SWEEP_CONFIG, then ./sweep.toml)
        #[arg(long, env = "SWEEP_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Validate a config file and report every problem found
    CheckConfig {
        file: PathBuf,
    },
}

/// Options shared by `estimate` and `predict`. Each overrides the config file.
#[derive(Args, Debug)]
struct RunArgs {
    /// Config file (default: $SWEEP_CONFIG, then ./sweep.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory the SWEEP_<suffix> run folder is created in
    #[arg(long)]
    out: Option<PathBuf>,

    /// Run folder suffix (default: local timestamp)
    #[arg(long)]
    suffix: Option<String>,

    /// Consumption policy: HOLDER, CARB, DINS3, DINS5
    #[arg(long)]
    consumption: Option<String>,

    /// Aggregate keys, comma separated (e.g. YEAR,COUNTY)
    #[arg(long, value_delimiter = ',')]
    aggregate: Vec<String>,

    /// Attribute to filter on (e.g. "Wildfire Name", County)
    #[arg(long, requires = "values")]
    filter_field: Option<String>,

    /// Accepted values for --filter-field, comma separated
    #[arg(long, value_delimiter = ',')]
    values: Vec<String>,

    /// First incident date kept (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// Last incident date kept (YYYY-MM-DD)
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// AOI polygons (GeoJSON); records are tagged with their polygon index
    #[arg(long)]
    aoi: Option<PathBuf>,

    /// Compute and summarise without writing report files
    #[arg(long)]
    no_write: bool,
}

// ============================================================================
// Configuration
// ============================================================================

fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        Some(p) => RunConfig::load_from_file(p)
            .with_context(|| format!("Failed to load config {}", p.display())),
        None => Ok(RunConfig::load()),
    }
}

impl RunArgs {
    /// Config file plus command-line overrides, validated as a whole.
    fn effective_config(&self) -> Result<RunConfig> {
        let mut config = load_config(self.config.as_deref())?;

        if let Some(out) = &self.out {
            config.report.output_dir.clone_from(out);
        }
        if let Some(suffix) = &self.suffix {
            config.report.suffix = Some(suffix.clone());
        }
        if let Some(policy) = &self.consumption {
            config.structures.consumption.clone_from(policy);
        }
        if !self.aggregate.is_empty() {
            config.report.aggregate_keys.clone_from(&self.aggregate);
            config.predictor.aggregate_keys.clone_from(&self.aggregate);
        }
        if let Some(field) = &self.filter_field {
            config.selection.field = Some(field.clone());
            config.selection.values.clone_from(&self.values);
        }
        if self.start_date.is_some() {
            config.selection.start_date = self.start_date;
        }
        if self.end_date.is_some() {
            config.selection.end_date = self.end_date;
        }
        if let Some(aoi) = &self.aoi {
            config.selection.aoi = Some(aoi.clone());
        }
        Ok(config)
    }
}

fn selection_criteria(config: &RunConfig) -> Result<SelectionCriteria> {
    let mut criteria = config
        .selection
        .criteria()
        .context("Invalid selection settings")?;
    if let Some(path) = &config.selection.aoi {
        let aoi = Aoi::load(path).with_context(|| format!("Failed to load AOI {}", path.display()))?;
        criteria.aoi = Some(aoi);
    }
    Ok(criteria)
}

fn load_and_select(path: &Path, config: &RunConfig) -> Result<Vec<StructureRecord>> {
    let records =
        load_inventory(path).with_context(|| format!("Failed to load inventory {}", path.display()))?;
    let criteria = selection_criteria(config)?;
    if criteria.is_empty() {
        return Ok(records);
    }
    Ok(select(records, &criteria))
}

// ============================================================================
// Commands
// ============================================================================

fn estimate(input: &Path, args: &RunArgs) -> Result<()> {
    let config = args.effective_config()?;
    config.validate()?;
    let settings = config.run_settings()?;
    let records = load_and_select(input, &config)?;
    finish(&records, &settings, &config, args.no_write)
}

fn predict(
    parcels: &Path,
    ratio_destroyed: Option<f64>,
    seed: Option<u64>,
    incident_name: Option<String>,
    incident_date: Option<NaiveDate>,
    args: &RunArgs,
) -> Result<()> {
    let mut config = args.effective_config()?;
    if let Some(r) = ratio_destroyed {
        config.predictor.ratio_destroyed = r;
    }
    if let Some(s) = seed {
        config.predictor.seed = s;
    }
    if let Some(name) = incident_name {
        config.predictor.incident_name = name;
    }
    if incident_date.is_some() {
        config.predictor.incident_date = incident_date;
    }
    config.validate()?;

    let settings = config.predictor_run_settings()?;
    let candidates = load_and_select(parcels, &config)?;
    if candidates.is_empty() {
        warn!(path = %parcels.display(), "No candidate structures selected");
    }
    let today = chrono::Local::now().date_naive();
    let records = assign_damage(candidates, &config.predictor.settings(today))
        .context("Failed to assign synthetic damage")?;
    finish(&records, &settings, &config, args.no_write)
}

fn finish(
    records: &[StructureRecord],
    settings: &RunSettings,
    config: &RunConfig,
    no_write: bool,
) -> Result<()> {
    let output = run_estimate(records, settings).context("Emissions run failed")?;

    let dir = if no_write {
        None
    } else {
        let suffix = config.report.suffix.clone().unwrap_or_else(|| {
            chrono::Local::now()
                .format(defaults::SUFFIX_TIME_FORMAT)
                .to_string()
        });
        let paths = write_reports(
            &output,
            &config.report.output_dir,
            &suffix,
            config.report.write_spatial,
        )
        .context("Failed to write reports")?;
        Some(paths.dir)
    };

    print_summary(&output, dir.as_deref());
    Ok(())
}

fn print_summary(output: &RunOutput, dir: Option<&Path>) {
    println!();
    println!("SWEEP run summary");
    println!("  Structures:  {}", output.emissions.rows.len());
    println!("  Excluded:    {}", output.exclusions.count());
    println!("  Groups:      {}", output.aggregate.rows.len());
    println!("  Vehicles:    {}", output.vehicles.total_vehicles());
    println!("  Structure emissions (kg):");
    for pollutant in &output.emissions.pollutants {
        let grams = output.emissions.total(pollutant).unwrap_or_default();
        println!("    {pollutant:<10} {:>16.3}", grams / 1000.0);
    }
    println!("  Vehicle emissions (kg):");
    for pollutant in &output.vehicle_summary.pollutants {
        let grams = output.vehicle_summary.total(pollutant).unwrap_or_default();
        println!("    {pollutant:<10} {:>16.3}", grams / 1000.0);
    }
    match dir {
        Some(d) => println!("  Reports:     {}", d.display()),
        None => println!("  Reports:     not written (--no-write)"),
    }
}

fn show_config(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    print!("{}", config.to_toml()?);
    Ok(())
}

fn check_config(path: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let warnings = validation::validate_unknown_keys(&contents);
    for w in &warnings {
        println!("warning: {w}");
    }

    match RunConfig::from_toml_str(&contents, path) {
        Ok(_) => {
            println!("{}: OK ({} warning(s))", path.display(), warnings.len());
            Ok(())
        }
        Err(e) => bail!("{}: {e}", path.display()),
    }
}

// ============================================================================
// Entry Point
// ============================================================================

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.json_logs);
    info!(version = env!("CARGO_PKG_VERSION"), "SWEEP starting");

    match args.command {
        SubCommand::Estimate { input, run } => estimate(&input, &run),
        SubCommand::Predict {
            parcels,
            ratio_destroyed,
            seed,
            incident_name,
            incident_date,
            run,
        } => predict(
            &parcels,
            ratio_destroyed,
            seed,
            incident_name,
            incident_date,
            &run,
        ),
        SubCommand::ShowConfig { config } => show_config(config.as_deref()),
        SubCommand::CheckConfig { file } => check_config(&file),
    }
}
