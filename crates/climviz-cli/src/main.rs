use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use climviz_core::config::ClimvizConfig;
use climviz_core::errors::ClimvizError;
use climviz_core::exploration::{explore_point, point_equilibrium};
use climviz_core::gases::{GasConcentrationVector, GasSpecies};
use climviz_core::grey_column::{GreyRadiationModel, GreyRadiationParameters};
use climviz_core::parameters::{ParameterId, ParameterSet};
use climviz_core::radiation::{GreyGasModel, RadiativeSolver};
use climviz_core::reference::reference_sounding;
use climviz_sweep::{CancellationToken, SessionStore, SweepAxis, SweepEngine, SweepRequest};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "climviz", about = "Single-column radiative model experiments")]
struct Cli {
    /// TOML configuration overriding the defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Background gas concentration handed to the model, e.g. `N2O=0.3`.
    #[arg(long = "gas", value_name = "SPECIES=PPM", value_parser = parse_gas, global = true)]
    gases: Vec<(GasSpecies, f64)>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fluxes and profiles of one column.
    Point(PointArgs),
    /// Surface temperature at which the column is in radiative balance.
    Equilibrium(PointArgs),
    /// Two-parameter sensitivity sweep.
    Sweep(SweepArgs),
    /// Radiative equilibrium of the grey layer model.
    Grey(GreyArgs),
}

#[derive(Args, Debug)]
struct PointArgs {
    /// CO2 concentration (ppm).
    #[arg(long)]
    co2: Option<f64>,
    /// CH4 concentration (ppm).
    #[arg(long)]
    ch4: Option<f64>,
    /// Relative humidity (0-1).
    #[arg(long)]
    rh: Option<f64>,
    /// Surface temperature (K).
    #[arg(long)]
    ts: Option<f64>,
    /// Session store to read the current parameters from and save points to.
    #[arg(long)]
    store: Option<PathBuf>,
    /// Save the parameters in the session store under this name.
    #[arg(long, requires = "store")]
    save_as: Option<String>,
    /// Print the full result as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct SweepArgs {
    /// First parameter (x-axis).
    #[arg(long, default_value = "co2_concentration")]
    param1: ParameterId,
    #[arg(long, default_value_t = 0.0)]
    min1: f64,
    #[arg(long, default_value_t = 1000.0)]
    max1: f64,
    #[arg(long, default_value_t = 5)]
    n1: usize,
    /// Second parameter (y-axis).
    #[arg(long, default_value = "ch4_concentration")]
    param2: ParameterId,
    #[arg(long, default_value_t = 0.0)]
    min2: f64,
    #[arg(long, default_value_t = 1000.0)]
    max2: f64,
    #[arg(long, default_value_t = 5)]
    n2: usize,
    /// Dataset name.
    #[arg(long, default_value = "Dataset 1")]
    name: String,
    /// Session store the dataset is added to.
    #[arg(long, default_value = "climviz-session.json")]
    store: PathBuf,
    /// Also export the dataset as CSV.
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Evaluate grid points one at a time.
    #[arg(long)]
    sequential: bool,
}

#[derive(Args, Debug)]
struct GreyArgs {
    /// Number of atmospheric layers.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=10))]
    layers: u16,
    /// Give up after this many model years.
    #[arg(long, default_value_t = 1000)]
    max_years: usize,
    /// Also print the reference sounding.
    #[arg(long)]
    reference: bool,
}

fn parse_gas(value: &str) -> Result<(GasSpecies, f64), String> {
    let (species, ppm) = value
        .split_once('=')
        .ok_or_else(|| format!("expected SPECIES=PPM, got '{}'", value))?;
    let species: GasSpecies = species.trim().parse().map_err(|e: ClimvizError| e.to_string())?;
    let ppm: f64 = ppm
        .trim()
        .parse()
        .map_err(|e| format!("invalid concentration '{}': {}", ppm, e))?;
    Ok((species, ppm))
}

fn template(gases: &[(GasSpecies, f64)]) -> Result<GasConcentrationVector, ClimvizError> {
    gases
        .iter()
        .try_fold(GasConcentrationVector::zeros(), |acc, (species, ppm)| {
            acc.with_ppm(*species, *ppm)
        })
}

fn solver(config: &ClimvizConfig) -> Result<RadiativeSolver, ClimvizError> {
    let solver = RadiativeSolver::new(Arc::new(GreyGasModel::from_optics(config.grey.clone())));
    Ok(match config.solver_timeout()? {
        Some(timeout) => solver.with_timeout(timeout),
        None => solver,
    })
}

fn point_parameters(
    args: &PointArgs,
) -> Result<(ParameterSet, Option<SessionStore>), Box<dyn Error>> {
    let store = args
        .store
        .as_ref()
        .map(SessionStore::load_or_default)
        .transpose()?;
    let mut parameters = store
        .as_ref()
        .map_or_else(ParameterSet::default, |s| s.rrtm_options.clone());
    let overrides = [
        (ParameterId::Co2Concentration, args.co2),
        (ParameterId::Ch4Concentration, args.ch4),
        (ParameterId::RelHumidity, args.rh),
        (ParameterId::SurfaceTemperature, args.ts),
    ];
    for (id, value) in overrides {
        if let Some(value) = value {
            parameters = parameters.with_value(id, value)?;
        }
    }
    Ok((parameters, store))
}

fn save_point(
    args: &PointArgs,
    parameters: &ParameterSet,
    store: Option<SessionStore>,
) -> Result<(), Box<dyn Error>> {
    if let (Some(mut store), Some(path)) = (store, args.store.as_ref()) {
        store.rrtm_options = parameters.clone();
        if let Some(name) = &args.save_as {
            store.save_point(name.clone(), parameters.clone());
            info!(name = %name, "Saved point");
        }
        store.save(path)?;
    }
    Ok(())
}

fn run_point(cli: &Cli, config: &ClimvizConfig, args: &PointArgs) -> Result<(), Box<dyn Error>> {
    let (parameters, store) = point_parameters(args)?;
    let summary = explore_point(
        &solver(config)?,
        &parameters,
        &template(&cli.gases)?,
        &config.column,
    )?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary.inputs);
        for indicator in &summary.indicators {
            println!(
                "{:<30} {:>10.2} {} ({:?}, {:?})",
                indicator.title,
                indicator.value,
                indicator.unit,
                indicator.style.arrow,
                indicator.style.tone
            );
        }
    }
    save_point(args, &parameters, store)
}

fn run_equilibrium(
    cli: &Cli,
    config: &ClimvizConfig,
    args: &PointArgs,
) -> Result<(), Box<dyn Error>> {
    let (parameters, store) = point_parameters(args)?;
    let equilibrium = point_equilibrium(
        &solver(config)?,
        &parameters,
        &template(&cli.gases)?,
        &config.column,
        &config.equilibrium,
    )?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&equilibrium)?);
    } else {
        println!(
            "Equilibrium surface temperature: {:.3} K (net flux {:.2e} W/m², {} evaluations)",
            equilibrium.surface_temperature, equilibrium.net_flux, equilibrium.evaluations
        );
    }
    save_point(args, &parameters, store)
}

fn run_sweep(cli: &Cli, config: &ClimvizConfig, args: &SweepArgs) -> Result<(), Box<dyn Error>> {
    let mut store = SessionStore::load_or_default(&args.store)?;
    let request = SweepRequest::new(
        args.name.clone(),
        SweepAxis::new(args.param1, args.min1, args.max1, args.n1)?,
        SweepAxis::new(args.param2, args.min2, args.max2, args.n2)?,
        store.rrtm_options.clone(),
    )?;
    let engine = SweepEngine::new(solver(config)?, config)
        .with_template(template(&cli.gases)?)
        .with_parallel(config.sweep.parallel && !args.sequential);
    let dataset = store.run_sweep(&engine, &request, &CancellationToken::new())?;

    for failure in dataset.failures() {
        if let Some(reason) = &failure.failure {
            println!(
                "{} = {}, {} = {}: {:?} failed: {}",
                failure.param1,
                failure.param1_value,
                failure.param2,
                failure.param2_value,
                reason.stage,
                reason.message
            );
        }
    }
    if let Some(path) = &args.csv {
        dataset.to_csv_path(path)?;
        info!(path = %path.display(), "Exported dataset");
    }
    println!(
        "Stored {} points ({} failed) as '{}' in {}",
        dataset.len(),
        dataset.failures().count(),
        request.name,
        args.store.display()
    );
    store.save(&args.store)?;
    Ok(())
}

fn run_grey(args: &GreyArgs) -> Result<(), Box<dyn Error>> {
    let mut model = GreyRadiationModel::from_parameters(GreyRadiationParameters {
        num_layers: usize::from(args.layers),
        ..GreyRadiationParameters::default()
    })?;
    let sounding = model.integrate_converge(1e-4, args.max_years)?;
    println!(
        "Converged after {} years: Ts = {:.2} K, OLR = {:.2} W/m², ASR = {:.2} W/m²",
        sounding.years,
        sounding.column.surface_temperature(),
        sounding.olr,
        sounding.asr
    );
    for (pressure, temperature) in sounding.column.iter() {
        println!("{:>8.1} hPa {:>8.2} K", pressure, temperature);
    }
    if args.reference {
        let reference = reference_sounding();
        println!("{}", reference.name);
        for (pressure, temperature) in reference.levels.iter().zip(&reference.temperatures) {
            println!("{:>8.1} hPa {:>8.2} K", pressure, temperature);
        }
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => ClimvizConfig::from_path(path)?,
        None => ClimvizConfig::default(),
    };
    match &cli.command {
        Command::Point(args) => run_point(cli, &config, args),
        Command::Equilibrium(args) => run_equilibrium(cli, &config, args),
        Command::Sweep(args) => run_sweep(cli, &config, args),
        Command::Grey(args) => run_grey(args),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
