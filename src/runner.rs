use std::fmt::Write as _;
use std::path::PathBuf;

use clap::{Args, Command, FromArgMatches as _};
use log::{info, LevelFilter};

use crate::context::{Context, Day};
use crate::disease::HealthStage;
use crate::error::CommunityError;
use crate::health::ContextHealthExt;
use crate::incidence_report::ContextIncidenceReportExt;
use crate::parameters::{ContextParametersExt, Parameters};
use crate::population::ContextPopulationExt;
use crate::random::ContextRandomExt;
use crate::seeding::ContextSeedingExt;
use crate::transmission::ContextTransmissionExt;

/// Default cli arguments for the community runner
#[derive(Args, Debug, Clone)]
pub struct BaseArgs {
    /// Random seed
    #[arg(short, long, default_value = "0")]
    pub random_seed: u64,

    /// Optional path to a JSON parameters file; missing fields take their defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Optional directory for the daily status and infection CSV reports
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Stop after this many simulated days even if infections remain
    #[arg(long, default_value = "365")]
    pub max_days: Day,

    /// Enable logging: a level (`info`), module filters (`community_sim::transmission=trace`),
    /// or a comma separated mix of both
    #[arg(short, long)]
    pub log_level: Option<String>,
}

fn create_community_cli() -> Command {
    let cli = Command::new("community-sim")
        .about("Simulates disease spread through households, workplaces and schools");
    BaseArgs::augment_args(cli)
}

/// Splits a `--log-level` value into a global level and per-module filters.
///
/// # Errors
///
/// Returns `CommunityError::ConfigError` if a level is not recognized.
pub fn parse_log_levels(
    spec: &str,
) -> Result<(Option<LevelFilter>, Vec<(String, LevelFilter)>), CommunityError> {
    let parse_level = |level: &str| {
        level
            .trim()
            .parse::<LevelFilter>()
            .map_err(|_| CommunityError::ConfigError(format!("unknown log level {level:?}")))
    };
    let mut global = None;
    let mut modules = Vec::new();
    for item in spec.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        match item.split_once('=') {
            Some((module, level)) => {
                modules.push((module.trim().to_string(), parse_level(level)?));
            }
            None => global = Some(parse_level(item)?),
        }
    }
    Ok((global, modules))
}

fn configure_logging(spec: &str) -> Result<(), CommunityError> {
    let (global, modules) = parse_log_levels(spec)?;
    // Module filters alone imply the rest of the output stays quiet.
    crate::log::set_log_level(global.unwrap_or(LevelFilter::Off));
    let filters: Vec<(&str, LevelFilter)> = modules
        .iter()
        .map(|(module, level)| (module.as_str(), *level))
        .collect();
    crate::log::set_module_filters(&filters);
    Ok(())
}

/// Validates and installs `parameters`, seeds every random stream from `seed`, generates the
/// population and seeds the initial infections.
///
/// # Errors
///
/// Returns a `CommunityError` if the parameters are invalid or the dispersion is unsupported.
pub fn build_community(
    context: &mut Context,
    parameters: Parameters,
    seed: u64,
) -> Result<(), CommunityError> {
    context.set_parameters(parameters)?;
    populate_community(context, seed)
}

/// Seeds every random stream from `seed`, generates the population from the parameters
/// already installed on `context` and seeds the initial infections.
///
/// # Errors
///
/// Returns `CommunityError::NotSupported` if the dispersion is unsupported.
pub fn populate_community(context: &mut Context, seed: u64) -> Result<(), CommunityError> {
    context.init_random(seed);
    context.generate_population();
    context.seed_infections()?;
    Ok(())
}

/// Steps the simulation until `max_days` days have been simulated, the epidemic is over, or
/// the context is shut down. Each day's result is written to any added reports. Returns the
/// number of days simulated.
///
/// # Errors
///
/// Returns a `CommunityError` if a report cannot be written.
pub fn run_simulation(context: &mut Context, max_days: Day) -> Result<Day, CommunityError> {
    let mut days = 0;
    while days < max_days && !context.is_shutdown() {
        if context.is_epidemic_over() {
            info!("no active infections left after {days} days");
            break;
        }
        let result = context.simulate_day();
        context.report_day(&result)?;
        days += 1;
    }
    Ok(days)
}

/// A human-readable summary of the stage counts.
#[must_use]
pub fn summarize(context: &Context) -> String {
    let counts = context.get_status_counts();
    let mut summary = format!(
        "Simulated {} days, population {}, r0 {:.2}\n",
        context.get_current_day(),
        counts.total(),
        context.get_current_r0()
    );
    for stage in HealthStage::ALL {
        let _ = writeln!(summary, "{:>28}: {}", stage.label(), counts[stage]);
    }
    summary
}

/// Runs a simulation with default cli arguments
///
/// Parses the command line, builds the community, calls `setup_fn` so callers can adjust the
/// context (for example add their own reports), then runs the simulation.
///
/// # Errors
/// Returns an error if argument parsing, setup or the run fails
pub fn run_with_args<F>(setup_fn: F) -> Result<Context, Box<dyn std::error::Error>>
where
    F: Fn(&mut Context, &BaseArgs) -> Result<(), CommunityError>,
{
    let matches = create_community_cli().get_matches();
    let args = BaseArgs::from_arg_matches(&matches)?;
    run_with_args_internal(args, setup_fn)
}

/// # Errors
/// Returns an error if setup or the run fails
pub fn run_with_args_internal<F>(
    args: BaseArgs,
    setup_fn: F,
) -> Result<Context, Box<dyn std::error::Error>>
where
    F: Fn(&mut Context, &BaseArgs) -> Result<(), CommunityError>,
{
    if let Some(spec) = &args.log_level {
        configure_logging(spec)?;
    }

    let mut context = Context::new();
    match &args.config {
        Some(path) => context.load_parameters_from_json(path)?,
        None => context.set_parameters(Parameters::default())?,
    }
    populate_community(&mut context, args.random_seed)?;

    if let Some(output_dir) = &args.output_dir {
        context.add_incidence_reports(output_dir)?;
    }

    setup_fn(&mut context, &args)?;

    let days = run_simulation(&mut context, args.max_days)?;
    info!("simulation finished after {days} days");
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incidence_report::DAILY_STATUS_FILE;
    use crate::parameters::DayRange;
    use tempfile::tempdir;

    fn args() -> BaseArgs {
        BaseArgs {
            random_seed: 42,
            config: None,
            output_dir: None,
            max_days: 365,
            log_level: None,
        }
    }

    #[test]
    fn parses_log_levels() {
        let (global, modules) = parse_log_levels("info").unwrap();
        assert_eq!(global, Some(LevelFilter::Info));
        assert!(modules.is_empty());

        let (global, modules) =
            parse_log_levels("warn, community_sim::transmission=trace").unwrap();
        assert_eq!(global, Some(LevelFilter::Warn));
        assert_eq!(
            modules,
            vec![("community_sim::transmission".to_string(), LevelFilter::Trace)]
        );

        assert!(matches!(
            parse_log_levels("loud"),
            Err(CommunityError::ConfigError(_))
        ));
    }

    #[test]
    fn runs_with_defaults() {
        let context = run_with_args_internal(args(), |_, _| Ok(())).unwrap();
        assert_eq!(context.get_population_size(), 200);
        assert!(context.get_current_day() <= 365);
        assert!(context.is_epidemic_over() || context.get_current_day() == 365);
    }

    #[test]
    fn same_seed_same_outcome() {
        let a = run_with_args_internal(args(), |_, _| Ok(())).unwrap();
        let b = run_with_args_internal(args(), |_, _| Ok(())).unwrap();
        assert_eq!(a.get_status_counts(), b.get_status_counts());
        assert_eq!(a.get_current_day(), b.get_current_day());
    }

    #[test]
    fn max_days_caps_the_run() {
        let test_args = BaseArgs {
            max_days: 3,
            ..args()
        };
        let context = run_with_args_internal(test_args, |_, _| Ok(())).unwrap();
        assert!(context.get_current_day() <= 3);
    }

    #[test]
    fn setup_can_shut_down_before_the_first_day() {
        let context = run_with_args_internal(args(), |context, _| {
            context.shutdown();
            Ok(())
        })
        .unwrap();
        assert_eq!(context.get_current_day(), 0);
    }

    #[test]
    fn setup_errors_are_returned() {
        let result = run_with_args_internal(args(), |context, _| {
            context.set_infection_probability(2.0)
        });
        assert!(result.is_err());
    }

    #[test]
    fn loads_config_and_writes_reports() {
        let temp_dir = tempdir().unwrap();
        let test_args = BaseArgs {
            config: Some(PathBuf::from("tests/data/parameters.json")),
            output_dir: Some(temp_dir.path().to_path_buf()),
            max_days: 20,
            ..args()
        };
        let context = run_with_args_internal(test_args, |context, _| {
            assert_eq!(context.get_parameters().incubation_days, DayRange::new(1, 3));
            Ok(())
        })
        .unwrap();
        assert_eq!(context.get_population_size(), 150);
        assert!(temp_dir.path().join(DAILY_STATUS_FILE).exists());
    }

    #[test]
    fn invalid_config_file_is_rejected_before_building() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("parameters.json");
        std::fs::write(&path, r#"{ "infection_days": [9, 1] }"#).unwrap();
        let test_args = BaseArgs {
            config: Some(path),
            ..args()
        };
        let result = run_with_args_internal(test_args, |_, _| Ok(()));
        let message = result.err().unwrap().to_string();
        assert!(message.contains("infection_days has min 9"), "{message}");
    }

    #[test]
    fn populates_from_installed_parameters() {
        let mut context = Context::new();
        context
            .set_parameters(Parameters {
                population: 50,
                initial_infections: 2,
                ..Parameters::default()
            })
            .unwrap();
        populate_community(&mut context, 8).unwrap();
        assert_eq!(context.get_population_size(), 50);
        assert_eq!(context.active_infection_count(), 2);
    }

    #[test]
    fn missing_config_is_an_error() {
        let test_args = BaseArgs {
            config: Some(PathBuf::from("tests/data/does_not_exist.json")),
            ..args()
        };
        assert!(run_with_args_internal(test_args, |_, _| Ok(())).is_err());
    }

    #[test]
    fn summary_lists_every_stage() {
        let mut context = Context::new();
        build_community(&mut context, Parameters::default(), 5).unwrap();
        let summary = summarize(&context);
        assert!(summary.starts_with("Simulated 0 days, population 200"));
        for stage in HealthStage::ALL {
            assert!(summary.contains(stage.label()));
        }
    }
}
