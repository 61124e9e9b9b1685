//! Model parameters: demographic distributions used to synthesize the population, the disease
//! parameters used to draw infection courses, and the contact rates used by the transmission
//! engine.
//!
//! Parameters are usually loaded from a JSON file. Every field has a default (the values the
//! model was originally calibrated with), so a config file only needs the fields it changes:
//!
//! ```json
//! {
//!     "population": 1000,
//!     "infection_probability": 0.08,
//!     "incubation_days": [2, 10],
//!     "initial_infections": 5
//! }
//! ```
//!
//! All parameters are validated before they are installed on a `Context`; malformed input is
//! rejected with a `CommunityError::ConfigError` rather than silently simulated.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::context::{Context, Day};
use crate::define_data_plugin;
use crate::error::CommunityError;
use crate::population::LocationKind;

/// Age decades 0-9, 10-19, ..., 70-79 and 80+.
pub const AGE_BUCKETS: usize = 9;
/// Household sizes 1 through 8+.
pub const HOUSEHOLD_SIZE_BUCKETS: usize = 8;
/// Workplace sizes 0-9, ..., 90-99, 100-149, 150-199 and 200+.
pub const WORKPLACE_SIZE_BUCKETS: usize = 13;
/// School sizes 0-99, ..., 900-999 and 1000+.
pub const SCHOOL_SIZE_BUCKETS: usize = 11;
/// Fatality probability per age decade, same buckets as ages.
pub const FATALITY_BUCKETS: usize = 9;

/// How far a distribution may sum away from 1.0 before it is rejected.
pub const DISTRIBUTION_SUM_TOLERANCE: f64 = 1e-3;
/// Upper bound on the longest possible infection, from infection to resolution.
pub const MAX_COURSE_DAYS: Day = 3650;

/// An inclusive range of whole days. Serialized as a two-element array `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(Day, Day)", into = "(Day, Day)")]
pub struct DayRange {
    pub min: Day,
    pub max: Day,
}

impl DayRange {
    #[must_use]
    pub const fn new(min: Day, max: Day) -> Self {
        DayRange { min, max }
    }

    fn validate(&self, name: &str) -> Result<(), CommunityError> {
        if self.min > self.max {
            return Err(CommunityError::ConfigError(format!(
                "{name} has min {} greater than max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

impl From<(Day, Day)> for DayRange {
    fn from((min, max): (Day, Day)) -> Self {
        DayRange { min, max }
    }
}

impl From<DayRange> for (Day, Day) {
    fn from(range: DayRange) -> Self {
        (range.min, range.max)
    }
}

/// How the initial infections are placed in the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dispersion {
    /// Uniformly random agents.
    #[default]
    Random,
    /// One agent and its closest social and geographic neighbors.
    Clustered,
}

/// How long agents spend at a kind of location each day and how many close contacts they
/// make per hour there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSettings {
    pub hours: u32,
    pub contacts_per_hour: u32,
}

impl ContactSettings {
    #[must_use]
    pub const fn new(hours: u32, contacts_per_hour: u32) -> Self {
        ContactSettings {
            hours,
            contacts_per_hour,
        }
    }

    /// The number of contacts one roster position can take part in per day.
    #[must_use]
    pub fn daily_contact_budget(&self) -> usize {
        (self.hours as usize).saturating_mul(self.contacts_per_hour as usize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContactRates {
    pub home: ContactSettings,
    pub work: ContactSettings,
    pub school: ContactSettings,
}

impl Default for ContactRates {
    fn default() -> Self {
        // Assume everyone sleeps 8 hours; the remaining free hours are not simulated.
        ContactRates {
            home: ContactSettings::new(4, 2),
            work: ContactSettings::new(8, 4),
            school: ContactSettings::new(8, 10),
        }
    }
}

impl ContactRates {
    #[must_use]
    pub fn for_kind(&self, kind: LocationKind) -> ContactSettings {
        match kind {
            LocationKind::Home => self.home,
            LocationKind::Work => self.work,
            LocationKind::School => self.school,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    pub population: usize,
    /// Fraction of agents in each age decade, see [`AGE_BUCKETS`].
    pub age_distribution: Vec<f64>,
    /// Fraction of households of each size, see [`HOUSEHOLD_SIZE_BUCKETS`].
    pub household_size_distribution: Vec<f64>,
    /// Fraction of workplaces in each size bucket, see [`WORKPLACE_SIZE_BUCKETS`].
    pub workplace_size_distribution: Vec<f64>,
    /// Fraction of schools in each size bucket, see [`SCHOOL_SIZE_BUCKETS`].
    pub school_size_distribution: Vec<f64>,
    /// Probability that one close contact with a contagious agent infects a susceptible one.
    pub infection_probability: f64,
    pub incubation_days: DayRange,
    pub asymptomatic_days: DayRange,
    /// Total length of an infection, from exposure to resolution.
    pub infection_days: DayRange,
    /// Fraction of agents aged 65+ who are assigned a workplace.
    pub senior_employment_ratio: f64,
    pub initial_infections: usize,
    pub initial_dispersion: Dispersion,
    /// Probability that an infection ends in death, per age decade.
    pub fatality_by_age: Vec<f64>,
    pub contact_rates: ContactRates,
}

impl Default for Parameters {
    fn default() -> Self {
        let percent = |values: &[f64]| values.iter().map(|v| v / 100.0).collect::<Vec<_>>();
        Parameters {
            population: 200,
            // US 2010 census age structure
            age_distribution: percent(&[
                13.13, 13.84, 13.83, 13.00, 14.12, 13.59, 9.47, 5.38, 3.64,
            ]),
            household_size_distribution: percent(&[27.0, 34.0, 16.0, 14.0, 6.0, 2.0, 0.5, 0.5]),
            workplace_size_distribution: percent(&[
                8.0, 8.0, 8.0, 10.0, 11.0, 10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 5.0, 5.0,
            ]),
            school_size_distribution: percent(&[
                2.0, 5.0, 10.0, 12.0, 14.0, 14.0, 12.0, 11.0, 9.0, 7.0, 4.0,
            ]),
            infection_probability: 0.05,
            incubation_days: DayRange::new(0, 14),
            asymptomatic_days: DayRange::new(0, 14),
            infection_days: DayRange::new(7, 28),
            senior_employment_ratio: 0.1,
            initial_infections: 1,
            initial_dispersion: Dispersion::Random,
            fatality_by_age: percent(&[0.0, 0.2, 0.2, 0.2, 0.4, 1.3, 3.6, 8.0, 14.8]),
            contact_rates: ContactRates::default(),
        }
    }
}

fn validate_probability(name: &str, p: f64) -> Result<(), CommunityError> {
    if !(0.0..=1.0).contains(&p) {
        return Err(CommunityError::ConfigError(format!(
            "{name} must be a probability between 0 and 1, got {p}"
        )));
    }
    Ok(())
}

fn validate_distribution(
    name: &str,
    pmf: &[f64],
    expected_len: usize,
) -> Result<(), CommunityError> {
    if pmf.len() != expected_len {
        return Err(CommunityError::ConfigError(format!(
            "{name} must have {expected_len} entries, got {}",
            pmf.len()
        )));
    }
    if let Some(bad) = pmf.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(CommunityError::ConfigError(format!(
            "{name} contains an invalid probability mass {bad}"
        )));
    }
    let total: f64 = pmf.iter().sum();
    if (total - 1.0).abs() > DISTRIBUTION_SUM_TOLERANCE {
        return Err(CommunityError::ConfigError(format!(
            "{name} must sum to 1.0, sums to {total}"
        )));
    }
    Ok(())
}

fn validate_fatality_table(table: &[f64]) -> Result<(), CommunityError> {
    if table.len() != FATALITY_BUCKETS {
        return Err(CommunityError::ConfigError(format!(
            "fatality_by_age must have {FATALITY_BUCKETS} entries, got {}",
            table.len()
        )));
    }
    for p in table {
        validate_probability("fatality_by_age entry", *p)?;
    }
    Ok(())
}

impl Parameters {
    /// Reads parameters from a JSON file. Fields missing from the file take their default
    /// values. The result is not validated; see [`Parameters::validate`].
    ///
    /// # Errors
    ///
    /// Returns a `CommunityError` if the file cannot be opened or is not valid JSON for
    /// `Parameters`.
    pub fn from_json_file(file_path: &Path) -> Result<Parameters, CommunityError> {
        let file = File::open(file_path)?;
        let reader = BufReader::new(file);
        let parameters = serde_json::from_reader(reader)?;
        Ok(parameters)
    }

    /// Checks every parameter, returning the first problem found.
    ///
    /// # Errors
    ///
    /// Returns `CommunityError::ConfigError` describing the invalid parameter.
    pub fn validate(&self) -> Result<(), CommunityError> {
        if self.population == 0 {
            return Err(CommunityError::ConfigError(
                "population must be positive".to_string(),
            ));
        }
        validate_distribution("age_distribution", &self.age_distribution, AGE_BUCKETS)?;
        validate_distribution(
            "household_size_distribution",
            &self.household_size_distribution,
            HOUSEHOLD_SIZE_BUCKETS,
        )?;
        validate_distribution(
            "workplace_size_distribution",
            &self.workplace_size_distribution,
            WORKPLACE_SIZE_BUCKETS,
        )?;
        validate_distribution(
            "school_size_distribution",
            &self.school_size_distribution,
            SCHOOL_SIZE_BUCKETS,
        )?;
        validate_probability("infection_probability", self.infection_probability)?;
        validate_probability("senior_employment_ratio", self.senior_employment_ratio)?;
        self.incubation_days.validate("incubation_days")?;
        self.asymptomatic_days.validate("asymptomatic_days")?;
        self.infection_days.validate("infection_days")?;
        // The asymptomatic draw may be widened up to the infection length.
        let longest_course = u64::from(self.incubation_days.max)
            + u64::from(self.asymptomatic_days.max.max(self.infection_days.max));
        if longest_course > u64::from(MAX_COURSE_DAYS) {
            return Err(CommunityError::ConfigError(format!(
                "day ranges allow an infection lasting {longest_course} days, \
                 more than the maximum of {MAX_COURSE_DAYS}"
            )));
        }
        validate_fatality_table(&self.fatality_by_age)?;
        if self.initial_infections > self.population {
            return Err(CommunityError::ConfigError(format!(
                "initial_infections ({}) exceeds population ({})",
                self.initial_infections, self.population
            )));
        }
        Ok(())
    }
}

define_data_plugin!(ParametersPlugin, Option<Parameters>, None);

pub trait ContextParametersExt {
    /// Validates `parameters` and installs them on the context.
    ///
    /// # Errors
    ///
    /// Returns `CommunityError::ConfigError` if the parameters are invalid; the previously
    /// installed parameters, if any, are kept.
    fn set_parameters(&mut self, parameters: Parameters) -> Result<(), CommunityError>;

    /// Loads parameters from a JSON file, validates them and installs them on the context.
    ///
    /// # Errors
    ///
    /// Returns a `CommunityError` if the file cannot be read or parsed, or the parameters are
    /// invalid.
    fn load_parameters_from_json(&mut self, file_path: &Path) -> Result<(), CommunityError>;

    /// Returns the installed parameters.
    ///
    /// # Panics
    ///
    /// Panics if no parameters have been set.
    fn get_parameters(&self) -> &Parameters;

    /// Changes the per-contact infection probability mid-simulation. Only contacts made after
    /// the change are affected.
    ///
    /// # Errors
    ///
    /// Returns `CommunityError::ConfigError` if `p` is not a probability.
    fn set_infection_probability(&mut self, p: f64) -> Result<(), CommunityError>;

    /// Replaces the age-bucketed fatality table mid-simulation. Outcomes already drawn for
    /// existing infections are not re-rolled.
    ///
    /// # Errors
    ///
    /// Returns `CommunityError::ConfigError` if the table is malformed.
    fn set_fatality_table(&mut self, table: Vec<f64>) -> Result<(), CommunityError>;
}

impl Context {
    fn installed_parameters_mut(&mut self) -> &mut Parameters {
        self.get_data_container_mut(ParametersPlugin)
            .as_mut()
            .expect("Parameters must be set before they can be modified")
    }
}

impl ContextParametersExt for Context {
    fn set_parameters(&mut self, parameters: Parameters) -> Result<(), CommunityError> {
        parameters.validate()?;
        debug!("installing parameters: {parameters:?}");
        *self.get_data_container_mut(ParametersPlugin) = Some(parameters);
        Ok(())
    }

    fn load_parameters_from_json(&mut self, file_path: &Path) -> Result<(), CommunityError> {
        info!("loading parameters from {}", file_path.display());
        let parameters = Parameters::from_json_file(file_path)?;
        self.set_parameters(parameters)
    }

    fn get_parameters(&self) -> &Parameters {
        self.get_data_container(ParametersPlugin)
            .and_then(Option::as_ref)
            .expect("Parameters must be set before the community is used")
    }

    fn set_infection_probability(&mut self, p: f64) -> Result<(), CommunityError> {
        validate_probability("infection_probability", p)?;
        info!("infection probability changed to {p}");
        self.installed_parameters_mut().infection_probability = p;
        Ok(())
    }

    fn set_fatality_table(&mut self, table: Vec<f64>) -> Result<(), CommunityError> {
        validate_fatality_table(&table)?;
        info!("fatality table changed to {table:?}");
        self.installed_parameters_mut().fatality_by_age = table;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn assert_config_error(parameters: &Parameters, needle: &str) {
        match parameters.validate() {
            Err(CommunityError::ConfigError(msg)) => {
                assert!(msg.contains(needle), "unexpected message: {msg}");
            }
            other => panic!("expected a config error mentioning {needle}, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(Parameters::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_population() {
        let parameters = Parameters {
            population: 0,
            ..Parameters::default()
        };
        assert_config_error(&parameters, "population");
    }

    #[test]
    fn rejects_wrong_length_distribution() {
        let parameters = Parameters {
            household_size_distribution: vec![0.5, 0.5],
            ..Parameters::default()
        };
        assert_config_error(&parameters, "household_size_distribution must have 8 entries");
    }

    #[test]
    fn rejects_distribution_not_summing_to_one() {
        let mut parameters = Parameters::default();
        parameters.school_size_distribution[0] += 0.2;
        assert_config_error(&parameters, "school_size_distribution must sum to 1.0");
    }

    #[test]
    fn rejects_negative_mass() {
        let mut parameters = Parameters::default();
        parameters.age_distribution[0] = -0.1;
        parameters.age_distribution[1] += 0.1;
        assert_config_error(&parameters, "invalid probability mass");
    }

    #[test]
    fn rejects_inverted_range() {
        let parameters = Parameters {
            asymptomatic_days: DayRange::new(5, 2),
            ..Parameters::default()
        };
        assert_config_error(&parameters, "asymptomatic_days has min 5 greater than max 2");
    }

    #[test]
    fn rejects_overflowing_day_ranges() {
        let parameters = Parameters {
            incubation_days: DayRange::new(Day::MAX - 1, Day::MAX - 1),
            asymptomatic_days: DayRange::new(5, 5),
            ..Parameters::default()
        };
        assert_config_error(&parameters, "more than the maximum of 3650");

        let parameters = Parameters {
            infection_days: DayRange::new(7, Day::MAX),
            ..Parameters::default()
        };
        assert_config_error(&parameters, "more than the maximum of 3650");

        let parameters = Parameters {
            incubation_days: DayRange::new(0, 1000),
            asymptomatic_days: DayRange::new(0, 1000),
            infection_days: DayRange::new(0, MAX_COURSE_DAYS - 1000),
            ..Parameters::default()
        };
        assert!(parameters.validate().is_ok());
    }

    #[test]
    fn rejects_bad_probabilities() {
        let parameters = Parameters {
            infection_probability: 1.5,
            ..Parameters::default()
        };
        assert_config_error(&parameters, "infection_probability");

        let parameters = Parameters {
            senior_employment_ratio: -0.5,
            ..Parameters::default()
        };
        assert_config_error(&parameters, "senior_employment_ratio");

        let mut parameters = Parameters::default();
        parameters.fatality_by_age[8] = 2.0;
        assert_config_error(&parameters, "fatality_by_age");
    }

    #[test]
    fn rejects_too_many_initial_infections() {
        let parameters = Parameters {
            population: 10,
            initial_infections: 11,
            ..Parameters::default()
        };
        assert_config_error(&parameters, "initial_infections");
    }

    #[test]
    fn daily_contact_budget_multiplies() {
        let rates = ContactRates::default();
        assert_eq!(rates.for_kind(LocationKind::Home).daily_contact_budget(), 8);
        assert_eq!(rates.for_kind(LocationKind::Work).daily_contact_budget(), 32);
        assert_eq!(rates.for_kind(LocationKind::School).daily_contact_budget(), 80);
    }

    #[test]
    fn loads_partial_json_with_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "population": 500,
                "incubation_days": [2, 4],
                "initial_dispersion": "random",
                "contact_rates": {{ "home": {{ "hours": 10, "contacts_per_hour": 3 }} }}
            }}"#
        )
        .unwrap();

        let mut context = Context::new();
        context.load_parameters_from_json(file.path()).unwrap();
        let parameters = context.get_parameters();
        assert_eq!(parameters.population, 500);
        assert_eq!(parameters.incubation_days, DayRange::new(2, 4));
        assert_eq!(parameters.contact_rates.home.daily_contact_budget(), 30);
        assert_eq!(parameters.contact_rates.work, ContactSettings::new(8, 4));
        assert_eq!(parameters.infection_days, DayRange::new(7, 28));
    }

    #[test]
    fn rejects_unknown_fields() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "populaton": 500 }}"#).unwrap();

        let mut context = Context::new();
        let result = context.load_parameters_from_json(file.path());
        assert!(matches!(result, Err(CommunityError::JsonError(_))));
    }

    #[test]
    fn invalid_parameters_are_not_installed() {
        let mut context = Context::new();
        context.set_parameters(Parameters::default()).unwrap();
        let bad = Parameters {
            infection_days: DayRange::new(9, 1),
            ..Parameters::default()
        };
        assert!(context.set_parameters(bad).is_err());
        assert_eq!(context.get_parameters(), &Parameters::default());
    }

    #[test]
    fn mid_run_adjustments_are_validated() {
        let mut context = Context::new();
        context.set_parameters(Parameters::default()).unwrap();

        context.set_infection_probability(0.5).unwrap();
        assert!((context.get_parameters().infection_probability - 0.5).abs() < f64::EPSILON);
        assert!(context.set_infection_probability(-0.1).is_err());

        assert!(context.set_fatality_table(vec![0.0; 3]).is_err());
        context.set_fatality_table(vec![0.0; FATALITY_BUCKETS]).unwrap();
        assert!(context
            .get_parameters()
            .fatality_by_age
            .iter()
            .all(|p| *p == 0.0));
    }

    #[test]
    #[should_panic(expected = "Parameters must be set before the community is used")]
    fn get_parameters_panics_when_unset() {
        let context = Context::new();
        let _ = context.get_parameters();
    }
}
