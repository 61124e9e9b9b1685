//! CSV output for a simulation run: one row per day with the stage counts, and one row per
//! transmission with where it happened and who passed it on.
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::{Context, Day};
use crate::define_report;
use crate::disease::HealthStage;
use crate::error::CommunityError;
use crate::health::ContextHealthExt;
use crate::population::{ContextPopulationExt, LocationId, LocationKind, PersonId};
use crate::report::ContextReportExt;
use crate::transmission::DayResult;

pub const DAILY_STATUS_FILE: &str = "daily_status.csv";
pub const INFECTIONS_FILE: &str = "infections.csv";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DailyStatusReport {
    pub day: Day,
    pub r0: f64,
    pub healthy: usize,
    pub incubating: usize,
    pub asymptomatic: usize,
    pub symptomatic: usize,
    pub recovered: usize,
    pub dead: usize,
    pub new_infections: usize,
    pub progressions: usize,
}

define_report!(DailyStatusReport);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InfectionReport {
    pub day: Day,
    pub location_kind: LocationKind,
    pub location_id: LocationId,
    pub person_id: PersonId,
    pub infected_by: Option<PersonId>,
}

define_report!(InfectionReport);

pub trait ContextIncidenceReportExt {
    /// Writes `daily_status.csv` and `infections.csv` into `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns a `CommunityError` if either file cannot be created.
    fn add_incidence_reports(&mut self, output_dir: &Path) -> Result<(), CommunityError>;

    /// Sends the rows for one simulated day to whichever of the two reports were added.
    ///
    /// # Errors
    ///
    /// Returns a `CommunityError` if a row cannot be written.
    fn report_day(&self, result: &DayResult) -> Result<(), CommunityError>;
}

impl ContextIncidenceReportExt for Context {
    fn add_incidence_reports(&mut self, output_dir: &Path) -> Result<(), CommunityError> {
        self.add_report::<DailyStatusReport>(&output_dir.join(DAILY_STATUS_FILE))?;
        self.add_report::<InfectionReport>(&output_dir.join(INFECTIONS_FILE))?;
        Ok(())
    }

    fn report_day(&self, result: &DayResult) -> Result<(), CommunityError> {
        if self.has_report::<DailyStatusReport>() {
            let counts = self.get_status_counts();
            self.send_report(DailyStatusReport {
                day: result.day,
                r0: result.r0,
                healthy: counts[HealthStage::Healthy],
                incubating: counts[HealthStage::Incubating],
                asymptomatic: counts[HealthStage::Asymptomatic],
                symptomatic: counts[HealthStage::Symptomatic],
                recovered: counts[HealthStage::Recovered],
                dead: counts[HealthStage::Dead],
                new_infections: result.new_infections.len(),
                progressions: result.progressions.len(),
            })?;
        }

        if self.has_report::<InfectionReport>() {
            for kind in LocationKind::ALL {
                for (location, infected) in result.infections_at(kind) {
                    for person in infected {
                        self.send_report(InfectionReport {
                            day: result.day,
                            location_kind: kind,
                            location_id: *location,
                            person_id: *person,
                            infected_by: self.get_person(*person).infected_by(),
                        })?;
                    }
                }
            }
        }
        Ok(())
    }
}
