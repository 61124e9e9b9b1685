//! The course of an infection: the stages a person passes through and the timeline that
//! decides when.
//!
//! When a person is infected, [`draw_infection_course`] fixes everything about the illness up
//! front: how long each stage lasts and whether it ends in recovery or death. The resulting
//! [`Infection`] carries four breakpoints,
//!
//! ```text
//! [infected on, contagious from, symptomatic from, resolved on]
//! ```
//!
//! and the person's stage on any day is a pure function of those breakpoints ([`stage_on_day`]).
//! Nothing about an infection is re-rolled later.
use std::fmt::{self, Display};

use log::trace;
use serde::{Deserialize, Serialize};

use crate::context::{Context, Day};
use crate::distribution::insertion_point_right;
use crate::parameters::{ContextParametersExt, Parameters};
use crate::population::{ContextPopulationExt, PersonId};
use crate::rand::Rng;
use crate::random::{define_rng, ContextRandomExt};

define_rng!(InfectionCourseRng);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum HealthStage {
    #[default]
    Healthy = 0,
    /// Infected but not yet contagious.
    Incubating = 1,
    /// Contagious without symptoms.
    Asymptomatic = 2,
    Symptomatic = 3,
    Recovered = 4,
    Dead = 5,
}

impl HealthStage {
    pub const ALL: [HealthStage; 6] = [
        HealthStage::Healthy,
        HealthStage::Incubating,
        HealthStage::Asymptomatic,
        HealthStage::Symptomatic,
        HealthStage::Recovered,
        HealthStage::Dead,
    ];

    #[must_use]
    pub fn ordinal(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            HealthStage::Healthy => "healthy",
            HealthStage::Incubating => "incubating (non-contagious)",
            HealthStage::Asymptomatic => "asymptomatic (contagious)",
            HealthStage::Symptomatic => "symptomatic illness",
            HealthStage::Recovered => "recovered",
            HealthStage::Dead => "dead",
        }
    }

    #[must_use]
    pub fn is_contagious(self) -> bool {
        matches!(self, HealthStage::Asymptomatic | HealthStage::Symptomatic)
    }

    /// Infected and not yet resolved.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(
            self,
            HealthStage::Incubating | HealthStage::Asymptomatic | HealthStage::Symptomatic
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, HealthStage::Recovered | HealthStage::Dead)
    }
}

impl Display for HealthStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The durations and outcome of one infection, before they are anchored to a start day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfectionCourse {
    pub incubation_days: Day,
    pub asymptomatic_days: Day,
    pub infection_days: Day,
    /// Either `Recovered` or `Dead`.
    pub outcome: HealthStage,
}

impl InfectionCourse {
    /// Anchors the course at `start`. Resolution never comes before the symptomatic stage
    /// begins, so the breakpoints are always ordered. Breakpoints past the last representable
    /// day are pinned to it.
    #[must_use]
    pub fn timeline(&self, start: Day) -> [Day; 4] {
        let contagious = start.saturating_add(self.incubation_days);
        let symptomatic = contagious.saturating_add(self.asymptomatic_days);
        let resolved = start.saturating_add(self.infection_days).max(symptomatic);
        [start, contagious, symptomatic, resolved]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Infection {
    pub infected_on_day: Day,
    /// `None` for seeded infections.
    pub infected_by: Option<PersonId>,
    pub timeline: [Day; 4],
    pub outcome: HealthStage,
}

impl Infection {
    #[must_use]
    pub fn new(course: &InfectionCourse, day: Day, infected_by: Option<PersonId>) -> Self {
        Infection {
            infected_on_day: day,
            infected_by,
            timeline: course.timeline(day),
            outcome: course.outcome,
        }
    }
}

/// The stage of an infection on `day`: the number of breakpoints at or before `day`, with the
/// last one replaced by the predetermined outcome.
#[must_use]
pub fn stage_on_day(timeline: &[Day; 4], outcome: HealthStage, day: Day) -> HealthStage {
    match insertion_point_right(timeline, &day) {
        0 => HealthStage::Healthy,
        1 => HealthStage::Incubating,
        2 => HealthStage::Asymptomatic,
        3 => HealthStage::Symptomatic,
        _ => outcome,
    }
}

/// Index into an age-decade fatality table. Ages past the end of the table use its last entry.
///
/// # Panics
///
/// Panics if the table is empty.
#[must_use]
pub fn fatality_bucket(age: u8, table_len: usize) -> usize {
    assert!(table_len > 0, "fatality table is empty");
    (usize::from(age) / 10).min(table_len - 1)
}

/// Draws the durations and outcome of an infection for a person of `age`.
pub fn draw_infection_course<R: Rng>(
    rng: &mut R,
    parameters: &Parameters,
    age: u8,
) -> InfectionCourse {
    let infection = parameters.infection_days;
    let incubation = parameters.incubation_days;
    let asymptomatic = parameters.asymptomatic_days;

    let infection_days = rng.random_range(infection.min..=infection.max);
    let incubation_days = rng.random_range(incubation.min..=incubation.max);
    // Widen the asymptomatic range so it can cover whatever incubation leaves of the illness.
    let asymptomatic_max = asymptomatic
        .max
        .max(infection_days.saturating_sub(incubation_days));
    let asymptomatic_days = rng.random_range(asymptomatic.min..=asymptomatic_max);

    let table = &parameters.fatality_by_age;
    let odds = table[fatality_bucket(age, table.len())];
    let outcome = if rng.random_bool(odds) {
        HealthStage::Dead
    } else {
        HealthStage::Recovered
    };

    InfectionCourse {
        incubation_days,
        asymptomatic_days,
        infection_days,
        outcome,
    }
}

pub trait ContextDiseaseExt {
    /// Infects `person` today with a freshly drawn course. The stored stage is left for the
    /// daily status update. Returns false, changing nothing, if the person has ever been
    /// infected or is dead.
    fn infect_person(&mut self, person: PersonId, infected_by: Option<PersonId>) -> bool;
}

impl ContextDiseaseExt for Context {
    fn infect_person(&mut self, person: PersonId, infected_by: Option<PersonId>) -> bool {
        let today = self.get_current_day();
        let target = self.get_person(person);
        if !target.is_susceptible() {
            return false;
        }
        let age = target.age;
        let course = {
            let parameters = self.get_parameters();
            self.sample(InfectionCourseRng, |rng| {
                draw_infection_course(rng, parameters, age)
            })
        };
        let infection = Infection::new(&course, today, infected_by);
        trace!(
            "day {today}: person {person} infected by {infected_by:?}, timeline {:?}, outcome {}",
            infection.timeline,
            infection.outcome
        );
        self.population_mut().person_mut(person).infection = Some(infection);
        true
    }
}
