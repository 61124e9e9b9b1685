//! Daily reconciliation of health stages against infection timelines, the per-stage counts,
//! and a running estimate of the reproduction number.
//!
//! Stored stages and counts are caches. Each day [`ContextHealthExt::advance_statuses`]
//! re-derives every infected person's stage from their timeline and adjusts the counts by the
//! difference, so the counts always sum to the population size.
use std::ops::Index;

use log::debug;
use serde::Serialize;

use crate::context::{Context, Day};
use crate::define_data_plugin;
use crate::disease::{stage_on_day, HealthStage};
use crate::population::{ContextPopulationExt, PersonId};
use crate::HashMap;

/// Number of people in each health stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts([usize; 6]);

impl StatusCounts {
    #[must_use]
    pub fn get(&self, stage: HealthStage) -> usize {
        self.0[stage.ordinal()]
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    /// People incubating, asymptomatic or symptomatic.
    #[must_use]
    pub fn active(&self) -> usize {
        HealthStage::ALL
            .iter()
            .filter(|stage| stage.is_active())
            .map(|stage| self.get(*stage))
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (HealthStage, usize)> + '_ {
        HealthStage::ALL.iter().map(|stage| (*stage, self.get(*stage)))
    }

    fn record_transition(&mut self, from: HealthStage, to: HealthStage) {
        self.0[from.ordinal()] -= 1;
        self.0[to.ordinal()] += 1;
    }
}

impl Index<HealthStage> for StatusCounts {
    type Output = usize;

    fn index(&self, stage: HealthStage) -> &usize {
        &self.0[stage.ordinal()]
    }
}

#[derive(Default)]
struct HealthData {
    counts: StatusCounts,
    current_r0: f64,
}

define_data_plugin!(HealthPlugin, HealthData, HealthData::default());

pub trait ContextHealthExt {
    /// Brings every infected person's stage up to date for `today` and returns the people
    /// whose stage changed, split into progressions of earlier infections and infections that
    /// began today. Also recomputes the reproduction number estimate.
    fn advance_statuses(&mut self, today: Day) -> (Vec<PersonId>, Vec<PersonId>);

    /// Updates a single person's stage for `today`. Returns the stage change, if any.
    fn refresh_stage(&mut self, person: PersonId, today: Day) -> Option<(HealthStage, HealthStage)>;

    /// Rebuilds the counts from the stored stages of the whole population.
    fn recount_statuses(&mut self);

    fn get_status_counts(&self) -> StatusCounts;

    /// Mean number of people infected by each person who has infected anyone; 0 when nobody
    /// has. Describes transmissions so far, it does not predict.
    fn get_current_r0(&self) -> f64;

    fn active_infection_count(&self) -> usize;

    /// True once no one is incubating, asymptomatic or symptomatic.
    fn is_epidemic_over(&self) -> bool;
}

#[allow(clippy::cast_precision_loss)]
fn reproduction_number<'a>(infectors: impl Iterator<Item = &'a PersonId>) -> f64 {
    let mut infected_by: HashMap<PersonId, usize> = HashMap::default();
    for infector in infectors {
        *infected_by.entry(*infector).or_insert(0) += 1;
    }
    if infected_by.is_empty() {
        return 0.0;
    }
    let transmissions: usize = infected_by.values().sum();
    transmissions as f64 / infected_by.len() as f64
}

impl ContextHealthExt for Context {
    fn advance_statuses(&mut self, today: Day) -> (Vec<PersonId>, Vec<PersonId>) {
        let mut transitions = Vec::new();
        let mut progressions = Vec::new();
        let mut new_infections = Vec::new();

        for person in self.population_mut().people_mut() {
            if person.health_stage.is_terminal() {
                continue;
            }
            let Some(infection) = &person.infection else {
                continue;
            };
            let stage = stage_on_day(&infection.timeline, infection.outcome, today);
            if stage == person.health_stage {
                continue;
            }
            transitions.push((person.health_stage, stage));
            if infection.infected_on_day == today {
                new_infections.push(person.id);
            } else {
                progressions.push(person.id);
            }
            person.health_stage = stage;
        }

        let r0 = reproduction_number(
            self.get_population()
                .people()
                .iter()
                .filter_map(|person| person.infection.as_ref())
                .filter_map(|infection| infection.infected_by.as_ref()),
        );

        let data = self.get_data_container_mut(HealthPlugin);
        for (from, to) in transitions {
            data.counts.record_transition(from, to);
        }
        data.current_r0 = r0;
        debug!(
            "day {today}: {} progressions, {} new infections, counts {:?}, r0 {r0:.3}",
            progressions.len(),
            new_infections.len(),
            data.counts
        );
        (progressions, new_infections)
    }

    fn refresh_stage(
        &mut self,
        person: PersonId,
        today: Day,
    ) -> Option<(HealthStage, HealthStage)> {
        let person = self.population_mut().person_mut(person);
        let infection = person.infection.as_ref()?;
        if person.health_stage.is_terminal() {
            return None;
        }
        let stage = stage_on_day(&infection.timeline, infection.outcome, today);
        if stage == person.health_stage {
            return None;
        }
        let change = (person.health_stage, stage);
        person.health_stage = stage;
        self.get_data_container_mut(HealthPlugin)
            .counts
            .record_transition(change.0, change.1);
        Some(change)
    }

    fn recount_statuses(&mut self) {
        let mut counts = [0usize; 6];
        for person in self.get_population().people() {
            counts[person.health_stage.ordinal()] += 1;
        }
        self.get_data_container_mut(HealthPlugin).counts = StatusCounts(counts);
    }

    fn get_status_counts(&self) -> StatusCounts {
        self.get_data_container(HealthPlugin)
            .map(|data| data.counts)
            .unwrap_or_default()
    }

    fn get_current_r0(&self) -> f64 {
        self.get_data_container(HealthPlugin)
            .map_or(0.0, |data| data.current_r0)
    }

    fn active_infection_count(&self) -> usize {
        self.get_status_counts().active()
    }

    fn is_epidemic_over(&self) -> bool {
        self.active_infection_count() == 0
    }
}
