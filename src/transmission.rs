//! The day step. Every location hosts a bounded number of close contacts between its living
//! members; contacts with a contagious person can infect susceptible ones.
//!
//! Each roster position at a location can take part in at most
//! `hours x contacts_per_hour` contacts per day. A contagious person at position `i` makes
//! `budget - contacts[i]` attempts, where `contacts[i]` already counts the times others
//! reached them, so the budget is shared by position rather than granted per spreader.
use indexmap::IndexMap;
use log::{debug, trace};
use serde::Serialize;

use crate::context::{Context, Day};
use crate::disease::{ContextDiseaseExt, HealthStage};
use crate::health::ContextHealthExt;
use crate::parameters::ContextParametersExt;
use crate::population::{ContextPopulationExt, LocationId, LocationKind, PersonId};
use crate::random::{define_rng, ContextRandomExt};

define_rng!(TransmissionRng);

/// New infections at each location, keyed by location id in visiting order. Locations with
/// no new infections are left out.
pub type LocationInfections = IndexMap<LocationId, Vec<PersonId>>;

/// Everything that happened on one simulated day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayResult {
    pub day: Day,
    pub r0: f64,
    pub home_infections: LocationInfections,
    pub work_infections: LocationInfections,
    pub school_infections: LocationInfections,
    /// People infected before today whose stage changed today.
    pub progressions: Vec<PersonId>,
    /// People infected today.
    pub new_infections: Vec<PersonId>,
}

impl DayResult {
    #[must_use]
    pub fn infections_at(&self, kind: LocationKind) -> &LocationInfections {
        match kind {
            LocationKind::Home => &self.home_infections,
            LocationKind::Work => &self.work_infections,
            LocationKind::School => &self.school_infections,
        }
    }

    /// Number of transmissions across all locations.
    #[must_use]
    pub fn transmission_count(&self) -> usize {
        LocationKind::ALL
            .iter()
            .flat_map(|kind| self.infections_at(*kind).values())
            .map(Vec::len)
            .sum()
    }
}

pub trait ContextTransmissionExt {
    /// Simulates the current day: contacts at every home, then workplace, then school,
    /// followed by the daily status update. Advances the day counter by one.
    ///
    /// # Panics
    ///
    /// Panics if parameters, randomness or the population have not been set up.
    fn simulate_day(&mut self) -> DayResult;
}

trait ContextTransmissionInternalExt {
    /// Runs the contacts at one location and returns who got infected.
    fn transmit_at(
        &mut self,
        kind: LocationKind,
        location: LocationId,
        today: Day,
    ) -> Vec<PersonId>;
}

impl ContextTransmissionInternalExt for Context {
    fn transmit_at(
        &mut self,
        kind: LocationKind,
        location: LocationId,
        today: Day,
    ) -> Vec<PersonId> {
        let population = self.get_population();
        let site = population.location(kind, location);
        if !site.is_open {
            return Vec::new();
        }
        let roster: Vec<PersonId> = site
            .members
            .iter()
            .copied()
            .filter(|member| population.person(*member).health_stage != HealthStage::Dead)
            .collect();
        if roster.len() < 2 {
            return Vec::new();
        }
        // Someone infected today cannot pass it on until tomorrow.
        let spreaders: Vec<usize> = roster
            .iter()
            .enumerate()
            .filter(|(_, member)| {
                let person = population.person(**member);
                person.health_stage.is_contagious()
                    && person
                        .infection
                        .as_ref()
                        .is_some_and(|infection| infection.infected_on_day < today)
            })
            .map(|(position, _)| position)
            .collect();
        if spreaders.is_empty() {
            return Vec::new();
        }

        let parameters = self.get_parameters();
        let budget = parameters.contact_rates.for_kind(kind).daily_contact_budget();
        let p_infect = parameters.infection_probability;

        let mut contacts = vec![0usize; roster.len()];
        let mut infected = Vec::new();
        for spreader in spreaders {
            let attempts = budget.saturating_sub(contacts[spreader]);
            for _ in 0..attempts {
                // Anyone but the spreader.
                let mut position = self.sample_range(TransmissionRng, 0..roster.len() - 1);
                if position >= spreader {
                    position += 1;
                }
                contacts[position] += 1;

                let contact = roster[position];
                if !self.get_person(contact).is_susceptible() {
                    continue;
                }
                if self.sample_bool(TransmissionRng, p_infect)
                    && self.infect_person(contact, Some(roster[spreader]))
                {
                    trace!(
                        "day {today}: {kind} {location}: person {} infected person {contact}",
                        roster[spreader]
                    );
                    infected.push(contact);
                }
            }
        }
        infected
    }
}

impl ContextTransmissionExt for Context {
    fn simulate_day(&mut self) -> DayResult {
        let today = self.get_current_day();
        let mut infections: [LocationInfections; 3] = Default::default();

        for (kind, by_location) in LocationKind::ALL.iter().zip(infections.iter_mut()) {
            let locations = self.get_locations(*kind).len();
            for idx in 0..locations {
                let location = LocationId(idx);
                let infected = self.transmit_at(*kind, location, today);
                if !infected.is_empty() {
                    by_location.insert(location, infected);
                }
            }
        }

        let (progressions, new_infections) = self.advance_statuses(today);
        let [home_infections, work_infections, school_infections] = infections;
        let result = DayResult {
            day: today,
            r0: self.get_current_r0(),
            home_infections,
            work_infections,
            school_infections,
            progressions,
            new_infections,
        };
        debug!(
            "day {today}: {} transmissions in {} homes, {} workplaces, {} schools",
            result.transmission_count(),
            result.home_infections.len(),
            result.work_infections.len(),
            result.school_infections.len()
        );
        self.advance_day();
        result
    }
}
