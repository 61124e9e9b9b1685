use log::info;

use crate::context::Context;
use crate::disease::ContextDiseaseExt;
use crate::distribution::sample_with_indices;
use crate::error::CommunityError;
use crate::health::ContextHealthExt;
use crate::parameters::{ContextParametersExt, Dispersion};
use crate::population::{ContextPopulationExt, PersonId};
use crate::random::{define_rng, ContextRandomExt};

define_rng!(SeedingRng);

pub trait ContextSeedingExt {
    /// Infects the configured number of people today, placed according to the configured
    /// dispersion, and updates their stages right away so a zero-day incubation starts out
    /// contagious. Returns the seeded people.
    ///
    /// # Errors
    ///
    /// Returns `CommunityError::NotSupported` for clustered dispersion.
    fn seed_infections(&mut self) -> Result<Vec<PersonId>, CommunityError>;
}

impl ContextSeedingExt for Context {
    fn seed_infections(&mut self) -> Result<Vec<PersonId>, CommunityError> {
        let parameters = self.get_parameters();
        let count = parameters.initial_infections;
        match parameters.initial_dispersion {
            Dispersion::Random => {}
            Dispersion::Clustered => {
                return Err(CommunityError::NotSupported(
                    "clustered initial dispersion has no neighbor selection".to_string(),
                ));
            }
        }

        let candidates: Vec<PersonId> = self
            .get_population()
            .people()
            .iter()
            .filter(|person| person.is_susceptible())
            .map(|person| person.id)
            .collect();
        let seeded: Vec<PersonId> = self.sample(SeedingRng, |rng| {
            sample_with_indices(rng, &candidates, count)
                .into_iter()
                .map(|(person, _)| *person)
                .collect()
        });

        let today = self.get_current_day();
        for person in &seeded {
            let infected = self.infect_person(*person, None);
            debug_assert!(infected, "seeding candidate {person} was not susceptible");
            self.refresh_stage(*person, today);
        }
        info!("seeded {} infections on day {today}", seeded.len());
        Ok(seeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disease::HealthStage;
    use crate::parameters::{DayRange, Parameters};

    fn seeded_context(parameters: Parameters, seed: u64) -> Context {
        let mut context = Context::new();
        context.set_parameters(parameters).unwrap();
        context.init_random(seed);
        context.generate_population();
        context
    }

    #[test]
    fn seeds_distinct_people() {
        let mut context = seeded_context(
            Parameters {
                population: 300,
                initial_infections: 25,
                ..Parameters::default()
            },
            3,
        );
        let mut seeded = context.seed_infections().unwrap();
        assert_eq!(seeded.len(), 25);
        seeded.sort_unstable();
        seeded.dedup();
        assert_eq!(seeded.len(), 25);
        for person in &seeded {
            let infection = context.get_person(*person).infection.as_ref().unwrap();
            assert_eq!(infection.infected_on_day, 0);
            assert_eq!(infection.infected_by, None);
        }
        let counts = context.get_status_counts();
        assert_eq!(counts.total(), 300);
        assert_eq!(counts[HealthStage::Healthy], 275);
        assert_eq!(context.active_infection_count(), 25);
    }

    #[test]
    fn zero_incubation_starts_contagious() {
        let mut context = seeded_context(
            Parameters {
                incubation_days: DayRange::new(0, 0),
                asymptomatic_days: DayRange::new(3, 3),
                infection_days: DayRange::new(7, 7),
                initial_infections: 4,
                ..Parameters::default()
            },
            9,
        );
        let seeded = context.seed_infections().unwrap();
        for person in seeded {
            assert_eq!(
                context.get_person(person).health_stage,
                HealthStage::Asymptomatic
            );
        }
        assert_eq!(context.get_status_counts()[HealthStage::Asymptomatic], 4);
    }

    #[test]
    fn seeding_twice_infects_fresh_people() {
        let mut context = seeded_context(
            Parameters {
                population: 40,
                initial_infections: 20,
                ..Parameters::default()
            },
            5,
        );
        let first = context.seed_infections().unwrap();
        let second = context.seed_infections().unwrap();
        assert_eq!(second.len(), 20);
        assert!(second.iter().all(|person| !first.contains(person)));
        assert_eq!(context.active_infection_count(), 40);
        assert_eq!(context.get_status_counts()[HealthStage::Healthy], 0);
    }

    #[test]
    fn clustered_dispersion_is_not_supported() {
        let mut context = seeded_context(
            Parameters {
                initial_dispersion: Dispersion::Clustered,
                ..Parameters::default()
            },
            1,
        );
        let result = context.seed_infections();
        assert!(matches!(result, Err(CommunityError::NotSupported(_))));
        assert_eq!(context.active_infection_count(), 0);
    }
}
