//! The people of the simulated community and the homes, workplaces and schools they belong to.
//!
//! A population is generated once from the demographic distributions in `Parameters` (see
//! [`generator`]) or built by hand with [`Population`]'s builder methods, then installed on the
//! `Context`. Nobody is ever removed: the dead stay in the roster and in the counts.
mod data;
pub mod generator;
mod grid;

pub use data::{Coordinates, Location, LocationId, LocationKind, Person, PersonId, Population};

use log::info;

use crate::context::Context;
use crate::define_data_plugin;
use crate::health::ContextHealthExt;
use crate::parameters::ContextParametersExt;
use crate::random::{define_rng, ContextRandomExt};

define_rng!(PopulationRng);

define_data_plugin!(PopulationPlugin, Option<Population>, None);

pub trait ContextPopulationExt {
    /// Generates a population from the installed parameters using the population random
    /// stream, and installs it.
    ///
    /// # Panics
    ///
    /// Panics if parameters or randomness have not been set up.
    fn generate_population(&mut self);

    /// Installs `population`, replacing any existing one, and recounts health stages.
    fn set_population(&mut self, population: Population);

    /// # Panics
    ///
    /// Panics if no population has been installed.
    fn get_population(&self) -> &Population;

    fn get_population_size(&self) -> usize;

    /// # Panics
    ///
    /// Panics if no population has been installed or `id` is not in it.
    fn get_person(&self, id: PersonId) -> &Person;

    fn get_locations(&self, kind: LocationKind) -> &[Location];
}

impl Context {
    pub(crate) fn population_mut(&mut self) -> &mut Population {
        self.get_data_container_mut(PopulationPlugin)
            .as_mut()
            .expect("A population must be installed before it can be modified")
    }
}

impl ContextPopulationExt for Context {
    fn generate_population(&mut self) {
        let parameters = self.get_parameters().clone();
        let population = self.sample(PopulationRng, |rng| generator::generate(rng, &parameters));
        self.set_population(population);
    }

    fn set_population(&mut self, population: Population) {
        info!(
            "installing population of {} with {} homes, {} workplaces, {} schools",
            population.len(),
            population.locations(LocationKind::Home).len(),
            population.locations(LocationKind::Work).len(),
            population.locations(LocationKind::School).len()
        );
        *self.get_data_container_mut(PopulationPlugin) = Some(population);
        self.recount_statuses();
    }

    fn get_population(&self) -> &Population {
        self.get_data_container(PopulationPlugin)
            .and_then(Option::as_ref)
            .expect("A population must be installed before it can be queried")
    }

    fn get_population_size(&self) -> usize {
        self.get_data_container(PopulationPlugin)
            .and_then(Option::as_ref)
            .map_or(0, Population::len)
    }

    fn get_person(&self, id: PersonId) -> &Person {
        self.get_population().person(id)
    }

    fn get_locations(&self, kind: LocationKind) -> &[Location] {
        self.get_population().locations(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disease::HealthStage;
    use crate::parameters::Parameters;

    #[test]
    fn generate_installs_population() {
        let mut context = Context::new();
        context.set_parameters(Parameters::default()).unwrap();
        context.init_random(8675309);
        context.generate_population();

        assert_eq!(context.get_population_size(), 200);
        assert_eq!(context.get_status_counts()[HealthStage::Healthy], 200);
        let homes = context.get_locations(LocationKind::Home);
        assert!(!homes.is_empty());
        let first = homes[0].members[0];
        assert_eq!(context.get_person(first).home, Some(homes[0].id));
    }

    #[test]
    fn generation_depends_only_on_seed() {
        let build = |seed| {
            let mut context = Context::new();
            context.set_parameters(Parameters::default()).unwrap();
            context.init_random(seed);
            context.generate_population();
            context
                .get_population()
                .people()
                .iter()
                .map(|person| person.age)
                .collect::<Vec<_>>()
        };
        assert_eq!(build(1), build(1));
        assert_ne!(build(1), build(2));
    }

    #[test]
    fn empty_context_has_no_people() {
        let context = Context::new();
        assert_eq!(context.get_population_size(), 0);
    }

    #[test]
    #[should_panic(expected = "A population must be installed before it can be queried")]
    fn get_population_panics_when_unset() {
        let context = Context::new();
        let _ = context.get_population();
    }
}
