//! Synthesizes a population from the demographic distributions in `Parameters`.
use std::ops::RangeInclusive;

use log::{debug, info, warn};

use crate::distribution::{cumulative, sample_cdf};
use crate::parameters::Parameters;
use crate::population::grid::Grid;
use crate::population::{LocationId, LocationKind, PersonId, Population};
use crate::rand::Rng;

/// The oldest age drawn for the open-ended 80+ decade.
pub const MAX_AGE: u8 = 99;
/// Youngest age assigned a school or counted in any age group.
pub const SCHOOL_START_AGE: u8 = 6;
pub const ADULT_AGE: u8 = 19;
pub const SENIOR_AGE: u8 = 65;

/// Age groups that determine eligibility for work and school.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeGroup {
    Preschool,
    Child,
    Adult,
    Senior,
}

impl AgeGroup {
    #[must_use]
    pub fn of(age: u8) -> Self {
        if age < SCHOOL_START_AGE {
            AgeGroup::Preschool
        } else if age < ADULT_AGE {
            AgeGroup::Child
        } else if age < SENIOR_AGE {
            AgeGroup::Adult
        } else {
            AgeGroup::Senior
        }
    }
}

/// Number of people in each age group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgeTally {
    pub children: usize,
    pub adults: usize,
    pub seniors: usize,
}

fn age_range(decade: usize, decades: usize) -> RangeInclusive<u8> {
    // Decades are bounded by the 9-entry age distribution, so this fits in a u8.
    let start = u8::try_from(decade * 10).unwrap_or(u8::MAX - 9);
    if decade + 1 >= decades {
        start..=MAX_AGE.max(start)
    } else {
        start..=start + 9
    }
}

/// Workplace size buckets: ten of width 10 covering 0-99, then 100-149, 150-199 and 200.
pub fn workplace_size_range(bucket: usize) -> RangeInclusive<usize> {
    match bucket {
        0..=9 => 10 * bucket..=10 * bucket + 9,
        10 => 100..=149,
        11 => 150..=199,
        _ => 200..=200,
    }
}

/// School size buckets: ten of width 100 covering 0-999, then 1000.
pub fn school_size_range(bucket: usize) -> RangeInclusive<usize> {
    match bucket {
        0..=9 => 100 * bucket..=100 * bucket + 99,
        _ => 1000..=1000,
    }
}

/// Draws location sizes until they cover `demand` exactly; the last one is clipped to fit.
/// Zero-size draws are discarded and redrawn.
fn draw_capacities<R: Rng>(
    rng: &mut R,
    cdf: &[f64],
    demand: usize,
    size_range: impl Fn(usize) -> RangeInclusive<usize>,
) -> Vec<usize> {
    let mut capacities = Vec::new();
    let mut remaining = demand;
    while remaining > 0 {
        let bucket = sample_cdf(rng, cdf);
        let size = rng.random_range(size_range(bucket));
        if size == 0 {
            continue;
        }
        let size = size.min(remaining);
        capacities.push(size);
        remaining -= size;
    }
    capacities
}

/// Locations of one kind that still have room.
struct VacancyPool {
    kind: LocationKind,
    open: Vec<LocationId>,
}

impl VacancyPool {
    fn new(population: &Population, kind: LocationKind) -> Self {
        let open = population
            .locations(kind)
            .iter()
            .filter(|location| !location.is_full())
            .map(|location| location.id)
            .collect();
        VacancyPool { kind, open }
    }

    /// Joins `person` to a uniformly random location with room. Returns false if every
    /// location is full.
    fn place<R: Rng>(
        &mut self,
        rng: &mut R,
        population: &mut Population,
        person: PersonId,
    ) -> bool {
        if self.open.is_empty() {
            warn!("no {} has room for person {person}", self.kind);
            return false;
        }
        let idx = rng.random_range(0..self.open.len());
        let location = self.open[idx];
        population.join(person, self.kind, location);
        if population.location(self.kind, location).is_full() {
            self.open.swap_remove(idx);
        }
        true
    }
}

fn add_locations<R: Rng>(
    rng: &mut R,
    population: &mut Population,
    grid: &mut Grid,
    kind: LocationKind,
    capacities: &[usize],
) {
    for &capacity in capacities {
        // Cells come from a grid that only hands out free ones.
        let cell = grid.take_random_cell(rng);
        population
            .add_location(kind, capacity, cell)
            .unwrap_or_else(|e| panic!("grid produced an occupied cell: {e}"));
    }
}

/// Builds a population from validated parameters.
pub fn generate<R: Rng>(rng: &mut R, parameters: &Parameters) -> Population {
    let size = parameters.population;
    let mut population = Population::new();
    let mut grid = Grid::for_population(size);

    // Ages
    let age_cdf = cumulative(&parameters.age_distribution);
    let decades = parameters.age_distribution.len();
    let mut tally = AgeTally::default();
    for _ in 0..size {
        let decade = sample_cdf(rng, &age_cdf);
        let age = rng.random_range(age_range(decade, decades));
        match AgeGroup::of(age) {
            AgeGroup::Preschool => {}
            AgeGroup::Child => tally.children += 1,
            AgeGroup::Adult => tally.adults += 1,
            AgeGroup::Senior => tally.seniors += 1,
        }
        population.add_person(age);
    }

    // Households, index 0 of the distribution is a household of one.
    let household_cdf = cumulative(&parameters.household_size_distribution);
    let household_sizes = draw_capacities(rng, &household_cdf, size, |bucket| {
        bucket + 1..=bucket + 1
    });
    add_locations(rng, &mut population, &mut grid, LocationKind::Home, &household_sizes);
    let mut homes = VacancyPool::new(&population, LocationKind::Home);
    for idx in 0..size {
        homes.place(rng, &mut population, PersonId(idx));
    }

    // Workplaces and schools
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let employed_seniors =
        (parameters.senior_employment_ratio * tally.seniors as f64).round() as usize;
    let work_slots = tally.adults + employed_seniors;
    let workplace_cdf = cumulative(&parameters.workplace_size_distribution);
    let workplace_sizes = draw_capacities(rng, &workplace_cdf, work_slots, workplace_size_range);
    add_locations(rng, &mut population, &mut grid, LocationKind::Work, &workplace_sizes);

    let school_cdf = cumulative(&parameters.school_size_distribution);
    let school_sizes = draw_capacities(rng, &school_cdf, tally.children, school_size_range);
    add_locations(rng, &mut population, &mut grid, LocationKind::School, &school_sizes);

    let mut workplaces = VacancyPool::new(&population, LocationKind::Work);
    let mut schools = VacancyPool::new(&population, LocationKind::School);
    // Seniors fill their quota in roster order.
    let mut seniors_hired = 0;
    for idx in 0..size {
        let person = PersonId(idx);
        match AgeGroup::of(population.person(person).age) {
            AgeGroup::Preschool => {}
            AgeGroup::Child => {
                schools.place(rng, &mut population, person);
            }
            AgeGroup::Adult => {
                workplaces.place(rng, &mut population, person);
            }
            AgeGroup::Senior => {
                if seniors_hired < employed_seniors {
                    workplaces.place(rng, &mut population, person);
                    seniors_hired += 1;
                }
            }
        }
    }

    info!(
        "generated {size} people: {} children, {} adults, {} seniors ({employed_seniors} employed)",
        tally.children, tally.adults, tally.seniors
    );
    info!(
        "generated {} homes, {} workplaces, {} schools on a {}x{} grid",
        household_sizes.len(),
        workplace_sizes.len(),
        school_sizes.len(),
        grid.side(),
        grid.side()
    );
    debug!("household sizes: {household_sizes:?}");
    population
}
