use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::disease::{HealthStage, Infection};
use crate::error::CommunityError;
use crate::HashSet;

/// Index of a person in the population roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub usize);

impl Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a location within the list of locations of its kind. A home and a workplace can
/// share the same `LocationId`; the pair `(LocationKind, LocationId)` is unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub usize);

impl Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Home,
    Work,
    School,
}

impl LocationKind {
    /// The order in which the day step visits location kinds.
    pub const ALL: [LocationKind; 3] = [
        LocationKind::Home,
        LocationKind::Work,
        LocationKind::School,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            LocationKind::Home => "home",
            LocationKind::Work => "work",
            LocationKind::School => "school",
        }
    }
}

impl Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A grid cell. Only used to place locations for display; transmission ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: u32,
    pub y: u32,
}

impl Coordinates {
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Coordinates { x, y }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub id: PersonId,
    pub age: u8,
    pub home: Option<LocationId>,
    pub workplace: Option<LocationId>,
    pub school: Option<LocationId>,
    /// Cached result of the daily stage update; the infection timeline is authoritative.
    pub health_stage: HealthStage,
    /// Set at most once.
    pub infection: Option<Infection>,
}

impl Person {
    fn new(id: PersonId, age: u8) -> Self {
        Person {
            id,
            age,
            home: None,
            workplace: None,
            school: None,
            health_stage: HealthStage::Healthy,
            infection: None,
        }
    }

    #[must_use]
    pub fn location(&self, kind: LocationKind) -> Option<LocationId> {
        match kind {
            LocationKind::Home => self.home,
            LocationKind::Work => self.workplace,
            LocationKind::School => self.school,
        }
    }

    fn location_mut(&mut self, kind: LocationKind) -> &mut Option<LocationId> {
        match kind {
            LocationKind::Home => &mut self.home,
            LocationKind::Work => &mut self.workplace,
            LocationKind::School => &mut self.school,
        }
    }

    /// Susceptible means never infected; recovered people are immune.
    #[must_use]
    pub fn is_susceptible(&self) -> bool {
        self.infection.is_none() && self.health_stage == HealthStage::Healthy
    }

    #[must_use]
    pub fn infected_by(&self) -> Option<PersonId> {
        self.infection.as_ref().and_then(|infection| infection.infected_by)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: LocationId,
    pub kind: LocationKind,
    /// Target size drawn during generation; `members` never grows beyond it.
    pub capacity: usize,
    pub coordinates: Coordinates,
    pub members: Vec<PersonId>,
    /// Reserved for interventions. Closed locations host no contacts.
    pub is_open: bool,
}

impl Location {
    #[must_use]
    pub fn vacancy(&self) -> usize {
        self.capacity.saturating_sub(self.members.len())
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.vacancy() == 0
    }
}

/// People plus their homes, workplaces and schools, stored as arenas indexed by id.
///
/// The generator builds one from demographic distributions, but the builder methods are public
/// so tests and callers can lay out a community by hand:
///
/// ```
/// use community_sim::population::{Coordinates, LocationKind, Population};
///
/// let mut population = Population::new();
/// let home = population
///     .add_location(LocationKind::Home, 2, Coordinates::new(0, 0))
///     .unwrap();
/// for age in [34, 36] {
///     let person = population.add_person(age);
///     population.assign(person, LocationKind::Home, home).unwrap();
/// }
/// assert_eq!(population.location(LocationKind::Home, home).members.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Population {
    people: Vec<Person>,
    homes: Vec<Location>,
    workplaces: Vec<Location>,
    schools: Vec<Location>,
    occupied_cells: HashSet<Coordinates>,
}

impl Population {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_person(&mut self, age: u8) -> PersonId {
        let id = PersonId(self.people.len());
        self.people.push(Person::new(id, age));
        id
    }

    /// Adds an open, empty location of the given kind.
    ///
    /// # Errors
    ///
    /// Returns `CommunityError::ConfigError` if another location already occupies `coordinates`.
    pub fn add_location(
        &mut self,
        kind: LocationKind,
        capacity: usize,
        coordinates: Coordinates,
    ) -> Result<LocationId, CommunityError> {
        if !self.occupied_cells.insert(coordinates) {
            return Err(CommunityError::ConfigError(format!(
                "cell ({}, {}) already holds a location",
                coordinates.x, coordinates.y
            )));
        }
        let locations = self.locations_mut(kind);
        let id = LocationId(locations.len());
        locations.push(Location {
            id,
            kind,
            capacity,
            coordinates,
            members: Vec::new(),
            is_open: true,
        });
        Ok(id)
    }

    /// Makes `person` a member of `location`.
    ///
    /// # Errors
    ///
    /// Returns `CommunityError::ConfigError` if the location is full or the person already
    /// belongs to a location of this kind.
    ///
    /// # Panics
    ///
    /// Panics if either id does not exist.
    pub fn assign(
        &mut self,
        person: PersonId,
        kind: LocationKind,
        location: LocationId,
    ) -> Result<(), CommunityError> {
        if let Some(existing) = self.person(person).location(kind) {
            return Err(CommunityError::ConfigError(format!(
                "person {person} already belongs to {kind} {existing}"
            )));
        }
        if self.location(kind, location).is_full() {
            return Err(CommunityError::ConfigError(format!(
                "{kind} {location} is at capacity"
            )));
        }
        self.join(person, kind, location);
        Ok(())
    }

    /// `assign` without the checks, for callers that track vacancies themselves.
    pub(crate) fn join(&mut self, person: PersonId, kind: LocationKind, location: LocationId) {
        debug_assert!(!self.location(kind, location).is_full());
        *self.people[person.0].location_mut(kind) = Some(location);
        self.locations_mut(kind)[location.0].members.push(person);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.people.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    #[must_use]
    pub fn people(&self) -> &[Person] {
        &self.people
    }

    /// # Panics
    ///
    /// Panics if `id` is not in the population.
    #[must_use]
    pub fn person(&self, id: PersonId) -> &Person {
        &self.people[id.0]
    }

    pub(crate) fn person_mut(&mut self, id: PersonId) -> &mut Person {
        &mut self.people[id.0]
    }

    pub(crate) fn people_mut(&mut self) -> &mut [Person] {
        &mut self.people
    }

    #[must_use]
    pub fn locations(&self, kind: LocationKind) -> &[Location] {
        match kind {
            LocationKind::Home => &self.homes,
            LocationKind::Work => &self.workplaces,
            LocationKind::School => &self.schools,
        }
    }

    /// # Panics
    ///
    /// Panics if there is no location `id` of this kind.
    #[must_use]
    pub fn location(&self, kind: LocationKind, id: LocationId) -> &Location {
        &self.locations(kind)[id.0]
    }

    fn locations_mut(&mut self, kind: LocationKind) -> &mut Vec<Location> {
        match kind {
            LocationKind::Home => &mut self.homes,
            LocationKind::Work => &mut self.workplaces,
            LocationKind::School => &mut self.schools,
        }
    }

    /// Opens or closes a location for contacts.
    pub fn set_location_open(&mut self, kind: LocationKind, id: LocationId, is_open: bool) {
        self.locations_mut(kind)[id.0].is_open = is_open;
    }
}
