//! An agent-based model of disease spread through a synthetic community.
//!
//! A community is a population of people, each living in one home and possibly working at one
//! workplace or attending one school. The simulation advances one day at a time: at every
//! location, contagious people make a bounded number of close contacts with the other members,
//! each of which may infect a susceptible person. Every infection follows a timeline drawn when
//! it begins
//!
//! healthy -> incubating -> asymptomatic (contagious) -> symptomatic -> recovered | dead
//!
//! and each person's stage is re-derived from that timeline at the end of every day.
//!
//! The central object is the `Context`, which owns all the state of a community. Each module
//! keeps its data on the `Context` and exposes its behavior as an extension trait:
//! * `parameters`: demographic, disease and contact parameters, loaded from JSON and validated.
//! * `population`: generates people and locations from the demographic distributions.
//! * `disease`: draws infection timelines and outcomes, and derives stages from them.
//! * `seeding`: introduces the initial infections.
//! * `transmission`: the day step.
//! * `health`: stage counts and the reproduction number estimate.
//! * `incidence_report`: CSV output of a run.
//!
//! ```
//! use community_sim::{
//!     build_community, Context, ContextHealthExt, ContextTransmissionExt, Parameters,
//! };
//!
//! let mut context = Context::new();
//! build_community(&mut context, Parameters::default(), 42).unwrap();
//! while !context.is_epidemic_over() && context.get_current_day() < 100 {
//!     let day = context.simulate_day();
//!     assert_eq!(context.get_status_counts().total(), 200);
//!     assert!(day.r0 >= 0.0);
//! }
//! ```
pub mod context;
pub mod disease;
pub mod distribution;
pub mod error;
pub mod hashing;
pub mod health;
pub mod incidence_report;
pub mod log;
pub mod parameters;
pub mod population;
pub mod random;
pub mod report;
pub mod runner;
pub mod seeding;
pub mod transmission;

// Re-exported for macros
pub use paste;
pub use rand;

pub use context::{Context, Day};
pub use disease::{ContextDiseaseExt, HealthStage, Infection};
pub use error::CommunityError;
pub use hashing::{HashMap, HashSet};
pub use health::{ContextHealthExt, StatusCounts};
pub use incidence_report::ContextIncidenceReportExt;
pub use parameters::{ContextParametersExt, Parameters};
pub use population::{ContextPopulationExt, LocationId, LocationKind, PersonId, Population};
pub use random::ContextRandomExt;
pub use report::ContextReportExt;
pub use runner::{build_community, populate_community, run_simulation};
pub use seeding::ContextSeedingExt;
pub use transmission::{ContextTransmissionExt, DayResult};
