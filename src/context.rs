//! The `Context` is the single owned object that holds the whole state of a simulated
//! community: every module keeps its data in a data plugin stored on the `Context`, and the
//! `Context` owns the day counter that `simulate_day` advances.
//!
//! Modules expose their behavior as extension traits on `Context` (`ContextPopulationExt`,
//! `ContextHealthExt`, ...) rather than through free-standing global state.
use std::any::{Any, TypeId};

use log::trace;

use crate::HashMap;

/// A simulated day, counted from the start of the simulation.
pub type Day = u32;

/// A trait for objects that can provide data containers to be held by `Context`
pub trait DataPlugin: Any {
    type DataContainer;

    fn create_data_container() -> Self::DataContainer;
}

/// Defines a new type for storing data in Context.
#[macro_export]
macro_rules! define_data_plugin {
    ($data_plugin:ident, $data_container:ty, $default: expr) => {
        struct $data_plugin;

        impl $crate::context::DataPlugin for $data_plugin {
            type DataContainer = $data_container;

            fn create_data_container() -> Self::DataContainer {
                $default
            }
        }
    };
}
pub use define_data_plugin;

pub struct Context {
    data_plugins: HashMap<TypeId, Box<dyn Any>>,
    current_day: Day,
    shutdown_requested: bool,
}

impl Context {
    #[must_use]
    pub fn new() -> Context {
        Context {
            data_plugins: HashMap::default(),
            current_day: 0,
            shutdown_requested: false,
        }
    }

    fn add_plugin<T: DataPlugin>(&mut self) {
        self.data_plugins
            .insert(TypeId::of::<T>(), Box::new(T::create_data_container()));
    }

    /// Returns a mutable reference to the data container for `T`, creating it if it doesn't
    /// exist yet.
    #[allow(clippy::needless_pass_by_value)]
    pub fn get_data_container_mut<T: DataPlugin>(&mut self, _plugin: T) -> &mut T::DataContainer {
        let type_id = TypeId::of::<T>();
        if !self.data_plugins.contains_key(&type_id) {
            self.add_plugin::<T>();
        }
        self.data_plugins
            .get_mut(&type_id)
            .unwrap()
            .downcast_mut::<T::DataContainer>()
            .unwrap() // Will never panic as data container has the matching type
    }

    /// Returns a reference to the data container for `T` if it exists.
    #[allow(clippy::needless_pass_by_value)]
    #[must_use]
    pub fn get_data_container<T: DataPlugin>(&self, _plugin: T) -> Option<&T::DataContainer> {
        self.data_plugins
            .get(&TypeId::of::<T>())
            .and_then(|data| data.downcast_ref::<T::DataContainer>())
    }

    /// The day the next call to `simulate_day` will simulate.
    #[must_use]
    pub fn get_current_day(&self) -> Day {
        self.current_day
    }

    /// Moves the day counter forward by exactly one day. Only the day step calls this.
    pub(crate) fn advance_day(&mut self) {
        self.current_day += 1;
        trace!("advanced to day {}", self.current_day);
    }

    /// Asks any driver stepping this context to stop after the current day.
    pub fn shutdown(&mut self) {
        trace!("shutdown requested on day {}", self.current_day);
        self.shutdown_requested = true;
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_requested
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
