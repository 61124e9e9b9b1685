//! Diagnostic logging for the simulator. This is not to be confused with _reporting_
//! (see `crate::report`), which records model output such as daily stage counts.
//!
//! The five `log` macros (`error!`, `warn!`, `info!`, `debug!`, `trace!`) are re-exported here.
//! Generation summaries and run milestones are logged at `info`, each simulated day at `debug`,
//! and each infection at `trace`.
//!
//! Logging is _disabled_ by default. The `community-sim` binary enables it with
//! `--log-level <level>`; library users call the functions below:
//!
//!  - `enable_logging()`: turns on all log messages
//!  - `disable_logging()`: turns off all log messages
//!  - `set_log_level(level: LevelFilter)`: enables only log messages with priority at least `level`
//!
//! Per-module filters are set with `set_module_filter()` / `set_module_filters()` and removed
//! with `remove_module_filter()`:
//!
//! ```rust
//! use community_sim::log::{set_log_level, set_module_filter, LevelFilter};
//!
//! set_log_level(LevelFilter::Info);
//! // Every infection in the transmission engine.
//! set_module_filter("community_sim::transmission", LevelFilter::Trace);
//! ```
#[cfg(feature = "logging")]
mod standard_logger;

#[cfg(not(feature = "logging"))]
mod null_logger;

pub use log::{debug, error, info, trace, warn, LevelFilter};
use std::collections::hash_map::Entry;

use crate::HashMap;
#[cfg(feature = "logging")]
use log4rs::Handle;
use std::sync::LazyLock;
use std::sync::{Mutex, MutexGuard};

const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Off;

static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> = LazyLock::new(Mutex::default);

/// A level filter for log messages whose target starts with `module`
/// (e.g. `"community_sim::population"`).
#[derive(Debug, PartialEq)]
struct ModuleLogConfiguration {
    module: String,
    level: LevelFilter,
}

impl From<(&str, LevelFilter)> for ModuleLogConfiguration {
    fn from((module, level): (&str, LevelFilter)) -> Self {
        Self {
            module: module.to_string(),
            level,
        }
    }
}

/// The global level filter, the per-module filters and the handle to the installed logger.
///
/// Loggers are installed process-wide, so exactly one instance lives in `LOG_CONFIGURATION`;
/// the public free functions lock it and delegate here.
#[derive(Debug)]
pub(in crate::log) struct LogConfiguration {
    /// Applies to targets without a module filter. `LevelFilter::Off` disables logging.
    pub(in crate::log) global_log_level: LevelFilter,
    pub(in crate::log) module_configurations: HashMap<String, ModuleLogConfiguration>,

    #[cfg(feature = "logging")]
    root_handle: Option<Handle>,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        Self {
            global_log_level: DEFAULT_LOG_LEVEL,
            module_configurations: HashMap::default(),

            #[cfg(feature = "logging")]
            root_handle: None,
        }
    }
}

impl LogConfiguration {
    pub(in crate::log) fn set_log_level(&mut self, level: LevelFilter) {
        self.global_log_level = level;
        self.set_config();
    }

    /// Returns true if the configuration was mutated, false otherwise.
    fn insert_module_filter(&mut self, module: &str, level: LevelFilter) -> bool {
        match self.module_configurations.entry(module.to_string()) {
            Entry::Occupied(mut entry) => {
                let module_config = entry.get_mut();
                if module_config.level == level {
                    return false;
                }
                module_config.level = level;
            }
            Entry::Vacant(entry) => {
                entry.insert((module, level).into());
            }
        }
        true
    }

    pub(in crate::log) fn set_module_filter(&mut self, module: &str, level: LevelFilter) {
        if self.insert_module_filter(module, level) {
            self.set_config();
        }
    }

    pub(in crate::log) fn set_module_filters(&mut self, module_filters: &[(&str, LevelFilter)]) {
        let mut mutated = false;
        for (module, level) in module_filters {
            mutated |= self.insert_module_filter(module, *level);
        }
        if mutated {
            self.set_config();
        }
    }

    pub(in crate::log) fn remove_module_filter(&mut self, module: &str) {
        if self.module_configurations.remove(module).is_some() {
            self.set_config();
        }
    }
}

/// Enables every log message. Equivalent to `set_log_level(LevelFilter::Trace)`.
pub fn enable_logging() {
    set_log_level(LevelFilter::Trace);
}

/// Disables logging completely. Equivalent to `set_log_level(LevelFilter::Off)`.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

/// Sets the global log level.
pub fn set_log_level(level: LevelFilter) {
    get_log_configuration().set_log_level(level);
}

/// Sets a level filter for the given module path.
pub fn set_module_filter(module_path: &str, level_filter: LevelFilter) {
    get_log_configuration().set_module_filter(module_path, level_filter);
}

/// Removes the filter for the given module path so the global level applies to it again.
pub fn remove_module_filter(module_path: &str) {
    get_log_configuration().remove_module_filter(module_path);
}

/// Sets several module filters at once, rebuilding the logger only once.
pub fn set_module_filters(module_filters: &[(&str, LevelFilter)]) {
    get_log_configuration().set_module_filters(module_filters);
}

fn get_log_configuration() -> MutexGuard<'static, LogConfiguration> {
    LOG_CONFIGURATION.lock().expect("Mutex poisoned")
}

#[cfg(test)]
mod tests {
    use super::{get_log_configuration, remove_module_filter, set_log_level, set_module_filters};
    use log::{error, trace, LevelFilter};
    use std::sync::{LazyLock, Mutex};

    // The configuration is global, so these tests must not interleave.
    static TEST_MUTEX: LazyLock<Mutex<()>> = LazyLock::new(Mutex::default);

    #[test]
    fn test_set_log_level() {
        let _guard = TEST_MUTEX.lock().expect("Mutex poisoned");
        set_log_level(LevelFilter::Trace);
        set_log_level(LevelFilter::Error);
        {
            let config = get_log_configuration();
            assert_eq!(config.global_log_level, LevelFilter::Error);
            error!("test_set_log_level: global set to error");
            trace!("test_set_log_level: NOT EMITTED");
        }
        set_log_level(LevelFilter::Off);
        assert_eq!(get_log_configuration().global_log_level, LevelFilter::Off);
    }

    #[test]
    fn test_set_remove_module_filters() {
        let _guard = TEST_MUTEX.lock().expect("Mutex poisoned");
        set_log_level(LevelFilter::Info);

        let filters = [
            ("community_sim::transmission", LevelFilter::Trace),
            ("community_sim::population", LevelFilter::Warn),
        ];
        set_module_filters(&filters);
        {
            let config = get_log_configuration();
            for (module_path, level) in &filters {
                assert_eq!(
                    config.module_configurations.get(*module_path),
                    Some(&((*module_path, *level).into()))
                );
            }
        }

        remove_module_filter("community_sim::transmission");
        remove_module_filter("community_sim::population");
        {
            let config = get_log_configuration();
            assert!(!config
                .module_configurations
                .contains_key("community_sim::transmission"));
            assert!(!config
                .module_configurations
                .contains_key("community_sim::population"));
        }
        set_log_level(LevelFilter::Off);
    }
}
