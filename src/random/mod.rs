mod context_ext;
mod macros;

use std::any::{Any, TypeId};
use std::cell::RefCell;

pub use context_ext::ContextRandomExt;
pub use macros::define_rng;

use crate::rand::SeedableRng;
use crate::{define_data_plugin, HashMap};

pub trait RngId: Copy + Clone {
    type RngType: SeedableRng;
    fn get_name() -> &'static str;
}

// Type-erased so streams can use any `SeedableRng`.
struct RngHolder {
    rng: Box<dyn Any>,
}

struct RngData {
    base_seed: u64,
    rng_holders: RefCell<HashMap<TypeId, RngHolder>>,
}

// Streams live in a RefCell so sampling only needs `&Context`.
define_data_plugin!(
    RngPlugin,
    RngData,
    RngData {
        base_seed: 0,
        rng_holders: RefCell::new(HashMap::default()),
    }
);
