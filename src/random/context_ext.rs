use std::any::TypeId;
use std::cell::RefMut;

use log::trace;

use crate::context::Context;
use crate::hashing::hash_str;
use crate::rand::distr::uniform::{SampleRange, SampleUniform};
use crate::rand::{Rng, SeedableRng};
use crate::random::{RngHolder, RngId, RngPlugin};

/// Borrows the stream for `R`, creating it on first use from the base seed and the stream
/// name. Panics if `init_random` has not been called.
fn get_rng<R: RngId + 'static>(context: &Context) -> RefMut<'_, R::RngType> {
    let data_container = context
        .get_data_container(RngPlugin)
        .expect("You must initialize the random number generator with a base seed");

    let rng_holders = data_container.rng_holders.try_borrow_mut().unwrap();
    RefMut::map(rng_holders, |holders| {
        holders
            .entry(TypeId::of::<R>())
            .or_insert_with(|| {
                trace!(
                    "creating new RNG {} (seed={})",
                    R::get_name(),
                    data_container.base_seed
                );
                let base_seed = data_container.base_seed;
                let seed_offset = hash_str(R::get_name());
                RngHolder {
                    rng: Box::new(R::RngType::seed_from_u64(
                        base_seed.wrapping_add(seed_offset),
                    )),
                }
            })
            .rng
            .downcast_mut::<R::RngType>()
            .unwrap()
    })
}

/// Named random streams. Every stochastic part of the model (population generation,
/// seeding, infection courses, transmission) draws from its own stream, so changing how
/// much one part samples does not shift the draws seen by the others.
pub trait ContextRandomExt {
    /// Sets the base seed. Streams are (re)created lazily from it on first use, so calling
    /// this again restarts every stream.
    fn init_random(&mut self, base_seed: u64);

    /// Applies `sampler` to the stream for `rng_id`. The stream stays borrowed while
    /// `sampler` runs, so `sampler` must not sample the same stream again.
    ///
    /// # Panics
    ///
    /// Panics if `init_random` has not been called.
    fn sample<R: RngId + 'static, T>(
        &self,
        rng_id: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T;

    /// A uniform draw from `range`.
    fn sample_range<R: RngId + 'static, S, T>(&self, rng_id: R, range: S) -> T
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform;

    /// True with probability `p`.
    fn sample_bool<R: RngId + 'static>(&self, rng_id: R, p: f64) -> bool
    where
        R::RngType: Rng;
}

impl ContextRandomExt for Context {
    fn init_random(&mut self, base_seed: u64) {
        trace!("initializing random module");
        let data_container = self.get_data_container_mut(RngPlugin);
        data_container.base_seed = base_seed;

        // Dropped streams are re-seeded from the new base seed on next use.
        let mut rng_map = data_container.rng_holders.try_borrow_mut().unwrap();
        rng_map.clear();
    }

    fn sample<R: RngId + 'static, T>(
        &self,
        _rng_id: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T {
        let mut rng = get_rng::<R>(self);
        sampler(&mut rng)
    }

    fn sample_range<R: RngId + 'static, S, T>(&self, rng_id: R, range: S) -> T
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform,
    {
        self.sample(rng_id, |rng| rng.random_range(range))
    }

    fn sample_bool<R: RngId + 'static>(&self, rng_id: R, p: f64) -> bool
    where
        R::RngType: Rng,
    {
        self.sample(rng_id, |rng| rng.random_bool(p))
    }
}

#[cfg(test)]
mod test {
    use crate::context::Context;
    use crate::define_rng;
    use crate::rand::RngCore;
    use crate::random::ContextRandomExt;

    define_rng!(FooRng);
    define_rng!(BarRng);

    #[test]
    fn get_rng_basic() {
        let mut context = Context::new();
        context.init_random(42);

        assert_ne!(
            context.sample(FooRng, RngCore::next_u64),
            context.sample(FooRng, RngCore::next_u64)
        );
    }

    #[test]
    #[should_panic(expected = "You must initialize the random number generator with a base seed")]
    fn panic_if_not_initialized() {
        let context = Context::new();
        context.sample(FooRng, RngCore::next_u64);
    }

    #[test]
    fn multiple_rng_types() {
        let mut context = Context::new();
        context.init_random(42);

        assert_ne!(
            context.sample(FooRng, RngCore::next_u64),
            context.sample(BarRng, RngCore::next_u64)
        );
    }

    #[test]
    fn reset_seed() {
        let mut context = Context::new();
        context.init_random(42);

        let run_0 = context.sample(FooRng, RngCore::next_u64);
        let run_1 = context.sample(FooRng, RngCore::next_u64);

        // Reset with same seed, ensure we get the same values
        context.init_random(42);
        assert_eq!(run_0, context.sample(FooRng, RngCore::next_u64));
        assert_eq!(run_1, context.sample(FooRng, RngCore::next_u64));

        // Reset with different seed, ensure we get different values
        context.init_random(88);
        assert_ne!(run_0, context.sample(FooRng, RngCore::next_u64));
        assert_ne!(run_1, context.sample(FooRng, RngCore::next_u64));
    }

    #[test]
    fn sample_range() {
        let mut context = Context::new();
        context.init_random(42);
        let result = context.sample_range(FooRng, 0..10);
        assert!((0..10).contains(&result));
        let inclusive: u32 = context.sample_range(FooRng, 3..=3);
        assert_eq!(inclusive, 3);
    }

    #[test]
    fn sample_bool_extremes() {
        let mut context = Context::new();
        context.init_random(42);
        assert!(context.sample_bool(FooRng, 1.0));
        assert!(!context.sample_bool(FooRng, 0.0));
    }
}
