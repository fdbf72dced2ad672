// Economy constants and search knobs

use serde::{Deserialize, Serialize};

use crate::types::{Resource, Ticks};

// === ECONOMY RATES ===

/// Static economy constants that travel with a catalog.
///
/// Harvest rates are per worker per game loop (36.444 minerals and 38 vespene
/// per worker-minute at 16 loops per second).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyRates {
    pub mineral_per_worker_tick: f64,
    pub vespene_per_worker_tick: f64,
    /// Minerals lost when a worker walks off to place a structure
    pub relocation_surcharge: f64,
    /// Workers moved from minerals onto each completed extractor
    pub workers_per_extractor: u32,
    pub hard_population_cap: u32,
    /// Tolerance when comparing banked resources against a cost
    pub resource_epsilon: f64,
}

impl Default for EconomyRates {
    fn default() -> Self {
        Self {
            mineral_per_worker_tick: 36.444 / (60.0 * 16.0),
            vespene_per_worker_tick: 38.0 / (60.0 * 16.0),
            relocation_surcharge: 10.0,
            workers_per_extractor: 3,
            hard_population_cap: 200,
            resource_epsilon: 1e-6,
        }
    }
}

impl EconomyRates {
    pub fn per_worker(&self, resource: Resource) -> f64 {
        match resource {
            Resource::Minerals => self.mineral_per_worker_tick,
            Resource::Vespene => self.vespene_per_worker_tick,
        }
    }

    /// Ticks for `workers` to gather `amount` of `resource`.
    pub fn ticks_to_gather(&self, resource: Resource, amount: f64, workers: u32) -> Ticks {
        amount / (self.per_worker(resource) * workers as f64)
    }
}

// === PLANNER CONFIG ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Dequeues before the search gives up and reports what it has
    pub iteration_cap: usize,
    /// Goal units one producer structure is expected to turn out
    pub units_per_producer: u32,
    /// Upper limit on producer structures derived from goal counts
    pub max_producers: u32,
    /// Resource workers the search may add beyond the current count
    pub extra_workers: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            iteration_cap: 500,
            units_per_producer: 4,
            max_producers: 3,
            extra_workers: 0,
        }
    }
}

impl PlannerConfig {
    pub fn with_iteration_cap(mut self, cap: usize) -> Self {
        self.iteration_cap = cap;
        self
    }

    pub fn with_extra_workers(mut self, workers: u32) -> Self {
        self.extra_workers = workers;
        self
    }

    pub fn with_units_per_producer(mut self, units: u32) -> Self {
        self.units_per_producer = units.max(1);
        self
    }

    pub fn with_max_producers(mut self, producers: u32) -> Self {
        self.max_producers = producers.max(1);
        self
    }
}
