use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use tsify_next::Tsify;

// ============================================================================
// IDs - Using slotmap for generational indices
// ============================================================================

new_key_type! {
    /// An entity type in a [`Catalog`](crate::Catalog). Keys order by
    /// insertion, which keeps every iteration over catalog entries stable.
    pub struct UnitId;
}

/// Simulation time in game loops. Waits are continuous, so ticks are fractional.
pub type Ticks = f64;

// ============================================================================
// Resources - What workers harvest
// ============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum Resource {
    Minerals,
    Vespene,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Minerals => write!(f, "minerals"),
            Resource::Vespene => write!(f, "vespene"),
        }
    }
}

/// Banked resources. Only an action's cost ever lowers these.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Resources {
    pub minerals: f64,
    pub vespene: f64,
}

impl Resources {
    pub fn new(minerals: f64, vespene: f64) -> Self {
        Self { minerals, vespene }
    }

    pub fn get(&self, resource: Resource) -> f64 {
        match resource {
            Resource::Minerals => self.minerals,
            Resource::Vespene => self.vespene,
        }
    }
}

/// Harvesters assigned per resource; drives the accrual rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Workers {
    pub minerals: u32,
    pub vespene: u32,
}

impl Workers {
    pub fn new(minerals: u32, vespene: u32) -> Self {
        Self { minerals, vespene }
    }

    pub fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Minerals => self.minerals,
            Resource::Vespene => self.vespene,
        }
    }
}

/// Population in use and the current cap. `used <= cap <= hard cap` holds
/// for every state the planner produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Population {
    pub used: u32,
    pub cap: u32,
}

impl Population {
    pub fn new(used: u32, cap: u32) -> Self {
        Self { used, cap }
    }

    pub fn headroom(&self) -> u32 {
        self.cap.saturating_sub(self.used)
    }
}
