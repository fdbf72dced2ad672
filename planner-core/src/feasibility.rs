//! Feasibility evaluator: how long until production of an entity type could begin.
//!
//! The answer is the maximum over independent constraints (resources,
//! population, prerequisite chain, producer). Any constraint that can never
//! be met from the current state makes the whole query infeasible.

use std::fmt;

use crate::catalog::{Catalog, Producer};
use crate::state::{EconomyState, RecordKind};
use crate::types::{Resource, Ticks, UnitId};

/// Why production of an entity type cannot begin from a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocker {
    /// Cost unpaid and nobody harvests this resource
    NoWorkers(Resource),
    /// Population would exceed the hard cap
    PopulationMaxed,
    /// Population short and no capacity structure under construction covers it
    NoSupplyInProgress,
    /// A prerequisite neither exists nor is being built
    MissingPrerequisite(UnitId),
    /// No supported producer exists or is being built
    NoProducer,
    /// Readiness kept moving while waiting
    Unsettled,
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Blocker::NoWorkers(resource) => write!(f, "no workers harvesting {resource}"),
            Blocker::PopulationMaxed => write!(f, "population at hard cap"),
            Blocker::NoSupplyInProgress => write!(f, "no population capacity on the way"),
            Blocker::MissingPrerequisite(_) => write!(f, "missing a prerequisite"),
            Blocker::NoProducer => write!(f, "no producer available"),
            Blocker::Unsettled => write!(f, "readiness did not settle"),
        }
    }
}

impl Blocker {
    /// Like `Display`, with entity names resolved through `catalog`.
    pub fn describe(&self, catalog: &Catalog) -> String {
        match self {
            Blocker::MissingPrerequisite(unit) => format!("missing prerequisite {}", catalog.name(*unit)),
            other => other.to_string(),
        }
    }
}

/// Ticks until production could begin, or the constraint that rules it out.
pub type Wait = Result<Ticks, Blocker>;

/// Minimum additional ticks until `target` could start from `state`.
pub fn when(catalog: &Catalog, state: &EconomyState, target: UnitId) -> Wait {
    let mut wait: Ticks = 0.0;
    for resource in [Resource::Minerals, Resource::Vespene] {
        wait = wait.max(resource_wait(catalog, state, target, resource)?);
    }
    wait = wait.max(population_wait(catalog, state, catalog[target].population)?);
    wait = wait.max(prerequisite_wait(catalog, state, target)?);
    wait = wait.max(producer_wait(catalog, state, target)?);
    Ok(wait)
}

/// Accrual time for one resource at the current worker allocation.
pub fn resource_wait(
    catalog: &Catalog,
    state: &EconomyState,
    target: UnitId,
    resource: Resource,
) -> Wait {
    let rates = catalog.rates();
    let shortfall = catalog.requirement(target, resource) - state.resources.get(resource);
    if shortfall <= rates.resource_epsilon {
        return Ok(0.0);
    }
    let workers = state.workers.get(resource);
    if workers == 0 {
        return Err(Blocker::NoWorkers(resource));
    }
    Ok(rates.ticks_to_gather(resource, shortfall, workers))
}

/// Ticks until the population cap admits `population` more.
///
/// Capacity structures already under construction are taken in completion
/// order until the cap is high enough. New ones are never assumed.
pub fn population_wait(catalog: &Catalog, state: &EconomyState, population: u32) -> Wait {
    let hard_cap = catalog.rates().hard_population_cap;
    let needed = state.population.used + population;
    if needed <= state.population.cap {
        return Ok(0.0);
    }
    if state.population.cap >= hard_cap || needed > hard_cap {
        return Err(Blocker::PopulationMaxed);
    }

    let mut incoming: Vec<(Ticks, u32)> = state
        .in_progress
        .iter()
        .filter(|r| r.kind == RecordKind::Construction)
        .filter_map(|r| {
            let supply = catalog[r.unit].supply_provided;
            (supply > 0).then_some((r.remaining, supply))
        })
        .collect();
    incoming.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut cap = state.population.cap;
    for (remaining, supply) in incoming {
        cap = (cap + supply).min(hard_cap);
        if needed <= cap {
            return Ok(remaining);
        }
    }
    Err(Blocker::NoSupplyInProgress)
}

/// Every ancestor in the prerequisite chain must exist or be under construction.
pub fn prerequisite_wait(catalog: &Catalog, state: &EconomyState, target: UnitId) -> Wait {
    let mut wait: Ticks = 0.0;
    for prerequisite in catalog.prerequisites(target) {
        let ready = if state.completed(prerequisite) > 0 {
            Some(0.0)
        } else {
            state.earliest_construction(prerequisite)
        };
        wait = wait.max(ready.ok_or(Blocker::MissingPrerequisite(prerequisite))?);
    }
    Ok(wait)
}

/// Soonest any supported producer of `target` is idle.
pub fn producer_wait(catalog: &Catalog, state: &EconomyState, target: UnitId) -> Wait {
    catalog[target]
        .supported_producers()
        .filter_map(|producer| producer_ready(state, producer))
        .min_by(f64::total_cmp)
        .ok_or(Blocker::NoProducer)
}

fn producer_ready(state: &EconomyState, producer: &Producer) -> Option<Ticks> {
    let unit = producer.unit();
    if state.idle(unit) > 0 {
        return Some(0.0);
    }
    match producer {
        // Relocating workers are never busy, so only new ones can show up
        Producer::WorkerRelocation(_) => state.earliest_construction(unit),
        // A structure frees up when an order finishes or a new one completes
        Producer::Structure(_) => state.earliest(unit),
        Producer::Excluded { .. } => None,
    }
}
