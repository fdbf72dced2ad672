use std::collections::BTreeMap;

use crate::catalog::Catalog;
use crate::error::PlannerError;
use crate::state::{EconomyState, RecordKind};
use crate::types::{Ticks, UnitId};

/// Target composition: minimum completed count per entity type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Goal(BTreeMap<UnitId, u32>);

impl Goal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, unit: UnitId, count: u32) -> Self {
        if count > 0 {
            self.0.insert(unit, count);
        }
        self
    }

    /// Resolve a name-keyed goal, e.g. one parsed from JSON.
    pub fn from_names(catalog: &Catalog, counts: &BTreeMap<String, u32>) -> Result<Self, PlannerError> {
        counts
            .iter()
            .try_fold(Self::new(), |goal, (name, count)| {
                Ok(goal.with(catalog.resolve(name)?, *count))
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnitId, u32)> + '_ {
        self.0.iter().map(|(unit, count)| (*unit, *count))
    }

    pub fn required(&self, unit: UnitId) -> u32 {
        self.0.get(&unit).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every goal entry exists as a completed entity
    pub fn is_satisfied(&self, state: &EconomyState) -> bool {
        self.iter()
            .all(|(unit, required)| state.completed(unit) >= required)
    }

    /// Nothing left to start: completed plus under construction covers the goal
    pub fn is_covered(&self, state: &EconomyState) -> bool {
        self.iter().all(|(unit, required)| {
            state.completed(unit) + state.under_construction(unit) >= required
        })
    }

    /// Ticks until the construction records counted towards the goal have all
    /// finished. `None` while the goal is not covered.
    pub fn outstanding_ticks(&self, state: &EconomyState) -> Option<Ticks> {
        let mut wait: Ticks = 0.0;
        for (unit, required) in self.iter() {
            let needed = required.saturating_sub(state.completed(unit)) as usize;
            if needed == 0 {
                continue;
            }
            let mut remaining = construction_remaining(state, unit);
            if remaining.len() < needed {
                return None;
            }
            remaining.sort_by(f64::total_cmp);
            wait = wait.max(remaining[needed - 1]);
        }
        Some(wait)
    }

    /// Rough ticks of production still separating `state` from the goal.
    /// Diagnostic only; the search never orders by it.
    pub fn distance(&self, catalog: &Catalog, state: &EconomyState) -> Ticks {
        self.iter()
            .map(|(unit, required)| {
                let needed = required.saturating_sub(state.completed(unit)) as usize;
                let mut remaining = construction_remaining(state, unit);
                remaining.sort_by(f64::total_cmp);
                let started = remaining.len().min(needed);
                let unstarted = (needed - started) as f64 * catalog[unit].build_ticks;
                unstarted + remaining[..started].iter().sum::<f64>()
            })
            .sum()
    }

    /// Population the goal still has to add beyond what is owned
    pub fn missing_population(&self, catalog: &Catalog, state: &EconomyState) -> u32 {
        self.iter()
            .map(|(unit, required)| required.saturating_sub(state.owned(unit)) * catalog[unit].population)
            .sum()
    }
}

fn construction_remaining(state: &EconomyState, unit: UnitId) -> Vec<Ticks> {
    state
        .records(unit)
        .filter(|r| r.kind == RecordKind::Construction)
        .map(|r| r.remaining)
        .collect()
}
