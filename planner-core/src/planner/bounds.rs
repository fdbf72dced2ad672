// Action set derivation - which entity types the search may start, and how many
//
// Bounds keep branching finite. Each action's bound is the largest of the
// categories it falls into, and never less than what is already owned.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{Catalog, Producer, Role};
use crate::config::PlannerConfig;
use crate::planner::goal::Goal;
use crate::state::{EconomyState, RecordKind};
use crate::types::UnitId;

/// Entity types the search may start, with a per-type owned-count ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionSet {
    bounds: BTreeMap<UnitId, u32>,
}

impl ActionSet {
    pub fn derive(catalog: &Catalog, root: &EconomyState, goal: &Goal, config: &PlannerConfig) -> Self {
        let mut actions: BTreeSet<UnitId> = BTreeSet::new();
        close_over(catalog, &mut actions, goal.iter().map(|(unit, _)| unit));

        // Secondary resource anywhere in the chain needs an extractor
        let needs_vespene = actions.iter().any(|unit| catalog[*unit].vespene > 0.0);
        let extractor = catalog.with_role(Role::Extractor).filter(|_| needs_vespene);

        let missing_population = goal.missing_population(catalog, root);
        let supply = catalog
            .with_role(Role::Supply)
            .filter(|_| missing_population > 0);

        close_over(catalog, &mut actions, extractor.into_iter().chain(supply));

        let mut bounds = BTreeMap::new();
        for &unit in &actions {
            let bound = bound_for(catalog, root, goal, config, unit, missing_population);
            bounds.insert(unit, bound);
        }
        Self { bounds }
    }

    pub fn bound(&self, unit: UnitId) -> u32 {
        self.bounds.get(&unit).copied().unwrap_or(0)
    }

    pub fn contains(&self, unit: UnitId) -> bool {
        self.bounds.contains_key(&unit)
    }

    /// Actions in catalog order with their bounds
    pub fn iter(&self) -> impl Iterator<Item = (UnitId, u32)> + '_ {
        self.bounds.iter().map(|(unit, bound)| (*unit, *bound))
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }
}

/// Add `seeds` plus their supported producers and prerequisites, transitively.
fn close_over(catalog: &Catalog, actions: &mut BTreeSet<UnitId>, seeds: impl Iterator<Item = UnitId>) {
    let mut pending: Vec<UnitId> = seeds.collect();
    while let Some(unit) = pending.pop() {
        if !actions.insert(unit) {
            continue;
        }
        let entity = &catalog[unit];
        pending.extend(entity.supported_producers().map(Producer::unit));
        pending.extend(entity.prerequisite);
    }
}

fn bound_for(
    catalog: &Catalog,
    root: &EconomyState,
    goal: &Goal,
    config: &PlannerConfig,
    unit: UnitId,
    missing_population: u32,
) -> u32 {
    let owned = root.owned(unit);
    let entity = &catalog[unit];
    let mut bound = owned.max(1);

    let required = goal.required(unit);
    bound = bound.max(required);

    match entity.role {
        Role::ResourceWorker => {
            bound = bound.max(owned.max(1) + config.extra_workers);
        }
        Role::Supply if entity.supply_provided > 0 => {
            let incoming: u32 = root
                .in_progress
                .iter()
                .filter(|r| r.kind == RecordKind::Construction)
                .map(|r| catalog[r.unit].supply_provided)
                .sum();
            let hard_cap = catalog.rates().hard_population_cap;
            let needed_cap = (root.population.used + missing_population).min(hard_cap);
            let shortfall = needed_cap.saturating_sub(root.population.cap + incoming);
            bound = bound.max(owned + shortfall.div_ceil(entity.supply_provided));
        }
        _ => {}
    }

    // Producer structures scale with how many goal units depend on them
    let dependents: u32 = goal
        .iter()
        .filter(|(target, _)| {
            catalog[*target]
                .supported_producers()
                .any(|p| *p == Producer::Structure(unit))
        })
        .map(|(target, count)| count.saturating_sub(root.owned(target)))
        .sum();
    if dependents > 0 {
        let producers = dependents
            .div_ceil(config.units_per_producer.max(1))
            .clamp(1, config.max_producers.max(1));
        bound = bound.max(owned.max(producers));
    }

    bound
}
