// Economy state - the value snapshot the planner searches over
//
// Every search branch owns its own copy; children are made with `clone()` and
// never share mutable data with their parent.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::types::{Population, Resources, Ticks, UnitId, Workers};

// ============================================================================
// In-progress records
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    /// A new entity being built; completion applies the type's effect
    Construction,
    /// A producer busy with an order; completion only frees it again
    Occupied,
}

/// An entity type paired with the ticks left until it completes.
/// `remaining > 0` for every record stored in a state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InProgress {
    pub unit: UnitId,
    pub remaining: Ticks,
    pub kind: RecordKind,
}

// ============================================================================
// Economy State
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EconomyState {
    pub resources: Resources,
    pub workers: Workers,
    pub population: Population,
    /// Completed, idle entities by type
    pub inventory: BTreeMap<UnitId, u32>,
    pub in_progress: Vec<InProgress>,
    /// Committed actions in start order
    pub plan: Vec<UnitId>,
    pub elapsed: Ticks,
}

impl EconomyState {
    pub fn new(resources: Resources, workers: Workers, population: Population) -> Self {
        Self {
            resources,
            workers,
            population,
            ..Self::default()
        }
    }

    pub fn with_inventory(mut self, unit: UnitId, count: u32) -> Self {
        self.add_idle(unit, count);
        self
    }

    pub fn with_construction(mut self, unit: UnitId, remaining: Ticks) -> Self {
        self.push_record(unit, remaining, RecordKind::Construction);
        self
    }

    pub fn with_occupied(mut self, unit: UnitId, remaining: Ticks) -> Self {
        self.push_record(unit, remaining, RecordKind::Occupied);
        self
    }

    pub(crate) fn push_record(&mut self, unit: UnitId, remaining: Ticks, kind: RecordKind) {
        debug_assert!(remaining > 0.0, "in-progress record must have time left");
        self.in_progress.push(InProgress {
            unit,
            remaining,
            kind,
        });
    }

    pub(crate) fn add_idle(&mut self, unit: UnitId, count: u32) {
        if count > 0 {
            *self.inventory.entry(unit).or_insert(0) += count;
        }
    }

    /// Remove one idle instance. Returns false if none was idle.
    pub(crate) fn take_idle(&mut self, unit: UnitId) -> bool {
        match self.inventory.get_mut(&unit) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }

    // === Counting ===

    pub fn idle(&self, unit: UnitId) -> u32 {
        self.inventory.get(&unit).copied().unwrap_or(0)
    }

    pub fn records(&self, unit: UnitId) -> impl Iterator<Item = &InProgress> {
        self.in_progress.iter().filter(move |r| r.unit == unit)
    }

    pub fn in_progress_count(&self, unit: UnitId) -> u32 {
        self.records(unit).count() as u32
    }

    pub fn under_construction(&self, unit: UnitId) -> u32 {
        self.records(unit)
            .filter(|r| r.kind == RecordKind::Construction)
            .count() as u32
    }

    /// Entities that exist: idle plus busy producers
    pub fn completed(&self, unit: UnitId) -> u32 {
        self.idle(unit)
            + self
                .records(unit)
                .filter(|r| r.kind == RecordKind::Occupied)
                .count() as u32
    }

    /// Everything counted against a bound: idle, busy and under construction
    pub fn owned(&self, unit: UnitId) -> u32 {
        self.idle(unit) + self.in_progress_count(unit)
    }

    /// Soonest completion among any records of `unit`
    pub fn earliest(&self, unit: UnitId) -> Option<Ticks> {
        self.records(unit).map(|r| r.remaining).min_by(f64::total_cmp)
    }

    /// Soonest completion among new `unit`s under construction
    pub fn earliest_construction(&self, unit: UnitId) -> Option<Ticks> {
        self.records(unit)
            .filter(|r| r.kind == RecordKind::Construction)
            .map(|r| r.remaining)
            .min_by(f64::total_cmp)
    }

    /// Render with entity names from `catalog`
    pub fn display<'a>(&'a self, catalog: &'a Catalog) -> StateDisplay<'a> {
        StateDisplay {
            state: self,
            catalog,
        }
    }
}

// ============================================================================
// Display
// ============================================================================

pub struct StateDisplay<'a> {
    state: &'a EconomyState,
    catalog: &'a Catalog,
}

impl fmt::Display for StateDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.state;
        let c = self.catalog;
        writeln!(
            f,
            "ticks: {:.1}, minerals: {:.1} ({} workers), vespene: {:.1} ({} workers)",
            s.elapsed, s.resources.minerals, s.workers.minerals, s.resources.vespene, s.workers.vespene
        )?;
        let plan: Vec<&str> = s.plan.iter().map(|u| c.name(*u)).collect();
        writeln!(
            f,
            "population: {}/{}, plan: [{}]",
            s.population.used,
            s.population.cap,
            plan.join(", ")
        )?;
        let busy: Vec<String> = s
            .in_progress
            .iter()
            .map(|r| {
                let tag = match r.kind {
                    RecordKind::Construction => "",
                    RecordKind::Occupied => " busy",
                };
                format!("{}{} {:.1}", c.name(r.unit), tag, r.remaining)
            })
            .collect();
        let idle: Vec<String> = s
            .inventory
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(u, n)| format!("{} x{}", c.name(*u), n))
            .collect();
        write!(
            f,
            "in progress: [{}], inventory: [{}]",
            busy.join(", "),
            idle.join(", ")
        )
    }
}
