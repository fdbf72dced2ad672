// Snapshot intake - the one-time conversion of a live economy into a root state
//
// The live collaborator is read exactly once. After conversion the state holds
// plain values only, so search branches can clone it freely.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::catalog::Catalog;
use crate::error::PlannerError;
use crate::state::{EconomyState, RecordKind};
use crate::types::{Population, Resources, Ticks, UnitId, Workers};

// ============================================================================
// Snapshot types (JSON / WASM input)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(from_wasm_abi)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StructureStatus {
    /// Not yet complete; `progress` runs from 0 to 1
    UnderConstruction { progress: f64 },
    Idle,
    /// Complete and busy with `order`
    Producing { order: String, progress: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(from_wasm_abi)]
pub struct StructureSnapshot {
    pub unit: String,
    pub status: StructureStatus,
}

/// Everything the planner reads from the live economy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Tsify)]
#[tsify(from_wasm_abi)]
#[serde(default)]
pub struct EconomySnapshot {
    pub minerals: f64,
    pub vespene: f64,
    pub mineral_workers: u32,
    pub vespene_workers: u32,
    pub supply_used: u32,
    pub supply_cap: u32,
    pub structures: Vec<StructureSnapshot>,
    /// Completed non-structure units by type name
    pub units: BTreeMap<String, u32>,
}

impl EconomySnapshot {
    pub fn from_json(json: &str) -> Result<Self, PlannerError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Conversion
// ============================================================================

impl EconomyState {
    /// Build a root state from a live snapshot.
    pub fn from_snapshot(catalog: &Catalog, snapshot: &EconomySnapshot) -> Result<Self, PlannerError> {
        let hard_cap = catalog.rates().hard_population_cap;
        if snapshot.supply_used > snapshot.supply_cap {
            return Err(PlannerError::InvalidSnapshot(format!(
                "supply used {} exceeds cap {}",
                snapshot.supply_used, snapshot.supply_cap
            )));
        }
        if snapshot.supply_cap > hard_cap {
            return Err(PlannerError::InvalidSnapshot(format!(
                "supply cap {} exceeds hard cap {hard_cap}",
                snapshot.supply_cap
            )));
        }
        if !(snapshot.minerals >= 0.0 && snapshot.vespene >= 0.0) {
            return Err(PlannerError::InvalidSnapshot(
                "resources must be non-negative".to_string(),
            ));
        }

        let mut state = EconomyState::new(
            Resources::new(snapshot.minerals, snapshot.vespene),
            Workers::new(snapshot.mineral_workers, snapshot.vespene_workers),
            Population::new(snapshot.supply_used, snapshot.supply_cap),
        );

        for structure in &snapshot.structures {
            let unit = catalog.resolve(&structure.unit)?;
            match &structure.status {
                StructureStatus::UnderConstruction { progress } => {
                    let remaining = remaining_ticks(catalog, unit, *progress)?;
                    state.add_record_or_complete(unit, remaining, RecordKind::Construction);
                }
                StructureStatus::Idle => state.add_idle(unit, 1),
                StructureStatus::Producing { order, progress } => {
                    let order = catalog.resolve(order)?;
                    let remaining = remaining_ticks(catalog, order, *progress)?;
                    state.add_record_or_complete(unit, remaining, RecordKind::Occupied);
                    state.add_record_or_complete(order, remaining, RecordKind::Construction);
                }
            }
        }

        for (name, count) in &snapshot.units {
            let unit = catalog.resolve(name)?;
            state.add_idle(unit, *count);
        }

        Ok(state)
    }

    /// Keep `remaining > 0` for every stored record; anything already done is inventory.
    fn add_record_or_complete(&mut self, unit: UnitId, remaining: Ticks, kind: RecordKind) {
        if remaining > 0.0 {
            self.push_record(unit, remaining, kind);
        } else {
            self.add_idle(unit, 1);
        }
    }
}

fn remaining_ticks(catalog: &Catalog, unit: UnitId, progress: f64) -> Result<Ticks, PlannerError> {
    if !(0.0..=1.0).contains(&progress) {
        return Err(PlannerError::InvalidSnapshot(format!(
            "{} progress {progress} outside [0, 1]",
            catalog.name(unit)
        )));
    }
    Ok((1.0 - progress) * catalog[unit].build_ticks)
}
