use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;
use wasm_bindgen::prelude::*;

mod apply;
mod catalog;
mod config;
mod error;
mod feasibility;
mod planner;
mod simulate;
mod snapshot;
mod state;
mod types;

pub use catalog::*;
pub use config::*;
pub use error::*;
pub use feasibility::*;
pub use planner::*;
pub use snapshot::*;
pub use state::*;
pub use types::*;

#[cfg(feature = "instrument")]
pub use instrument;

// ============================================================================
// WASM API - BuildPlanner
// ============================================================================

/// Result of one planning request, with entity names resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct PlanReport {
    pub plan: Vec<String>,
    pub ticks: Option<f64>,
    pub iterations: usize,
    pub status: SearchStatus,
    pub satisfied: bool,
}

#[wasm_bindgen]
pub struct BuildPlanner {
    catalog: Catalog,
    config: PlannerConfig,
}

#[wasm_bindgen]
impl BuildPlanner {
    /// Planner over the built-in Protoss catalog
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();

        Self {
            catalog: Catalog::protoss(),
            config: PlannerConfig::default(),
        }
    }

    #[wasm_bindgen]
    pub fn with_catalog_json(catalog_json: &str) -> Result<BuildPlanner, JsError> {
        let mut planner = Self::new();
        planner.catalog = Catalog::from_json(catalog_json)?;
        Ok(planner)
    }

    #[wasm_bindgen]
    pub fn set_iteration_cap(&mut self, cap: usize) {
        self.config = self.config.with_iteration_cap(cap);
    }

    /// Entity type names in catalog order
    #[wasm_bindgen]
    pub fn entity_names(&self) -> Result<JsValue, JsError> {
        let names: Vec<&str> = self.catalog.iter().map(|(_, e)| e.name.as_str()).collect();
        Ok(serde_wasm_bindgen::to_value(&names)?)
    }

    /// Ticks until `unit` could start from the snapshot; -1 if it cannot start at all.
    #[wasm_bindgen]
    pub fn when(&self, snapshot_json: &str, unit: &str) -> Result<f64, JsError> {
        Ok(self.query_when(snapshot_json, unit)?.unwrap_or(-1.0))
    }

    /// Plan towards `goal_json`, a map of entity name to minimum count.
    #[wasm_bindgen]
    pub fn plan(&self, snapshot_json: &str, goal_json: &str) -> Result<PlanReport, JsError> {
        Ok(self.plan_report(snapshot_json, goal_json)?)
    }
}

impl BuildPlanner {
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn query_when(&self, snapshot_json: &str, unit: &str) -> Result<Wait, PlannerError> {
        let snapshot = EconomySnapshot::from_json(snapshot_json)?;
        let state = EconomyState::from_snapshot(&self.catalog, &snapshot)?;
        let target = self.catalog.resolve(unit)?;
        Ok(when(&self.catalog, &state, target))
    }

    pub fn plan_report(&self, snapshot_json: &str, goal_json: &str) -> Result<PlanReport, PlannerError> {
        let snapshot = EconomySnapshot::from_json(snapshot_json)?;
        let root = EconomyState::from_snapshot(&self.catalog, &snapshot)?;
        let counts: BTreeMap<String, u32> = serde_json::from_str(goal_json)?;
        let goal = Goal::from_names(&self.catalog, &counts)?;

        let result = Planner::new(&self.catalog, self.config).calculate_buildorder(&root, &goal);
        Ok(PlanReport {
            plan: result
                .plan
                .iter()
                .map(|unit| self.catalog.name(*unit).to_string())
                .collect(),
            ticks: result.ticks,
            iterations: result.iterations,
            status: result.status,
            satisfied: result.satisfied,
        })
    }
}

impl Default for BuildPlanner {
    fn default() -> Self {
        Self::new()
    }
}
