// Action applier - commit the start of production on one branch's state

use crate::catalog::{Catalog, Producer};
use crate::feasibility::when;
use crate::state::{EconomyState, RecordKind};
use crate::types::UnitId;

impl EconomyState {
    /// Start producing `target`. The caller must have just seen
    /// `when(catalog, self, target) == Ok(0.0)`.
    pub fn build(&mut self, catalog: &Catalog, target: UnitId) {
        debug_assert_eq!(
            when(catalog, self, target),
            Ok(0.0),
            "build({}) called before it was ready",
            catalog.name(target)
        );

        let entity = &catalog[target];
        let rates = catalog.rates();

        let mut minerals = entity.minerals;
        let producer = entity
            .supported_producers()
            .find(|p| self.idle(p.unit()) > 0);
        match producer {
            Some(Producer::WorkerRelocation(_)) => {
                // The worker walks back afterwards; only the lost mining time is paid
                minerals += rates.relocation_surcharge;
            }
            Some(Producer::Structure(structure)) => {
                if self.take_idle(*structure) {
                    self.push_record(*structure, entity.build_ticks, RecordKind::Occupied);
                }
            }
            Some(Producer::Excluded { .. }) | None => {}
        }

        self.resources.minerals = spend(self.resources.minerals, minerals, rates.resource_epsilon);
        self.resources.vespene = spend(self.resources.vespene, entity.vespene, rates.resource_epsilon);
        self.population.used += entity.population;

        self.push_record(target, entity.build_ticks, RecordKind::Construction);
        self.plan.push(target);
    }
}

/// Deduct `cost`, absorbing only the rounding slack `when` tolerates. A real
/// shortfall stays negative.
fn spend(amount: f64, cost: f64, epsilon: f64) -> f64 {
    let left = amount - cost;
    if left < 0.0 && left >= -epsilon { 0.0 } else { left }
}
