// Forward simulator - advance a state through time
//
// A step is split at every completion instant inside it. Each completion
// therefore sees exactly the worker allocation in force at that instant, and
// accrual between instants uses the allocation that held over that interval.

use crate::catalog::{Catalog, Role};
use crate::state::{EconomyState, InProgress, RecordKind};
use crate::types::{Ticks, UnitId};

impl EconomyState {
    /// Advance by `duration` ticks. `sim(0)` leaves the state untouched.
    pub fn sim(&mut self, catalog: &Catalog, duration: Ticks) {
        debug_assert!(duration >= 0.0, "cannot simulate backwards: {duration}");
        if duration <= 0.0 {
            return;
        }

        let start = self.elapsed;
        let mut left = duration;
        while left > 0.0 {
            let next = self
                .in_progress
                .iter()
                .map(|r| r.remaining)
                .fold(f64::INFINITY, f64::min);
            let step = next.max(0.0).min(left);
            self.accrue(catalog, step);
            left -= step;
            self.elapsed = start + (duration - left);
            self.finish_due(catalog);
        }
        self.elapsed = start + duration;
    }

    fn accrue(&mut self, catalog: &Catalog, step: Ticks) {
        let rates = catalog.rates();
        self.resources.minerals += self.workers.minerals as f64 * rates.mineral_per_worker_tick * step;
        self.resources.vespene += self.workers.vespene as f64 * rates.vespene_per_worker_tick * step;
        for record in &mut self.in_progress {
            record.remaining -= step;
        }
    }

    /// Complete every record that has reached zero. Simultaneous extractors go
    /// last so they can staff themselves from workers finishing at the same instant.
    fn finish_due(&mut self, catalog: &Catalog) {
        let (mut due, running): (Vec<InProgress>, Vec<InProgress>) = std::mem::take(&mut self.in_progress)
            .into_iter()
            .partition(|r| r.remaining <= 0.0);
        self.in_progress = running;

        due.sort_by_key(|r| r.kind == RecordKind::Construction && catalog[r.unit].role == Role::Extractor);
        for record in due {
            self.complete(catalog, record.unit, record.kind);
        }
    }

    fn complete(&mut self, catalog: &Catalog, unit: UnitId, kind: RecordKind) {
        self.add_idle(unit, 1);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "completion",
            elapsed = self.elapsed,
            unit = catalog.name(unit),
            occupied = kind == RecordKind::Occupied,
        );

        if kind == RecordKind::Occupied {
            return;
        }

        let entity = &catalog[unit];
        let rates = catalog.rates();
        match entity.role {
            Role::ResourceWorker => self.workers.minerals += 1,
            Role::Extractor => {
                let moved = rates.workers_per_extractor.min(self.workers.minerals);
                self.workers.minerals -= moved;
                self.workers.vespene += moved;
            }
            Role::Supply | Role::Standard => {}
        }

        if entity.supply_provided > 0 {
            self.population.cap =
                (self.population.cap + entity.supply_provided).min(rates.hard_population_cap);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::Catalog;
    use crate::state::{EconomyState, RecordKind};
    use crate::types::{Population, Resources, Workers};

    fn base(minerals: u32, vespene: u32) -> EconomyState {
        EconomyState::new(
            Resources::new(100.0, 0.0),
            Workers::new(minerals, vespene),
            Population::new(12, 15),
        )
    }

    #[test]
    fn test_accrual() {
        let catalog = Catalog::protoss();
        let rates = *catalog.rates();
        let mut state = base(10, 3);

        state.sim(&catalog, 200.0);

        assert_eq!(state.elapsed, 200.0);
        let minerals = 100.0 + 10.0 * rates.mineral_per_worker_tick * 200.0;
        let vespene = 3.0 * rates.vespene_per_worker_tick * 200.0;
        assert!((state.resources.minerals - minerals).abs() < 1e-9);
        assert!((state.resources.vespene - vespene).abs() < 1e-9);
    }

    #[test]
    fn test_zero_duration_is_noop() {
        let catalog = Catalog::protoss();
        let pylon = catalog.resolve("Pylon").unwrap();
        let state = base(12, 0).with_construction(pylon, 10.0);

        let mut after = state.clone();
        after.sim(&catalog, 0.0);
        assert_eq!(after, state);
    }

    #[test]
    fn test_worker_completion_back_accrues() {
        let catalog = Catalog::protoss();
        let rate = catalog.rates().mineral_per_worker_tick;
        let probe = catalog.resolve("Probe").unwrap();
        let mut state = base(12, 0).with_construction(probe, 5.0);

        state.sim(&catalog, 7.0);

        assert_eq!(state.workers.minerals, 13);
        assert_eq!(state.idle(probe), 1);
        assert!(state.in_progress.is_empty());
        let expected = 100.0 + 12.0 * rate * 7.0 + rate * 2.0;
        assert!((state.resources.minerals - expected).abs() < 1e-9);
    }

    #[test]
    fn test_extractor_completion_moves_workers() {
        let catalog = Catalog::protoss();
        let rates = *catalog.rates();
        let assimilator = catalog.resolve("Assimilator").unwrap();
        let mut state = base(12, 0).with_construction(assimilator, 40.0);

        state.sim(&catalog, 100.0);

        assert_eq!(state.workers.minerals, 9);
        assert_eq!(state.workers.vespene, 3);
        assert_eq!(state.idle(assimilator), 1);
        let minerals = 100.0 + 12.0 * rates.mineral_per_worker_tick * 40.0
            + 9.0 * rates.mineral_per_worker_tick * 60.0;
        let vespene = 3.0 * rates.vespene_per_worker_tick * 60.0;
        assert!((state.resources.minerals - minerals).abs() < 1e-9);
        assert!((state.resources.vespene - vespene).abs() < 1e-9);
    }

    #[test]
    fn test_extractor_moves_at_most_available_workers() {
        let catalog = Catalog::protoss();
        let assimilator = catalog.resolve("Assimilator").unwrap();
        let mut state = base(2, 0).with_construction(assimilator, 10.0);

        state.sim(&catalog, 10.0);

        assert_eq!(state.workers.minerals, 0);
        assert_eq!(state.workers.vespene, 2);
    }

    #[test]
    fn test_extractor_staffs_from_workers_present_at_its_instant() {
        let catalog = Catalog::protoss();
        let rates = *catalog.rates();
        let probe = catalog.resolve("Probe").unwrap();
        let assimilator = catalog.resolve("Assimilator").unwrap();
        // The probe record sits first but finishes last
        let mut state = base(2, 0)
            .with_construction(probe, 9.0)
            .with_construction(assimilator, 1.0);

        state.sim(&catalog, 10.0);

        assert_eq!(state.workers, Workers::new(1, 2));
        let minerals = 100.0 + 2.0 * rates.mineral_per_worker_tick + rates.mineral_per_worker_tick;
        let vespene = 2.0 * rates.vespene_per_worker_tick * 9.0;
        assert!(state.resources.minerals >= 100.0);
        assert!((state.resources.minerals - minerals).abs() < 1e-9);
        assert!((state.resources.vespene - vespene).abs() < 1e-9);
    }

    #[test]
    fn test_completion_order_does_not_depend_on_record_order() {
        let catalog = Catalog::protoss();
        let probe = catalog.resolve("Probe").unwrap();
        let assimilator = catalog.resolve("Assimilator").unwrap();
        let state = base(2, 0)
            .with_construction(assimilator, 10.0)
            .with_construction(probe, 5.0);

        let mut whole = state.clone();
        whole.sim(&catalog, 20.0);
        let mut split = state.clone();
        split.sim(&catalog, 7.0);
        split.sim(&catalog, 13.0);

        assert_eq!(whole.workers, Workers::new(0, 3));
        assert_eq!(split.workers, whole.workers);
        assert!((whole.resources.minerals - split.resources.minerals).abs() < 1e-9);
        assert!((whole.resources.vespene - split.resources.vespene).abs() < 1e-9);
        assert_eq!(whole.elapsed, split.elapsed);
    }

    #[test]
    fn test_simultaneous_worker_joins_extractor() {
        let catalog = Catalog::protoss();
        let probe = catalog.resolve("Probe").unwrap();
        let assimilator = catalog.resolve("Assimilator").unwrap();
        let mut state = base(2, 0)
            .with_construction(assimilator, 5.0)
            .with_construction(probe, 5.0);

        state.sim(&catalog, 5.0);

        assert_eq!(state.workers, Workers::new(0, 3));
        assert!(state.in_progress.is_empty());
    }

    #[test]
    fn test_two_extractors_share_scarce_workers() {
        let catalog = Catalog::protoss();
        let assimilator = catalog.resolve("Assimilator").unwrap();
        let mut state = base(4, 0)
            .with_construction(assimilator, 8.0)
            .with_construction(assimilator, 3.0);

        state.sim(&catalog, 10.0);

        assert_eq!(state.workers, Workers::new(0, 4));
        assert_eq!(state.idle(assimilator), 2);
        assert!(state.resources.minerals >= 100.0);
    }

    #[test]
    fn test_supply_completion_raises_cap_to_hard_limit() {
        let catalog = Catalog::protoss();
        let pylon = catalog.resolve("Pylon").unwrap();
        let mut state = base(12, 0)
            .with_construction(pylon, 10.0)
            .with_construction(pylon, 20.0);
        state.population = Population::new(190, 195);

        state.sim(&catalog, 20.0);

        assert_eq!(state.population.cap, 200);
        assert_eq!(state.idle(pylon), 2);
    }

    #[test]
    fn test_busy_producer_returns_without_effect() {
        let catalog = Catalog::protoss();
        let nexus = catalog.resolve("Nexus").unwrap();
        let mut state = base(12, 0).with_occupied(nexus, 50.0);

        state.sim(&catalog, 50.0);

        assert_eq!(state.idle(nexus), 1);
        // No second helping of supply from a Nexus that merely finished an order
        assert_eq!(state.population.cap, 15);
        assert!(state.in_progress.is_empty());
    }

    #[test]
    fn test_partial_progress_is_kept() {
        let catalog = Catalog::protoss();
        let gateway = catalog.resolve("Gateway").unwrap();
        let mut state = base(12, 0).with_construction(gateway, 900.0);

        state.sim(&catalog, 250.0);

        assert_eq!(state.in_progress.len(), 1);
        assert_eq!(state.in_progress[0].remaining, 650.0);
        assert_eq!(state.in_progress[0].kind, RecordKind::Construction);
        assert_eq!(state.idle(gateway), 0);
    }
}
