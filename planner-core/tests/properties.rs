//! Properties of the simulator and evaluator that hold for any economy state
//!
//! States are drawn from a seeded RNG so failures reproduce. Durations and
//! remaining times are whole ticks, which keeps record bookkeeping exact;
//! banked resources are compared with a tolerance.

use planner_core::{Blocker, Catalog, EconomyState, Population, Resources, Ticks, UnitId, Workers, when};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

// === TEST FIXTURES ===

const CASES: usize = 200;
const TOLERANCE: f64 = 1e-6;

fn id(catalog: &Catalog, name: &str) -> UnitId {
    catalog.resolve(name).unwrap()
}

/// A plausible mid-game state. With `with_extractor` set, up to two
/// extractors are under construction, shuffled in among the other records so
/// they may complete before, after or alongside new workers.
fn random_state(rng: &mut StdRng, catalog: &Catalog, with_extractor: bool) -> EconomyState {
    let mineral_workers = rng.random_range(0..=20);
    let vespene_workers = rng.random_range(0..=6);
    let used = rng.random_range(10..=40);
    let cap = (used + rng.random_range(0..=8)).min(200);

    let mut state = EconomyState::new(
        Resources::new(rng.random_range(0..=400) as f64, rng.random_range(0..=200) as f64),
        Workers::new(mineral_workers, vespene_workers),
        Population::new(used, cap),
    )
    .with_inventory(id(catalog, "Nexus"), 1)
    .with_inventory(id(catalog, "Probe"), mineral_workers + vespene_workers);

    for name in ["Pylon", "Gateway", "CyberneticsCore", "Forge"] {
        let count = rng.random_range(0..=2);
        state = state.with_inventory(id(catalog, name), count);
    }

    let building = ["Probe", "Probe", "Pylon", "Gateway", "Zealot", "Stalker", "CyberneticsCore"];
    let mut records: Vec<(&str, Ticks)> = (0..rng.random_range(0..=5))
        .map(|_| {
            let name = building[rng.random_range(0..building.len())];
            (name, rng.random_range(1..=600) as Ticks)
        })
        .collect();
    if with_extractor {
        for _ in 0..rng.random_range(0..=2) {
            records.push(("Assimilator", rng.random_range(1..=480) as Ticks));
        }
    }
    records.shuffle(rng);
    for (name, remaining) in records {
        state = state.with_construction(id(catalog, name), remaining);
    }

    if rng.random_bool(0.3) {
        state = state.with_occupied(id(catalog, "Gateway"), rng.random_range(1..=600) as Ticks);
    }
    state
}

fn sorted_records(state: &EconomyState) -> Vec<(UnitId, Ticks)> {
    let mut records: Vec<(UnitId, Ticks)> = state.in_progress.iter().map(|r| (r.unit, r.remaining)).collect();
    records.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
    records
}

fn assert_same_economy(a: &EconomyState, b: &EconomyState, context: &str) {
    assert!(
        (a.resources.minerals - b.resources.minerals).abs() < TOLERANCE,
        "{context}: minerals {} vs {}",
        a.resources.minerals,
        b.resources.minerals
    );
    assert!(
        (a.resources.vespene - b.resources.vespene).abs() < TOLERANCE,
        "{context}: vespene {} vs {}",
        a.resources.vespene,
        b.resources.vespene
    );
    assert_eq!(a.workers, b.workers, "{context}: workers");
    assert_eq!(a.population, b.population, "{context}: population");
    assert_eq!(a.inventory, b.inventory, "{context}: inventory");
    assert_eq!(sorted_records(a), sorted_records(b), "{context}: in progress");
    assert_eq!(a.elapsed, b.elapsed, "{context}: elapsed");
}

// === SIMULATOR ===

#[test]
fn property_zero_duration_is_noop() {
    let catalog = Catalog::protoss();
    let mut rng = StdRng::seed_from_u64(1);

    for _ in 0..CASES {
        let state = random_state(&mut rng, &catalog, true);
        let mut after = state.clone();
        after.sim(&catalog, 0.0);
        assert_eq!(after, state);
    }
}

#[test]
fn property_simulation_is_additive() {
    let catalog = Catalog::protoss();
    let mut rng = StdRng::seed_from_u64(2);
    let assimilator = id(&catalog, "Assimilator");

    let mut extractor_completions = 0;
    for case in 0..CASES {
        let state = random_state(&mut rng, &catalog, true);
        let d1 = rng.random_range(0..=500) as Ticks;
        let d2 = rng.random_range(0..=500) as Ticks;

        let mut split = state.clone();
        split.sim(&catalog, d1);
        split.sim(&catalog, d2);

        let mut whole = state.clone();
        whole.sim(&catalog, d1 + d2);

        assert_same_economy(&split, &whole, &format!("case {case}, d1={d1}, d2={d2}"));
        if whole.idle(assimilator) > state.idle(assimilator) {
            extractor_completions += 1;
        }
    }
    assert!(extractor_completions > 0, "no extractor ever completed");
}

#[test]
fn property_resources_never_decrease_while_simulating() {
    let catalog = Catalog::protoss();
    let mut rng = StdRng::seed_from_u64(3);

    for case in 0..CASES {
        let state = random_state(&mut rng, &catalog, true);
        let duration = rng.random_range(0..=800) as Ticks;

        let mut after = state.clone();
        after.sim(&catalog, duration);

        assert!(
            after.resources.minerals >= state.resources.minerals - TOLERANCE,
            "case {case}: minerals fell from {} to {}",
            state.resources.minerals,
            after.resources.minerals
        );
        assert!(
            after.resources.vespene >= state.resources.vespene - TOLERANCE,
            "case {case}: vespene fell from {} to {}",
            state.resources.vespene,
            after.resources.vespene
        );
        assert!(after.elapsed >= state.elapsed);
    }
}

#[test]
fn property_population_cap_never_exceeds_hard_cap() {
    let catalog = Catalog::protoss();
    let mut rng = StdRng::seed_from_u64(4);
    let pylon = id(&catalog, "Pylon");

    for _ in 0..CASES {
        let mut state = random_state(&mut rng, &catalog, false);
        state.population = Population::new(190, 196);
        for _ in 0..rng.random_range(1..=4) {
            state.in_progress.clear();
            state = state.with_construction(pylon, rng.random_range(1..=400) as Ticks);
            state.sim(&catalog, 400.0);
        }
        assert!(state.population.cap <= catalog.rates().hard_population_cap);
        assert!(state.population.used <= state.population.cap);
    }
}

// === ACTION APPLIER ===

#[test]
fn property_build_then_wait_adds_exactly_one() {
    let catalog = Catalog::protoss();
    let mut rng = StdRng::seed_from_u64(5);
    let candidates: Vec<UnitId> = ["Probe", "Pylon", "Gateway", "Zealot", "Forge", "CyberneticsCore"]
        .iter()
        .map(|name| id(&catalog, name))
        .collect();

    let mut checked = 0;
    for case in 0..CASES {
        let mut state = random_state(&mut rng, &catalog, false);
        state.in_progress.clear();
        state.resources = Resources::new(1000.0, 500.0);
        state.population = Population::new(20, 40);

        let target = candidates[rng.random_range(0..candidates.len())];
        if when(&catalog, &state, target) != Ok(0.0) {
            continue;
        }
        let before = state.idle(target);

        state.build(&catalog, target);
        assert_eq!(state.under_construction(target), 1, "case {case}");
        state.sim(&catalog, catalog[target].build_ticks);

        assert_eq!(state.idle(target), before + 1, "case {case}: {}", catalog.name(target));
        assert!(state.in_progress.is_empty(), "case {case}: record left behind");
        checked += 1;
    }
    assert!(checked > CASES / 4, "too few buildable cases: {checked}");
}

// === FEASIBILITY EVALUATOR ===

#[test]
fn property_waiting_the_reported_time_makes_target_ready() {
    let catalog = Catalog::protoss();
    let mut rng = StdRng::seed_from_u64(6);
    let targets: Vec<UnitId> = catalog.iter().map(|(unit, _)| unit).collect();

    let mut waited = 0;
    for case in 0..CASES {
        let state = random_state(&mut rng, &catalog, false);
        for &target in &targets {
            let Ok(wait) = when(&catalog, &state, target) else {
                continue;
            };
            let mut after = state.clone();
            after.sim(&catalog, wait);
            assert_eq!(
                when(&catalog, &after, target),
                Ok(0.0),
                "case {case}: {} after waiting {wait}",
                catalog.name(target)
            );
            if wait > 0.0 {
                waited += 1;
            }
        }
    }
    assert!(waited > 0);
}

#[test]
fn property_infeasible_stays_distinguishable_from_zero() {
    let catalog = Catalog::protoss();
    let mut rng = StdRng::seed_from_u64(7);
    let stalker = id(&catalog, "Stalker");

    for _ in 0..CASES {
        let mut state = random_state(&mut rng, &catalog, false);
        state.workers.vespene = 0;
        state.resources = Resources::new(1000.0, 0.0);

        assert_eq!(
            when(&catalog, &state, stalker),
            Err(Blocker::NoWorkers(planner_core::Resource::Vespene))
        );
    }
}
