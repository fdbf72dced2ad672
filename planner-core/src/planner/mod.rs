//! Branch-and-bound search for a minimal-time build order.
//!
//! States are expanded in `(elapsed ticks, insertion order)` order. Every
//! transition waits until one action is ready and then starts it, so each
//! child is a complete, self-consistent timeline. A state that satisfies the
//! goal is terminal; anything not earlier than the best solution is cut.

mod bounds;
mod goal;
mod queue;

pub use bounds::ActionSet;
pub use goal::Goal;
pub use queue::{Frontier, SearchNode};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::catalog::Catalog;
use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::feasibility::{Blocker, when};
use crate::state::{EconomyState, RecordKind};
use crate::types::{Ticks, UnitId};

/// Wait-then-build re-queries after each wait. Only a completion that changes
/// accrual mid-wait needs another round, so a handful of rounds always settles.
const MAX_SETTLE_ROUNDS: usize = 8;

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// Frontier emptied; the answer is the best within the derived bounds
    Exhausted,
    /// Iteration cap reached with states still queued
    BudgetExhausted,
    /// Stopped through a [`CancelToken`]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanResult {
    /// Best goal-satisfying plan, or the closest partial plan when none was found
    pub plan: Vec<UnitId>,
    /// Simulated ticks of the satisfying plan
    pub ticks: Option<Ticks>,
    pub iterations: usize,
    pub status: SearchStatus,
    pub satisfied: bool,
}

/// Shared flag for stopping a running search from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Transitions
// ============================================================================

/// Simulate forward until `target` can start right now.
///
/// Fails with the evaluator's blocker, or [`Blocker::Unsettled`] if readiness
/// keeps slipping.
pub fn advance_until_ready(catalog: &Catalog, state: &mut EconomyState, target: UnitId) -> Result<(), Blocker> {
    for _ in 0..MAX_SETTLE_ROUNDS {
        let wait = when(catalog, state, target)?;
        if wait <= 0.0 {
            return Ok(());
        }
        state.sim(catalog, wait);
    }
    Err(Blocker::Unsettled)
}

/// Execute `plan` from `root` with the search's own transition, then let
/// all outstanding construction finish.
pub fn replay(catalog: &Catalog, root: &EconomyState, plan: &[UnitId]) -> Result<EconomyState, PlannerError> {
    let mut state = root.clone();
    for (step, &unit) in plan.iter().enumerate() {
        advance_until_ready(catalog, &mut state, unit).map_err(|blocker| PlannerError::ReplayInfeasible {
            step,
            unit: catalog.name(unit).to_string(),
            blocker,
            reason: blocker.describe(catalog),
        })?;
        state.build(catalog, unit);
    }

    let drain = state
        .in_progress
        .iter()
        .filter(|r| r.kind == RecordKind::Construction)
        .map(|r| r.remaining)
        .fold(0.0, f64::max);
    state.sim(catalog, drain);
    Ok(state)
}

// ============================================================================
// Planner
// ============================================================================

pub struct Planner<'a> {
    catalog: &'a Catalog,
    config: PlannerConfig,
}

impl<'a> Planner<'a> {
    pub fn new(catalog: &'a Catalog, config: PlannerConfig) -> Self {
        Self { catalog, config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn calculate_buildorder(&self, root: &EconomyState, goal: &Goal) -> PlanResult {
        self.plan_with_cancel(root, goal, &CancelToken::new())
    }

    /// Same as [`Planner::calculate_buildorder`], checking `cancel` before every dequeue.
    pub fn plan_with_cancel(&self, root: &EconomyState, goal: &Goal, cancel: &CancelToken) -> PlanResult {
        let catalog = self.catalog;
        let actions = ActionSet::derive(catalog, root, goal, &self.config);

        let mut frontier = Frontier::new();
        frontier.push(root.clone(), goal.distance(catalog, root));

        let mut best: Option<(Ticks, Vec<UnitId>)> = None;
        let mut closest: (Ticks, Vec<UnitId>) = (f64::INFINITY, Vec::new());
        let mut iterations = 0usize;

        let status = loop {
            if cancel.is_cancelled() {
                break SearchStatus::Cancelled;
            }
            if frontier.is_empty() {
                break SearchStatus::Exhausted;
            }
            if iterations >= self.config.iteration_cap {
                break SearchStatus::BudgetExhausted;
            }
            let Some(node) = frontier.pop() else {
                break SearchStatus::Exhausted;
            };
            iterations += 1;
            let current = node.state;

            let best_ticks = best.as_ref().map_or(f64::INFINITY, |(ticks, _)| *ticks);
            if current.elapsed >= best_ticks {
                #[cfg(feature = "instrument")]
                tracing::info!(
                    target: "prune",
                    iteration = iterations,
                    ticks = current.elapsed,
                    best_ticks = best_ticks,
                );
                continue;
            }

            if goal.is_satisfied(&current) {
                #[cfg(feature = "instrument")]
                tracing::info!(
                    target: "solution",
                    iteration = iterations,
                    ticks = current.elapsed,
                    plan_len = current.plan.len(),
                );
                best = Some((current.elapsed, current.plan));
                continue;
            }

            if node.goal_distance < closest.0 {
                closest = (node.goal_distance, current.plan.clone());
            }

            // Everything needed is started; only waiting remains
            if let Some(wait) = goal.outstanding_ticks(&current) {
                let mut child = current;
                child.sim(catalog, wait);
                let distance = goal.distance(catalog, &child);
                frontier.push(child, distance);
                continue;
            }

            for (action, bound) in actions.iter() {
                if current.owned(action) >= bound {
                    continue;
                }
                let Ok(wait) = when(catalog, &current, action) else {
                    continue;
                };
                let mut child = current.clone();
                if advance_until_ready(catalog, &mut child, action).is_err() {
                    continue;
                }
                child.build(catalog, action);
                let distance = goal.distance(catalog, &child);

                #[cfg(feature = "instrument")]
                tracing::info!(
                    target: "expand",
                    iteration = iterations,
                    parent_ticks = current.elapsed,
                    action = catalog.name(action),
                    wait = wait,
                    child_ticks = child.elapsed,
                    owned = child.owned(action),
                    bound = bound,
                    goal_distance = distance,
                );
                #[cfg(not(feature = "instrument"))]
                let _ = wait;

                frontier.push(child, distance);
            }
        };

        let satisfied = best.is_some();
        let (ticks, plan) = match best {
            Some((ticks, plan)) => (Some(ticks), plan),
            None => (None, closest.1),
        };

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "plan_summary",
            iterations = iterations,
            status = ?status,
            satisfied = satisfied,
            ticks = ticks.unwrap_or(-1.0),
            plan_len = plan.len(),
            queued = frontier.len(),
        );

        PlanResult {
            plan,
            ticks,
            iterations,
            status,
            satisfied,
        }
    }
}

/// Plan with the default [`PlannerConfig`].
pub fn calculate_buildorder(catalog: &Catalog, root: &EconomyState, goal: &Goal) -> PlanResult {
    Planner::new(catalog, PlannerConfig::default()).calculate_buildorder(root, goal)
}
