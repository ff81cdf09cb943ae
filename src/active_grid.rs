//! Active-grid state machine.
//!
//! Each element is on exactly one grid at any committed time: the
//! high-order `Dg` grid or the robust `Subcell` finite-difference grid.
//! The transition policy is evaluated once per step from the troubled-cell
//! decision:
//!
//! - `Dg --[troubled]--> Subcell` immediately.
//! - `Subcell --[untroubled for `hysteresis` consecutive steps]--> Dg`.
//!
//! The hysteresis window prevents chattering at marginal thresholds: one
//! troubled step resets the untroubled streak, so N-1 clean steps followed
//! by a troubled one do not switch back. There is no terminal state.

use log::debug;
use serde::{Deserialize, Serialize};

/// Which representation is canonical for an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActiveGrid {
    /// High-order DG nodal representation.
    Dg,
    /// Cell-averaged finite-difference subcell representation.
    Subcell,
}

/// What the state machine decided this step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridTransition {
    /// No representation change.
    Stay,
    /// Project DG nodal data to subcell averages; subcell becomes canonical.
    DgToSubcell,
    /// Reconstruct DG nodal data from subcell averages; DG becomes canonical.
    SubcellToDg,
}

/// Record of one grid switch, kept for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchRecord {
    /// Step at which the switch was committed.
    pub step: u64,
    /// Grid the element switched to.
    pub grid: ActiveGrid,
}

/// Per-element switch policy state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSwitcher {
    grid: ActiveGrid,
    hysteresis: u32,
    untroubled_streak: u32,
    history: Vec<SwitchRecord>,
}

impl GridSwitcher {
    /// Create the policy state. `hysteresis` is the number of consecutive
    /// untroubled steps required before a Subcell → Dg switch.
    pub fn new(initial: ActiveGrid, hysteresis: u32) -> Self {
        Self {
            grid: initial,
            hysteresis,
            untroubled_streak: 0,
            history: Vec::new(),
        }
    }

    /// Current canonical grid.
    #[inline]
    pub fn grid(&self) -> ActiveGrid {
        self.grid
    }

    /// Current untroubled streak length (Subcell mode only).
    #[inline]
    pub fn untroubled_streak(&self) -> u32 {
        self.untroubled_streak
    }

    /// All switches committed so far, oldest first.
    pub fn history(&self) -> &[SwitchRecord] {
        &self.history
    }

    /// Apply the per-step policy and return the required transition.
    ///
    /// The caller performs the actual projection/reconstruction; this only
    /// advances the policy state.
    pub fn apply(&mut self, step: u64, troubled: bool) -> GridTransition {
        match (self.grid, troubled) {
            (ActiveGrid::Dg, false) => GridTransition::Stay,
            (ActiveGrid::Dg, true) => {
                self.grid = ActiveGrid::Subcell;
                self.untroubled_streak = 0;
                self.history.push(SwitchRecord {
                    step,
                    grid: ActiveGrid::Subcell,
                });
                debug!("step {}: switching to subcell grid", step);
                GridTransition::DgToSubcell
            }
            (ActiveGrid::Subcell, true) => {
                self.untroubled_streak = 0;
                GridTransition::Stay
            }
            (ActiveGrid::Subcell, false) => {
                self.untroubled_streak += 1;
                if self.untroubled_streak >= self.hysteresis {
                    self.grid = ActiveGrid::Dg;
                    self.untroubled_streak = 0;
                    self.history.push(SwitchRecord {
                        step,
                        grid: ActiveGrid::Dg,
                    });
                    debug!("step {}: switching back to DG grid", step);
                    GridTransition::SubcellToDg
                } else {
                    GridTransition::Stay
                }
            }
        }
    }

    /// Undo a Subcell → Dg switch decided this step, before it commits.
    ///
    /// Used when the post-reconstruction re-check finds the DG data still
    /// troubled: the element stays on subcell and the streak restarts.
    pub(crate) fn cancel_switch_to_dg(&mut self) {
        debug_assert_eq!(self.grid, ActiveGrid::Dg);
        self.grid = ActiveGrid::Subcell;
        self.untroubled_streak = 0;
        if matches!(
            self.history.last(),
            Some(SwitchRecord {
                grid: ActiveGrid::Dg,
                ..
            })
        ) {
            self.history.pop();
        }
    }

    /// Restore policy internals from a checkpoint.
    pub(crate) fn restore(
        grid: ActiveGrid,
        hysteresis: u32,
        untroubled_streak: u32,
        history: Vec<SwitchRecord>,
    ) -> Self {
        Self {
            grid,
            hysteresis,
            untroubled_streak,
            history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dg_stays_on_clean_steps() {
        let mut sw = GridSwitcher::new(ActiveGrid::Dg, 2);
        for step in 0..5 {
            assert_eq!(sw.apply(step, false), GridTransition::Stay);
            assert_eq!(sw.grid(), ActiveGrid::Dg);
        }
        assert!(sw.history().is_empty());
    }

    #[test]
    fn test_troubled_switches_immediately() {
        let mut sw = GridSwitcher::new(ActiveGrid::Dg, 2);
        assert_eq!(sw.apply(3, true), GridTransition::DgToSubcell);
        assert_eq!(sw.grid(), ActiveGrid::Subcell);
        assert_eq!(sw.history(), &[SwitchRecord { step: 3, grid: ActiveGrid::Subcell }]);
    }

    #[test]
    fn test_hysteresis_window() {
        let hysteresis = 4;
        let mut sw = GridSwitcher::new(ActiveGrid::Subcell, hysteresis);

        // N-1 clean steps: still on subcell.
        for step in 0..(hysteresis as u64 - 1) {
            assert_eq!(sw.apply(step, false), GridTransition::Stay);
            assert_eq!(sw.grid(), ActiveGrid::Subcell);
        }

        // A troubled step resets the streak...
        assert_eq!(sw.apply(3, true), GridTransition::Stay);
        assert_eq!(sw.untroubled_streak(), 0);

        // ...so the element must NOT switch back until N fresh clean steps.
        for step in 4..(4 + hysteresis as u64 - 1) {
            assert_eq!(sw.apply(step, false), GridTransition::Stay);
        }
        assert_eq!(sw.apply(7, false), GridTransition::SubcellToDg);
        assert_eq!(sw.grid(), ActiveGrid::Dg);
    }

    #[test]
    fn test_oscillation_is_allowed() {
        // No terminal state: the element may switch for the whole run.
        let mut sw = GridSwitcher::new(ActiveGrid::Dg, 1);
        assert_eq!(sw.apply(0, true), GridTransition::DgToSubcell);
        assert_eq!(sw.apply(1, false), GridTransition::SubcellToDg);
        assert_eq!(sw.apply(2, true), GridTransition::DgToSubcell);
        assert_eq!(sw.history().len(), 3);
    }

    #[test]
    fn test_subcell_troubled_is_noop() {
        let mut sw = GridSwitcher::new(ActiveGrid::Subcell, 2);
        assert_eq!(sw.apply(0, true), GridTransition::Stay);
        assert_eq!(sw.grid(), ActiveGrid::Subcell);
        assert!(sw.history().is_empty());
    }
}
