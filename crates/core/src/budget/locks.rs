//! Quarter-lock state machine.
//!
//! Each quarter of a scenario is an independent latch (`Unlocked` or
//! `Locked`). Locking any single quarter freezes the yearly edit surface; all
//! four must be unlocked to restore it. `yearly_confirmed` is an orthogonal,
//! one-way flag that enables the monthly-detail surface. Confirming before
//! locking is the intended workflow but is not enforced.

use serde::{Deserialize, Serialize};

use super::error::BudgetError;
use super::types::Quarter;
use budgetlock_shared::types::ScenarioId;

/// State of one quarter latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    /// Budget figures are editable (initial state).
    Unlocked,
    /// Quarter is committed and tracks actuals.
    Locked,
}

impl LockState {
    const fn from_flag(locked: bool) -> Self {
        if locked { Self::Locked } else { Self::Unlocked }
    }
}

/// Requested transition on a quarter latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockAction {
    /// `Unlocked -> Locked`.
    Lock,
    /// `Locked -> Unlocked`. Forfeits the quarter's actuals-tracking mode.
    Unlock,
}

impl LockAction {
    /// State required before the transition.
    #[must_use]
    pub const fn expected(self) -> LockState {
        match self {
            Self::Lock => LockState::Unlocked,
            Self::Unlock => LockState::Locked,
        }
    }

    /// State after the transition.
    #[must_use]
    pub const fn target(self) -> LockState {
        match self {
            Self::Lock => LockState::Locked,
            Self::Unlock => LockState::Unlocked,
        }
    }

    /// Whether callers must obtain explicit confirmation first.
    #[must_use]
    pub const fn is_destructive(self) -> bool {
        matches!(self, Self::Unlock)
    }
}

/// The four quarter latches of a scenario.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterLocks {
    /// Q1 latch.
    pub q1_locked: bool,
    /// Q2 latch.
    pub q2_locked: bool,
    /// Q3 latch.
    pub q3_locked: bool,
    /// Q4 latch.
    pub q4_locked: bool,
}

impl QuarterLocks {
    /// Builds the lock set from stored flags.
    #[must_use]
    pub const fn from_flags(q1: bool, q2: bool, q3: bool, q4: bool) -> Self {
        Self {
            q1_locked: q1,
            q2_locked: q2,
            q3_locked: q3,
            q4_locked: q4,
        }
    }

    /// Whether a quarter is locked.
    #[must_use]
    pub const fn is_locked(&self, quarter: Quarter) -> bool {
        match quarter {
            Quarter::Q1 => self.q1_locked,
            Quarter::Q2 => self.q2_locked,
            Quarter::Q3 => self.q3_locked,
            Quarter::Q4 => self.q4_locked,
        }
    }

    /// State of a quarter latch.
    #[must_use]
    pub const fn state(&self, quarter: Quarter) -> LockState {
        LockState::from_flag(self.is_locked(quarter))
    }

    /// The yearly-surface gate: true if any quarter is locked.
    #[must_use]
    pub const fn any_quarter_locked(&self) -> bool {
        self.q1_locked || self.q2_locked || self.q3_locked || self.q4_locked
    }

    /// Locked quarters in calendar order.
    #[must_use]
    pub fn locked_quarters(&self) -> Vec<Quarter> {
        Quarter::ALL
            .into_iter()
            .filter(|q| self.is_locked(*q))
            .collect()
    }

    /// Returns a copy with one latch set to `locked`.
    #[must_use]
    pub const fn with(mut self, quarter: Quarter, locked: bool) -> Self {
        match quarter {
            Quarter::Q1 => self.q1_locked = locked,
            Quarter::Q2 => self.q2_locked = locked,
            Quarter::Q3 => self.q3_locked = locked,
            Quarter::Q4 => self.q4_locked = locked,
        }
        self
    }

    /// Compare-and-set: applies `action` only if the latch is in the expected
    /// state. Returns the resulting locks and whether anything changed.
    #[must_use]
    pub fn apply(self, quarter: Quarter, action: LockAction) -> (Self, bool) {
        if self.state(quarter) == action.expected() {
            (
                self.with(quarter, action.target() == LockState::Locked),
                true,
            )
        } else {
            (self, false)
        }
    }

    /// Fails with `ScenarioLocked` while any quarter is locked.
    pub fn ensure_yearly_editable(&self, scenario_id: ScenarioId) -> Result<(), BudgetError> {
        if self.any_quarter_locked() {
            Err(BudgetError::ScenarioLocked(scenario_id))
        } else {
            Ok(())
        }
    }
}

/// Which edit surfaces a scenario currently exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSurface {
    /// True while no quarter is locked.
    pub yearly_editable: bool,
    /// True once the yearly budget has been confirmed. Advisory for
    /// clients; month writes are gated by the quarter locks only.
    pub monthly_detail_enabled: bool,
    /// Quarters currently tracking actuals (locked), by number.
    pub tracking_actuals: Vec<u8>,
}

impl EditSurface {
    /// Derives the surface state from the confirmation flag and the latches.
    #[must_use]
    pub fn new(yearly_confirmed: bool, locks: QuarterLocks) -> Self {
        Self {
            yearly_editable: !locks.any_quarter_locked(),
            monthly_detail_enabled: yearly_confirmed,
            tracking_actuals: locks
                .locked_quarters()
                .into_iter()
                .map(Quarter::number)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_unlocked() {
        let locks = QuarterLocks::default();
        for quarter in Quarter::ALL {
            assert_eq!(locks.state(quarter), LockState::Unlocked);
        }
        assert!(!locks.any_quarter_locked());
    }

    #[test]
    fn test_any_single_quarter_closes_gate() {
        for quarter in Quarter::ALL {
            let locks = QuarterLocks::default().with(quarter, true);
            assert!(locks.any_quarter_locked(), "{quarter} should close the gate");
            assert!(
                locks
                    .ensure_yearly_editable(ScenarioId::new())
                    .is_err()
            );
        }
    }

    #[test]
    fn test_gate_reopens_only_when_all_unlocked() {
        let locks = QuarterLocks::default()
            .with(Quarter::Q1, true)
            .with(Quarter::Q3, true);

        let (locks, changed) = locks.apply(Quarter::Q1, LockAction::Unlock);
        assert!(changed);
        assert!(locks.any_quarter_locked());

        let (locks, changed) = locks.apply(Quarter::Q3, LockAction::Unlock);
        assert!(changed);
        assert!(!locks.any_quarter_locked());
        assert!(locks.ensure_yearly_editable(ScenarioId::new()).is_ok());
    }

    #[test]
    fn test_compare_and_set_is_noop_from_wrong_state() {
        let locks = QuarterLocks::default().with(Quarter::Q2, true);

        let (after, changed) = locks.apply(Quarter::Q2, LockAction::Lock);
        assert!(!changed);
        assert_eq!(after, locks);

        let (after, changed) = locks.apply(Quarter::Q4, LockAction::Unlock);
        assert!(!changed);
        assert_eq!(after, locks);
    }

    #[test]
    fn test_apply_touches_only_target_latch() {
        let (locks, _) = QuarterLocks::default().apply(Quarter::Q2, LockAction::Lock);
        assert_eq!(locks, QuarterLocks::from_flags(false, true, false, false));
        assert_eq!(locks.locked_quarters(), vec![Quarter::Q2]);
    }

    #[test]
    fn test_unlock_is_destructive() {
        assert!(LockAction::Unlock.is_destructive());
        assert!(!LockAction::Lock.is_destructive());
    }

    #[test]
    fn test_edit_surface() {
        let surface = EditSurface::new(false, QuarterLocks::default());
        assert!(surface.yearly_editable);
        assert!(!surface.monthly_detail_enabled);
        assert!(surface.tracking_actuals.is_empty());

        let locks = QuarterLocks::from_flags(true, false, false, true);
        let surface = EditSurface::new(true, locks);
        assert!(!surface.yearly_editable);
        assert!(surface.monthly_detail_enabled);
        assert_eq!(surface.tracking_actuals, vec![1, 4]);
    }
}
