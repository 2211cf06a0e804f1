//! Single-level transaction state.
//!
//! The state machine only decides; the adapter carries out the [`TxEffect`] on the
//! master connection. Redundant `begin` and `commit` are silent no-ops, while
//! `rollback` always runs, whatever the current state.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxState {
    #[default]
    Idle,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxEvent {
    Begin,
    Commit,
    Rollback,
}

/// Work to perform on the master connection for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxEffect {
    None,
    DisableAutocommit,
    CommitAndRestore,
    RollbackAndRestore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: TxState,
    pub effect: TxEffect,
}

impl TxState {
    /// The transition table.
    pub fn on(self, event: TxEvent) -> Transition {
        use TxEffect::*;
        use TxEvent::*;
        use TxState::*;

        let (next, effect) = match (self, event) {
            (Idle, Begin) => (Active, DisableAutocommit),
            (Active, Begin) => (Active, None),
            (Active, Commit) => (Idle, CommitAndRestore),
            (Idle, Commit) => (Idle, None),
            (_, Rollback) => (Idle, RollbackAndRestore),
        };
        Transition { next, effect }
    }
}

/// Transaction flag owned by one adapter.
#[derive(Debug, Default)]
pub struct TransactionState {
    state: TxState,
}

impl TransactionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == TxState::Active
    }

    /// Look up the transition for `event` without applying it.
    pub fn plan(&self, event: TxEvent) -> Transition {
        self.state.on(event)
    }

    /// Move to the state chosen by `transition`.
    pub fn apply(&mut self, transition: Transition) {
        self.state = transition.next;
    }

    /// Forget any open transaction, e.g. after the connection was closed.
    pub fn reset(&mut self) {
        self.state = TxState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_from_idle_disables_autocommit() {
        let t = TxState::Idle.on(TxEvent::Begin);
        assert_eq!(t.next, TxState::Active);
        assert_eq!(t.effect, TxEffect::DisableAutocommit);
    }

    #[test]
    fn test_begin_while_active_is_silent() {
        let t = TxState::Active.on(TxEvent::Begin);
        assert_eq!(t.next, TxState::Active);
        assert_eq!(t.effect, TxEffect::None);
    }

    #[test]
    fn test_commit_only_acts_when_active() {
        assert_eq!(
            TxState::Active.on(TxEvent::Commit),
            Transition {
                next: TxState::Idle,
                effect: TxEffect::CommitAndRestore
            }
        );
        assert_eq!(
            TxState::Idle.on(TxEvent::Commit),
            Transition {
                next: TxState::Idle,
                effect: TxEffect::None
            }
        );
    }

    // Rollback is deliberately not symmetric with commit: it runs from Idle too.
    #[test]
    fn test_rollback_always_acts() {
        for state in [TxState::Idle, TxState::Active] {
            let t = state.on(TxEvent::Rollback);
            assert_eq!(t.next, TxState::Idle);
            assert_eq!(t.effect, TxEffect::RollbackAndRestore);
        }
    }

    #[test]
    fn test_state_apply_and_reset() {
        let mut tx = TransactionState::new();
        assert!(!tx.is_active());

        let t = tx.plan(TxEvent::Begin);
        tx.apply(t);
        assert!(tx.is_active());

        tx.reset();
        assert_eq!(tx.state(), TxState::Idle);
    }
}
