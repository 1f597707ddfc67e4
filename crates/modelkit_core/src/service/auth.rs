//! Authentication context consumed by create operations.

/// Identifies the actor performing writes.
pub trait AuthContext: Send + Sync {
    /// `None` when no actor is signed in.
    fn current_actor_id(&self) -> Option<i64>;
}

/// Fixed actor, for hosts with a single identity and for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticActor(pub Option<i64>);

impl AuthContext for StaticActor {
    fn current_actor_id(&self) -> Option<i64> {
        self.0
    }
}
