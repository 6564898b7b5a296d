//! Optimistic mutation machinery and the collaborators it reports to.

/// Notification sink and confirmation gate interfaces.
pub mod collab;
/// Pending-mutation ledger and the optimistic apply/settle primitive.
pub mod optimistic;
