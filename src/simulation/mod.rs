//! Background tick loop around the herd engine.
//!
//! The [`Simulator`] owns the engine behind an async mutex and drives it
//! from a tokio task: tick, push the herd to a [`HerdSink`], sleep, repeat.
//! Both the admin API and the service binary talk to the simulator only
//! through this handle.
//!
//! [`HerdSink`]: crate::upstream::HerdSink

mod runner;
mod state;

pub use runner::Simulator;
pub use state::SimState;
