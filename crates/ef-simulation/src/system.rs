use std::any::Any;

use crate::context::SimContext;
use crate::error::SimResult;

/// One stage of the per-tick update, owned by a [`crate::Simulation`].
///
/// The simulation ticks its systems in the order they were added. The
/// energy systems run before the thermal scene in the default setup, so
/// heat produced by a user element is visible to thermometers the same tick.
pub trait System: std::fmt::Debug {
    /// Stable identifier, used in logs and by [`crate::Simulation::system_names`].
    fn name(&self) -> &'static str;

    /// Advance by one tick of `ctx.dt()` seconds.
    fn tick(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()>;

    /// Runs once, before the first tick.
    fn init(&mut self, _ctx: &mut SimContext<'_>) -> SimResult<()> {
        Ok(())
    }

    /// Borrow as [`Any`] so callers can reach the concrete system.
    fn as_any(&self) -> &dyn Any;

    /// Mutable counterpart of [`System::as_any`].
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
