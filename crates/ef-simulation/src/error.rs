use ef_core::EfError;

/// Result alias for simulation operations.
pub type SimResult<T> = Result<T, SimError>;

/// Errors raised while building or driving a [`crate::Simulation`].
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A configuration or selection error from the engine crates.
    #[error(transparent)]
    Engine(#[from] EfError),

    /// Thermal state can only be restored before the first tick.
    #[error("simulation already started (tick {0}); thermal state can only be restored at tick 0")]
    AlreadyStarted(u64),

    /// An operation needed a system that was never registered.
    #[error("no {0} system registered")]
    MissingSystem(&'static str),

    /// A snapshot could not be rendered or parsed.
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
