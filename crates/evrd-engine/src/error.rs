use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("missing_identifier: {0}")]
    MissingIdentifier(String),

    #[error("store error: {0}")]
    Store(#[from] evrd_store::StoreError),

    #[error("bus error: {0}")]
    Bus(#[from] evrd_bus::BusError),
}
