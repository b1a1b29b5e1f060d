use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{name} must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must lie within [0, 1], got {value}")]
    OutOfUnitRange { name: &'static str, value: f64 },

    #[error("{name} must not be negative or non-finite, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("{name} must be greater than zero")]
    ZeroLimit { name: &'static str },
}
