pub mod analysis;
pub mod error;
pub mod frontier;
pub mod linalg;
pub mod market;
pub mod solver;
pub mod types;

pub use error::MarkowitzError;
pub use frontier::{sweep, FrontierCurve};
pub use market::{Aggregates, MarketModel};
pub use solver::{solve, Portfolio};
pub use types::*;

/// Standard result type for all markowitz-core operations
pub type MarkowitzResult<T> = Result<T, MarkowitzError>;
