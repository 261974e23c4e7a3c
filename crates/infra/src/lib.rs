//! Infrastructure layer: store boundaries, in-memory stores, configuration and
//! the reservation engine that coordinates them.

pub mod config;
pub mod reservation_engine;
pub mod store;


pub use config::{AddQuantityPolicy, ConfigError, EngineConfig};
pub use reservation_engine::{ReservationEngine, ReservationError};
