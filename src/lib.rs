//! A spatial-connectivity engine for large-scale neural network
//! construction: geometric masks, position-dependent parameters and four
//! connection-generation strategies between spatially placed node
//! populations. The core never owns a simulation kernel, an RNG
//! implementation, or a scripting front end — it drives the narrow
//! collaborator traits in [`sink`] and [`rng`] and leaves everything else
//! to the surrounding application.

pub mod config;
pub mod connection;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod mask;
pub mod masked_layer;
pub mod ntree;
pub mod parameter;
pub mod rng;
pub mod sink;

pub use error::{ConnectError, ConnectResult};
pub use geometry::{Bounds, Periodicity, Position};
pub use layer::{Layer, Selector};
pub use mask::Mask;
pub use masked_layer::MaskedLayer;
pub use parameter::Parameter;
