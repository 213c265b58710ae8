//! Serde model of Lottie-compatible animation documents.
//!
//! Field names follow the compact JSON keys of the format (`ks`, `ip`, `op`,
//! ...); accessor methods give the semantic view used by the engine.

pub mod model;

pub use model::{Animation, Layer, LayerKind, ShapeItem};
