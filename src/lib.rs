//! Continuous Hierarchical Temporal Memory.
//!
//! Regions of cells learn sparse distributed representations of a stream of real-valued input.
//! Cells compete through overlap and local inhibition, adapt their synapse permanences with a
//! Hebbian rule, and keep a continuous activation level that fades over time instead of a
//! binary on/off state. Lateral (distal) segments add a predictive bias to the overlap score.

pub mod core;
