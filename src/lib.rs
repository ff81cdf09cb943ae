//! # dg-subcell
//!
//! Core of a DG-subcell hybrid solver for hyperbolic PDEs: a high-order
//! discontinuous Galerkin (DG) discretization where the solution is
//! smooth, with an automatic per-element fallback to a robust
//! cell-averaged finite-difference (subcell) representation where it is
//! not.
//!
//! This crate provides the building blocks of the scheme:
//! - Per-element mesh descriptor and the paired subcell grid
//! - Conservative DG → subcell projection and its exact left-inverse
//!   reconstruction
//! - Troubled-cell indicators (Persson spectral, relaxed discrete
//!   maximum principle with two-mesh neighbor checks)
//! - The active-grid state machine with hysteresis against chattering
//! - Ghost-zone packing/unpacking across mixed-resolution,
//!   mixed-representation interfaces
//! - Slope-limited face reconstruction feeding an external Riemann
//!   solver
//!
//! The crate is driven synchronously, one element per task, by an
//! external scheduler; it performs no threading and never blocks. See
//! [`SubcellElement`] for the scheduler-facing API.

pub mod active_grid;
pub mod basis;
pub mod element;
pub mod error;
pub mod ghost_data;
pub mod mesh;
pub mod polynomial;
pub mod projection;
pub mod reconstruction;
pub mod system;
pub mod tci;
pub mod types;
pub mod variables;

// Re-export the main types for convenience.
pub use active_grid::{ActiveGrid, GridSwitcher, GridTransition, SwitchRecord};
pub use basis::Vandermonde;
pub use element::{ElementCheckpoint, SubcellElement, SubcellOptions};
pub use error::SubcellError;
pub use ghost_data::{GhostData, NeighborInfo, NeighborTopology};
pub use mesh::{Basis, Mesh, Quadrature};
pub use projection::{project_to_subcell, projection_pair, reconstruct_from_subcell};
pub use reconstruction::{reconstruct_line_faces, FacePair, FaceSolution, SlopeLimiter};
pub use system::{EvolutionSystem, ScalarAdvection};
pub use tci::{persson_tci, FieldBounds, RdmpTciData, TciOptions, TciStatus, TciTrigger};
pub use types::{Direction, ElementId, RefinementLevel, Side};
pub use variables::Variables;

#[cfg(feature = "parallel")]
pub use element::compute_decisions_parallel;
