//! Evolution-system capability interface.
//!
//! The subcell core knows nothing about physics. A system hands it field
//! counts, names, and which fields the troubled-cell indicators monitor,
//! through this trait, passed in at configuration time and never through a
//! process-wide registry. Fluxes and primitive recovery stay with the
//! caller; the core only produces reconstructed face states for them.

use crate::reconstruction::SlopeLimiter;

/// Capabilities a physical system exposes to the subcell core.
pub trait EvolutionSystem {
    /// Number of evolved fields.
    fn num_fields(&self) -> usize;

    /// Field names, for diagnostics. Length equals `num_fields()`.
    fn field_names(&self) -> &[&'static str];

    /// Indices of the fields the troubled-cell indicators monitor.
    ///
    /// Defaults to all evolved fields.
    fn tci_fields(&self) -> Vec<usize> {
        (0..self.num_fields()).collect()
    }

    /// Reconstruction method this system prefers, if it overrides the
    /// configured one.
    fn preferred_limiter(&self) -> Option<SlopeLimiter> {
        None
    }
}

/// Single-field scalar advection, the simplest system. Used by the tests
/// and as the reference for implementing real systems.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScalarAdvection;

impl EvolutionSystem for ScalarAdvection {
    fn num_fields(&self) -> usize {
        1
    }

    fn field_names(&self) -> &[&'static str] {
        &["u"]
    }
}
