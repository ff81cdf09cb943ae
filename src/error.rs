//! Error types for the subcell solver core.
//!
//! The taxonomy follows the failure model of the scheme:
//! - Configuration errors (bad mesh, bad thresholds, inconsistent neighbor
//!   topology) are fatal and reported immediately via `Err`.
//! - Numerical degeneracy in *input* fields (NaN/Inf) is never an error:
//!   the troubled-cell indicators treat it as an automatic "troubled"
//!   signal, since the subcell fallback exists to handle exactly that.
//! - Non-finite output of the fallback path itself is fatal
//!   (`NonFiniteResult`); there is no further fallback.

use thiserror::Error;

use crate::types::{Direction, ElementId};

/// Error type for the subcell solver core.
#[derive(Debug, Error)]
pub enum SubcellError {
    /// Mesh descriptor rejected at construction (zero points, bad dimension).
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    /// Subcell options rejected at validation (threshold out of range, ...).
    #[error("invalid subcell options: {0}")]
    InvalidOptions(String),

    /// Incoming ghost data contradicts the receiver's neighbor topology.
    ///
    /// This indicates a setup bug, not a runtime physical condition,
    /// and is never silently corrected.
    #[error("neighbor mismatch in direction {direction}: {reason}")]
    NeighborMismatch {
        /// Direction of the offending interface (receiver's frame).
        direction: Direction,
        /// Human-readable description of the inconsistency.
        reason: String,
    },

    /// Face reconstruction was requested before the ghost buffer for that
    /// direction arrived. The caller owns the ordering contract.
    #[error("no ghost data received from direction {0}")]
    MissingGhostData(Direction),

    /// An operation was invoked that requires a representation the element
    /// does not currently hold (e.g. reconstructing to DG while on Dg grid).
    #[error("element {element}: {reason}")]
    InvalidState {
        /// Element reporting the problem.
        element: ElementId,
        /// What was requested vs what is held.
        reason: String,
    },

    /// The finite-difference fallback produced non-finite values.
    #[error("element {element}: non-finite values in field `{field}` after {operation}")]
    NonFiniteResult {
        /// Element reporting the problem.
        element: ElementId,
        /// Name of the offending field.
        field: String,
        /// Operation that produced the values.
        operation: String,
    },

    /// Ghost buffer failed to decode.
    #[error("ghost data decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// Ghost buffer failed to encode.
    #[error("ghost data encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
}
