//! Troubled-cell indicators.
//!
//! Three independent, composable diagnostics decide whether an element's
//! DG representation can be trusted:
//! - [`persson`]: spectral (modal) energy concentrated in the highest
//!   modes signals an unresolved feature.
//! - [`rdmp`]: violation of a relaxed discrete maximum principle against
//!   rolling historical bounds (two-mesh variant includes neighbor ghost
//!   extrema).
//! - Non-finite values in any monitored field: always troubled.
//!
//! An element is troubled if ANY enabled indicator fires; the hysteresis
//! that prevents chattering lives in the active-grid state machine, not
//! here. Indicator computation never fails for finite input.

mod decision;
mod persson;
mod rdmp;

pub use decision::{TciOptions, TciStatus, TciTrigger};
pub use persson::persson_tci;
pub use rdmp::{FieldBounds, RdmpTciData};

pub(crate) use decision::run_tci;
