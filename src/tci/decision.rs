//! Combined troubled-cell decision.
//!
//! Applies every enabled indicator to the monitored fields and reports
//! troubled if ANY of them fires. The status is derived fresh each step
//! and is only consumed by the active-grid state machine; it is never
//! persisted.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::SubcellError;
use crate::mesh::Mesh;
use crate::tci::persson::persson_tci;
use crate::tci::rdmp::{FieldBounds, RdmpTciData};

/// Configuration for the troubled-cell indicators.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TciOptions {
    /// Enable the Persson spectral indicator (Dg grid only).
    pub use_persson: bool,
    /// Enable the RDMP bounds indicator.
    pub use_rdmp: bool,
    /// Persson exponent alpha in the N^(-alpha) threshold.
    pub persson_exponent: f64,
    /// RDMP absolute tolerance floor.
    pub rdmp_delta0: f64,
    /// RDMP relative tolerance.
    pub rdmp_epsilon: f64,
}

impl Default for TciOptions {
    fn default() -> Self {
        Self {
            use_persson: true,
            use_rdmp: true,
            persson_exponent: 4.0,
            rdmp_delta0: 1e-7,
            rdmp_epsilon: 1e-3,
        }
    }
}

impl TciOptions {
    /// Validate thresholds. Out-of-range values are a setup bug.
    pub fn validate(&self) -> Result<(), SubcellError> {
        if !self.persson_exponent.is_finite() || self.persson_exponent <= 0.0 {
            return Err(SubcellError::InvalidOptions(format!(
                "persson_exponent must be finite and positive, got {}",
                self.persson_exponent
            )));
        }
        if !self.rdmp_delta0.is_finite() || self.rdmp_delta0 < 0.0 {
            return Err(SubcellError::InvalidOptions(format!(
                "rdmp_delta0 must be finite and non-negative, got {}",
                self.rdmp_delta0
            )));
        }
        if !self.rdmp_epsilon.is_finite() || self.rdmp_epsilon < 0.0 {
            return Err(SubcellError::InvalidOptions(format!(
                "rdmp_epsilon must be finite and non-negative, got {}",
                self.rdmp_epsilon
            )));
        }
        Ok(())
    }
}

/// Which indicator flagged the element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TciTrigger {
    /// A monitored field contained NaN or Inf.
    NonFinite {
        /// Monitored-field index.
        field: usize,
    },
    /// The Persson indicator found high-mode energy above threshold.
    Persson {
        /// Monitored-field index.
        field: usize,
    },
    /// A monitored field violated the relaxed maximum principle.
    Rdmp {
        /// Monitored-field index.
        field: usize,
    },
}

/// Per-step troubled-cell decision.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TciStatus {
    /// Whether the element is troubled this step.
    pub troubled: bool,
    /// The first indicator that fired, if any.
    pub trigger: Option<TciTrigger>,
}

impl TciStatus {
    /// A clean (not troubled) status.
    pub fn smooth() -> Self {
        Self {
            troubled: false,
            trigger: None,
        }
    }

    /// A troubled status with the firing indicator.
    pub fn fired(trigger: TciTrigger) -> Self {
        Self {
            troubled: true,
            trigger: Some(trigger),
        }
    }
}

/// Run all enabled indicators.
///
/// `persson_fields` holds `(monitored_index, nodal_data)` pairs and is
/// empty when the element is on the subcell grid (the spectral indicator
/// has no meaning there). `candidate` holds the current extrema of every
/// monitored field, including neighbor ghost contributions (the two-mesh
/// RDMP variant).
pub(crate) fn run_tci(
    persson_fields: &[(usize, &[f64])],
    mesh: &Mesh,
    candidate: &[FieldBounds],
    rdmp: &RdmpTciData,
    options: &TciOptions,
) -> TciStatus {
    // Non-finite data short-circuits everything: the fallback exists
    // precisely to absorb it.
    for (f, bounds) in candidate.iter().enumerate() {
        if !bounds.is_finite() {
            warn!(
                "non-finite values in monitored field {}; forcing troubled",
                f
            );
            return TciStatus::fired(TciTrigger::NonFinite { field: f });
        }
    }

    if options.use_persson {
        for &(f, data) in persson_fields {
            if persson_tci(data, mesh, options.persson_exponent) {
                return TciStatus::fired(TciTrigger::Persson { field: f });
            }
        }
    }

    if options.use_rdmp {
        let envelope = rdmp.bounds();
        for (f, (cand, env)) in candidate.iter().zip(envelope).enumerate() {
            let delta = options.rdmp_delta0.max(options.rdmp_epsilon * (env.max - env.min));
            if cand.min < env.min - delta || cand.max > env.max + delta {
                return TciStatus::fired(TciTrigger::Rdmp { field: f });
            }
        }
    }

    TciStatus::smooth()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Basis, Quadrature};
    use crate::polynomial::gauss_lobatto_nodes;

    fn mesh_1d(n: usize) -> Mesh {
        Mesh::new(&[n], Basis::Legendre, Quadrature::GaussLobatto).unwrap()
    }

    fn b(min: f64, max: f64) -> FieldBounds {
        FieldBounds { min, max }
    }

    #[test]
    fn test_options_validation() {
        assert!(TciOptions::default().validate().is_ok());

        let mut opts = TciOptions::default();
        opts.persson_exponent = 0.0;
        assert!(opts.validate().is_err());

        let mut opts = TciOptions::default();
        opts.rdmp_epsilon = -1.0;
        assert!(opts.validate().is_err());

        let mut opts = TciOptions::default();
        opts.rdmp_delta0 = f64::NAN;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_non_finite_fires_first() {
        let mesh = mesh_1d(4);
        let rdmp = RdmpTciData::new(vec![b(0.0, 1.0)]);
        let status = run_tci(
            &[],
            &mesh,
            &[b(f64::NAN, f64::NAN)],
            &rdmp,
            &TciOptions::default(),
        );
        assert!(status.troubled);
        assert_eq!(status.trigger, Some(TciTrigger::NonFinite { field: 0 }));
    }

    #[test]
    fn test_persson_fires() {
        let mesh = mesh_1d(6);
        let step: Vec<f64> = gauss_lobatto_nodes(5)
            .iter()
            .map(|&x| if x < 0.0 { 0.0 } else { 1.0 })
            .collect();
        let rdmp = RdmpTciData::new(vec![b(-10.0, 10.0)]);
        let status = run_tci(
            &[(0, &step)],
            &mesh,
            &[b(0.0, 1.0)],
            &rdmp,
            &TciOptions::default(),
        );
        assert_eq!(status.trigger, Some(TciTrigger::Persson { field: 0 }));
    }

    #[test]
    fn test_rdmp_fires() {
        let mesh = mesh_1d(4);
        let rdmp = RdmpTciData::new(vec![b(0.0, 1.0)]);
        let status = run_tci(&[], &mesh, &[b(0.0, 2.0)], &rdmp, &TciOptions::default());
        assert_eq!(status.trigger, Some(TciTrigger::Rdmp { field: 0 }));
    }

    #[test]
    fn test_disabled_indicators_do_not_fire() {
        let mesh = mesh_1d(4);
        let rdmp = RdmpTciData::new(vec![b(0.0, 1.0)]);
        let opts = TciOptions {
            use_rdmp: false,
            ..TciOptions::default()
        };
        let status = run_tci(&[], &mesh, &[b(0.0, 2.0)], &rdmp, &opts);
        assert!(!status.troubled);
    }

    #[test]
    fn test_all_clean() {
        let mesh = mesh_1d(6);
        let sine: Vec<f64> = gauss_lobatto_nodes(5)
            .iter()
            .map(|&x| (0.5 * std::f64::consts::PI * x).sin())
            .collect();
        let rdmp = RdmpTciData::new(vec![b(-1.0, 1.0)]);
        let status = run_tci(
            &[(0, &sine)],
            &mesh,
            &[b(-1.0, 1.0)],
            &rdmp,
            &TciOptions::default(),
        );
        assert!(!status.troubled);
        assert!(status.trigger.is_none());
    }
}
