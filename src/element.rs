//! Per-element subcell driver.
//!
//! `SubcellElement` owns everything one element needs for the hybrid
//! scheme: its mesh, canonical field variables, active-grid state, RDMP
//! history, received ghost buffers, and the configuration. It exposes the
//! synchronous calls the external scheduler drives, one element per task:
//!
//! 1. `pack_ghost_data` for each internal face (sent to neighbors),
//! 2. `receive_ghost_data` as neighbor buffers arrive,
//! 3. `compute_troubled_cell_decision` once all monitored data is in,
//! 4. `reconstruct_face_solution` per face for the flux collaborator,
//! 5. `commit_step` to apply the grid-switch policy and roll RDMP bounds.
//!
//! The core never blocks: waiting for neighbors is the scheduler's job,
//! and face reconstruction errors out rather than suspending when a halo
//! is missing.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::active_grid::{ActiveGrid, GridSwitcher, GridTransition, SwitchRecord};
use crate::error::SubcellError;
use crate::ghost_data::{
    extract_boundary_slab, validate_and_convert, width_to_send, GhostData, NeighborTopology,
};
use crate::mesh::Mesh;
use crate::projection::{project_to_subcell, reconstruct_from_subcell};
use crate::reconstruction::{reconstruct_face_solution_impl, FaceSolution, SlopeLimiter};
use crate::system::EvolutionSystem;
use crate::tci::{run_tci, FieldBounds, RdmpTciData, TciOptions, TciStatus};
use crate::types::{Direction, ElementId, RefinementLevel};
use crate::variables::Variables;

/// Configuration of the subcell scheme for one element.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SubcellOptions {
    /// Troubled-cell indicator thresholds.
    pub tci: TciOptions,
    /// Consecutive untroubled steps required before Subcell → Dg.
    pub hysteresis_steps: u32,
    /// Halo cells per side for the reconstruction stencil.
    pub ghost_width: usize,
    /// Grid the element starts on (Dg unless the initial data is known
    /// to be discontinuous).
    pub initial_grid: ActiveGrid,
    /// Reconstruction method, unless the system overrides it.
    pub limiter: SlopeLimiter,
    /// Re-run the spectral indicator on freshly reconstructed DG data
    /// and cancel the switch if it fires.
    pub recheck_after_reconstruction: bool,
}

impl Default for SubcellOptions {
    fn default() -> Self {
        Self {
            tci: TciOptions::default(),
            hysteresis_steps: 2,
            ghost_width: 2,
            initial_grid: ActiveGrid::Dg,
            limiter: SlopeLimiter::Minmod,
            recheck_after_reconstruction: true,
        }
    }
}

impl SubcellOptions {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), SubcellError> {
        self.tci.validate()?;
        if self.hysteresis_steps == 0 {
            return Err(SubcellError::InvalidOptions(
                "hysteresis_steps must be at least 1".into(),
            ));
        }
        if self.ghost_width == 0 {
            return Err(SubcellError::InvalidOptions(
                "ghost_width must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Everything that must survive a checkpoint/restart or a load-balancing
/// migration. The RDMP history and hysteresis streak are not recomputable
/// from current fields, so losing them would change the switch policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElementCheckpoint {
    /// Element id.
    pub id: ElementId,
    /// Refinement level.
    pub level: RefinementLevel,
    /// Mesh descriptor.
    pub mesh: Mesh,
    /// Canonical grid at checkpoint time.
    pub grid: ActiveGrid,
    /// Step counter.
    pub step: u64,
    /// Untroubled streak inside the hysteresis window.
    pub untroubled_streak: u32,
    /// Grid-switch history.
    pub history: Vec<SwitchRecord>,
    /// RDMP min/max history.
    pub rdmp: RdmpTciData,
    /// Canonical field variables (nodal if `grid` is Dg, cell averages
    /// if Subcell).
    pub variables: Variables,
}

/// One element of the hybrid DG-subcell scheme.
pub struct SubcellElement<S: EvolutionSystem> {
    id: ElementId,
    level: RefinementLevel,
    mesh: Mesh,
    system: S,
    topology: NeighborTopology,
    options: SubcellOptions,
    switcher: GridSwitcher,
    // Exactly one of these is canonical (selected by the active grid);
    // the other, when present, is a derived cache retained for at most
    // one step and regenerated via projection before any use.
    dg_vars: Option<Variables>,
    subcell_vars: Option<Variables>,
    rdmp: RdmpTciData,
    ghost: HashMap<Direction, GhostData>,
    step: u64,
}

impl<S: EvolutionSystem> SubcellElement<S> {
    /// Create an element from initial DG nodal data.
    ///
    /// If `options.initial_grid` is `Subcell`, the data is projected
    /// immediately and the subcell representation becomes canonical.
    pub fn new(
        id: ElementId,
        level: RefinementLevel,
        mesh: Mesh,
        system: S,
        topology: NeighborTopology,
        options: SubcellOptions,
        initial: Variables,
    ) -> Result<Self, SubcellError> {
        options.validate()?;
        if initial.num_fields() != system.num_fields() {
            return Err(SubcellError::InvalidOptions(format!(
                "initial data has {} fields but the system evolves {}",
                initial.num_fields(),
                system.num_fields()
            )));
        }
        if initial.points_per_field() != mesh.num_grid_points() {
            return Err(SubcellError::InvalidMesh(format!(
                "initial data has {} points per field but the mesh has {}",
                initial.points_per_field(),
                mesh.num_grid_points()
            )));
        }

        let averages = initial.map_fields(mesh.num_subcells(), |f| project_to_subcell(f, &mesh));
        let seed: Vec<FieldBounds> = system
            .tci_fields()
            .iter()
            .map(|&f| FieldBounds::from_slice(averages.field(f)))
            .collect();

        let (dg_vars, subcell_vars) = match options.initial_grid {
            ActiveGrid::Dg => (Some(initial), None),
            ActiveGrid::Subcell => (None, Some(averages)),
        };

        Ok(Self {
            id,
            level,
            mesh,
            system,
            topology,
            switcher: GridSwitcher::new(options.initial_grid, options.hysteresis_steps),
            options,
            dg_vars,
            subcell_vars,
            rdmp: RdmpTciData::new(seed),
            ghost: HashMap::new(),
            step: 0,
        })
    }

    /// Element id.
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Mesh descriptor.
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Canonical grid.
    pub fn active_grid(&self) -> ActiveGrid {
        self.switcher.grid()
    }

    /// Completed steps.
    pub fn step(&self) -> u64 {
        self.step
    }

    /// RDMP history.
    pub fn rdmp(&self) -> &RdmpTciData {
        &self.rdmp
    }

    /// Grid-switch history.
    pub fn switch_history(&self) -> &[SwitchRecord] {
        self.switcher.history()
    }

    /// Canonical variables (nodal or averages, per the active grid).
    pub fn variables(&self) -> &Variables {
        match self.switcher.grid() {
            ActiveGrid::Dg => self.dg_vars.as_ref().expect("canonical DG data missing"),
            ActiveGrid::Subcell => self
                .subcell_vars
                .as_ref()
                .expect("canonical subcell data missing"),
        }
    }

    /// Overwrite the canonical variables (the time stepper's update).
    pub fn set_variables(&mut self, vars: Variables) -> Result<(), SubcellError> {
        let expected = match self.switcher.grid() {
            ActiveGrid::Dg => self.mesh.num_grid_points(),
            ActiveGrid::Subcell => self.mesh.num_subcells(),
        };
        if vars.num_fields() != self.system.num_fields() || vars.points_per_field() != expected {
            return Err(SubcellError::InvalidState {
                element: self.id,
                reason: format!(
                    "variables shaped {}x{} do not fit the active grid ({} points expected)",
                    vars.num_fields(),
                    vars.points_per_field(),
                    expected
                ),
            });
        }
        match self.switcher.grid() {
            ActiveGrid::Dg => self.dg_vars = Some(vars),
            ActiveGrid::Subcell => self.subcell_vars = Some(vars),
        }
        Ok(())
    }

    fn limiter(&self) -> SlopeLimiter {
        self.system.preferred_limiter().unwrap_or(self.options.limiter)
    }

    /// Subcell averages of the canonical state, projecting from DG on
    /// demand. Never reads a stale cache.
    fn current_subcell_averages(&self) -> Variables {
        match self.switcher.grid() {
            ActiveGrid::Subcell => self
                .subcell_vars
                .as_ref()
                .expect("canonical subcell data missing")
                .clone(),
            ActiveGrid::Dg => {
                let dg = self.dg_vars.as_ref().expect("canonical DG data missing");
                dg.map_fields(self.mesh.num_subcells(), |f| project_to_subcell(f, &self.mesh))
            }
        }
    }

    /// Extrema of each monitored field over own subcell averages and all
    /// received ghost halos (the two-mesh RDMP variant).
    fn monitored_extrema(&self, averages: &Variables) -> Vec<FieldBounds> {
        self.system
            .tci_fields()
            .iter()
            .map(|&f| {
                let mut bounds = FieldBounds::from_slice(averages.field(f));
                for ghost in self.ghost.values() {
                    bounds = bounds.union(FieldBounds::from_slice(ghost.fields.field(f)));
                }
                bounds
            })
            .collect()
    }

    /// Run the troubled-cell indicators on the current state.
    ///
    /// Pure with respect to element state; the result feeds
    /// [`commit_step`](Self::commit_step) in the same step.
    pub fn compute_troubled_cell_decision(&self) -> Result<TciStatus, SubcellError> {
        let averages = self.current_subcell_averages();
        let candidate = self.monitored_extrema(&averages);

        // The spectral indicator only applies to the DG representation.
        let monitored = self.system.tci_fields();
        let persson_fields: Vec<(usize, &[f64])> = match self.switcher.grid() {
            ActiveGrid::Dg => {
                let dg = self.dg_vars.as_ref().expect("canonical DG data missing");
                monitored.iter().map(|&f| (f, dg.field(f))).collect()
            }
            ActiveGrid::Subcell => Vec::new(),
        };

        Ok(run_tci(
            &persson_fields,
            &self.mesh,
            &candidate,
            &self.rdmp,
            &self.options.tci,
        ))
    }

    /// Apply the grid-switch policy for this step and roll the RDMP
    /// history. Also retires last step's stale representation cache and
    /// discards consumed ghost buffers.
    pub fn commit_step(&mut self, status: &TciStatus) -> Result<GridTransition, SubcellError> {
        // Last step's abandoned representation has served its one-step
        // retention; drop it before this step's transition.
        match self.switcher.grid() {
            ActiveGrid::Dg => self.subcell_vars = None,
            ActiveGrid::Subcell => self.dg_vars = None,
        }

        let mut transition = self.switcher.apply(self.step, status.troubled);

        match transition {
            GridTransition::Stay => {}
            GridTransition::DgToSubcell => {
                let dg = self.dg_vars.as_ref().expect("canonical DG data missing");
                let averages =
                    dg.map_fields(self.mesh.num_subcells(), |f| project_to_subcell(f, &self.mesh));
                // The DG data stays behind as a stale cache for one step.
                self.subcell_vars = Some(averages);
            }
            GridTransition::SubcellToDg => {
                let nodal = self.reconstruct_nodal()?;
                let fired = self.options.recheck_after_reconstruction
                    && self
                        .system
                        .tci_fields()
                        .iter()
                        .any(|&f| {
                            crate::tci::persson_tci(
                                nodal.field(f),
                                &self.mesh,
                                self.options.tci.persson_exponent,
                            )
                        });
                if fired {
                    debug!(
                        "{}: reconstruction re-check fired, staying on subcell",
                        self.id
                    );
                    self.switcher.cancel_switch_to_dg();
                    transition = GridTransition::Stay;
                } else {
                    // Subcell data stays behind as a stale cache.
                    self.dg_vars = Some(nodal);
                }
            }
        }

        // Roll the RDMP ring with this step's extrema (from the now
        // canonical representation). History must stay finite, so a
        // non-finite observation keeps the previous envelope for that
        // field instead of poisoning the ring.
        let averages = self.current_subcell_averages();
        let observed = self.monitored_extrema(&averages);
        let current = self.rdmp.bounds();
        let sanitized: Vec<FieldBounds> = observed
            .into_iter()
            .zip(current)
            .map(|(obs, old)| if obs.is_finite() { obs } else { old })
            .collect();
        self.rdmp.update(sanitized);

        self.ghost.clear();
        self.step += 1;
        Ok(transition)
    }

    /// Materialize subcell averages from the canonical DG data as a
    /// derived cache (also the Dg → Subcell switch payload).
    pub fn project_to_subcell(&mut self) -> Result<(), SubcellError> {
        let dg = self.dg_vars.as_ref().ok_or_else(|| SubcellError::InvalidState {
            element: self.id,
            reason: "project_to_subcell requires DG nodal data".into(),
        })?;
        self.subcell_vars =
            Some(dg.map_fields(self.mesh.num_subcells(), |f| project_to_subcell(f, &self.mesh)));
        Ok(())
    }

    /// Materialize DG nodal data from the canonical subcell averages.
    ///
    /// Fails fatally if the reconstruction produces non-finite values:
    /// there is no further fallback below the subcell grid.
    pub fn reconstruct_to_dg(&mut self) -> Result<(), SubcellError> {
        let nodal = self.reconstruct_nodal()?;
        self.dg_vars = Some(nodal);
        Ok(())
    }

    fn reconstruct_nodal(&self) -> Result<Variables, SubcellError> {
        let averages = self
            .subcell_vars
            .as_ref()
            .ok_or_else(|| SubcellError::InvalidState {
                element: self.id,
                reason: "reconstruct_to_dg requires subcell data".into(),
            })?;
        let nodal = averages
            .map_fields(self.mesh.num_grid_points(), |f| {
                reconstruct_from_subcell(f, &self.mesh)
            });
        if let Some(f) = nodal.first_non_finite_field() {
            return Err(SubcellError::NonFiniteResult {
                element: self.id,
                field: self.system.field_names()[f].to_string(),
                operation: "subcell-to-DG reconstruction".to_string(),
            });
        }
        Ok(nodal)
    }

    /// Pack the halo for one neighbor into transport bytes.
    ///
    /// Always sends subcell averages (projecting from DG if needed),
    /// sized for the receiver's resolution.
    pub fn pack_ghost_data(&self, direction: Direction) -> Result<Vec<u8>, SubcellError> {
        let neighbor = self.topology.neighbor(direction).ok_or_else(|| {
            SubcellError::NeighborMismatch {
                direction,
                reason: "no neighbor registered on this face".into(),
            }
        })?;

        let averages = self.current_subcell_averages();
        let extents = self.mesh.subcell_extents();
        let mut width = width_to_send(self.options.ghost_width, self.level, neighbor.level)
            .min(extents[direction.axis]);
        if neighbor.level < self.level {
            // A coarser receiver restricts 2:1, so the count must be even.
            width -= width % 2;
        }
        let (slab, slab_extents) = extract_boundary_slab(&averages, &extents, direction, width);

        GhostData {
            sender: self.id,
            sender_level: self.level,
            sender_grid: self.switcher.grid(),
            sent_from: direction,
            extents: slab_extents,
            fields: slab,
            committed: true,
        }
        .encode()
    }

    /// Accept a neighbor's halo for one face.
    ///
    /// Validates the buffer against the topology and converts it to this
    /// element's resolution; afterwards reconstruction never sees a
    /// resolution mismatch. Buffers for different directions are
    /// independent and may arrive in any order.
    pub fn receive_ghost_data(
        &mut self,
        direction: Direction,
        bytes: &[u8],
    ) -> Result<(), SubcellError> {
        let neighbor = self.topology.neighbor(direction).ok_or_else(|| {
            SubcellError::NeighborMismatch {
                direction,
                reason: "received ghost data on a face with no neighbor".into(),
            }
        })?;
        let ghost = GhostData::decode(bytes)?;
        let converted = validate_and_convert(
            ghost,
            direction,
            neighbor,
            self.level,
            &self.mesh.subcell_extents(),
            self.options.ghost_width,
        )?;
        self.ghost.insert(direction, converted);
        Ok(())
    }

    /// The converted halo currently held for one direction, if any.
    pub fn ghost_data(&self, direction: Direction) -> Option<&GhostData> {
        self.ghost.get(&direction)
    }

    /// True once the halo for every registered neighbor has arrived.
    pub fn all_ghost_data_received(&self) -> bool {
        self.topology.iter().all(|(d, _)| self.ghost.contains_key(d))
    }

    /// Reconstruct interior/exterior states on one external face for the
    /// flux collaborator.
    ///
    /// The caller must have delivered the halo for this direction first;
    /// a missing buffer is an error, never a blocking wait.
    pub fn reconstruct_face_solution(
        &self,
        direction: Direction,
    ) -> Result<FaceSolution, SubcellError> {
        let ghost = self
            .ghost
            .get(&direction)
            .ok_or(SubcellError::MissingGhostData(direction))?;
        let averages = self.current_subcell_averages();
        Ok(reconstruct_face_solution_impl(
            &averages,
            &self.mesh.subcell_extents(),
            ghost,
            direction,
            self.limiter(),
        ))
    }

    /// Snapshot the migratable element state.
    pub fn checkpoint(&self) -> ElementCheckpoint {
        ElementCheckpoint {
            id: self.id,
            level: self.level,
            mesh: self.mesh,
            grid: self.switcher.grid(),
            step: self.step,
            untroubled_streak: self.switcher.untroubled_streak(),
            history: self.switcher.history().to_vec(),
            rdmp: self.rdmp.clone(),
            variables: self.variables().clone(),
        }
    }

    /// Rebuild an element from a checkpoint plus the non-migratable
    /// collaborators (system, topology, options).
    pub fn restore(
        checkpoint: ElementCheckpoint,
        system: S,
        topology: NeighborTopology,
        options: SubcellOptions,
    ) -> Result<Self, SubcellError> {
        options.validate()?;
        if checkpoint.variables.num_fields() != system.num_fields() {
            return Err(SubcellError::InvalidOptions(format!(
                "checkpoint has {} fields but the system evolves {}",
                checkpoint.variables.num_fields(),
                system.num_fields()
            )));
        }

        let (dg_vars, subcell_vars) = match checkpoint.grid {
            ActiveGrid::Dg => (Some(checkpoint.variables), None),
            ActiveGrid::Subcell => (None, Some(checkpoint.variables)),
        };

        Ok(Self {
            id: checkpoint.id,
            level: checkpoint.level,
            mesh: checkpoint.mesh,
            system,
            topology,
            switcher: GridSwitcher::restore(
                checkpoint.grid,
                options.hysteresis_steps,
                checkpoint.untroubled_streak,
                checkpoint.history,
            ),
            options,
            dg_vars,
            subcell_vars,
            rdmp: checkpoint.rdmp,
            ghost: HashMap::new(),
            step: checkpoint.step,
        })
    }
}

/// Run the troubled-cell decision for many independent elements in
/// parallel. Elements never share mutable state, so this is a plain
/// data-parallel map.
#[cfg(feature = "parallel")]
pub fn compute_decisions_parallel<S>(
    elements: &[SubcellElement<S>],
) -> Vec<Result<TciStatus, SubcellError>>
where
    S: EvolutionSystem + Sync,
{
    use rayon::prelude::*;
    elements
        .par_iter()
        .map(|e| e.compute_troubled_cell_decision())
        .collect()
}
