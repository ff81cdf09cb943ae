//! Ghost-zone data exchange.
//!
//! Before boundary terms can be computed, every element needs a halo of
//! neighbor data for each external face, wide enough for the
//! reconstruction stencil. Ghost data is ALWAYS exchanged in the subcell
//! (cell-average) representation (a sender on the Dg grid projects
//! first), so that receivers never need to know the sender's basis.
//!
//! Cross-refinement interfaces are resolved at *unpack* time: the
//! receiver restricts (pairwise averages) or prolongs (piecewise-constant
//! refinement) the halo to its own resolution, so face reconstruction
//! always operates on same-resolution data. The sender sizes the halo so
//! the receiver ends up with `ghost_width` cells at its own resolution,
//! or fewer when the sender's mesh is too small to supply that many.
//!
//! Buffers are MessagePack-encoded for transport; each buffer lives for
//! one communication round and is owned by the receiver until consumed.
//! Directions are independent: any unpack order is fine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::active_grid::ActiveGrid;
use crate::error::SubcellError;
use crate::mesh::strides;
use crate::types::{Direction, ElementId, RefinementLevel, Side};
use crate::variables::Variables;

/// What the receiver knows about one neighbor, from the domain layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborInfo {
    /// The neighbor's element id.
    pub id: ElementId,
    /// The neighbor's refinement level.
    pub level: RefinementLevel,
}

/// Direction → neighbor map for one element.
///
/// Faces without an entry are external domain boundaries; ghost data for
/// them comes from boundary conditions, outside this crate.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NeighborTopology {
    neighbors: HashMap<Direction, NeighborInfo>,
}

impl NeighborTopology {
    /// An empty topology (all faces external).
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a neighbor on one face.
    pub fn insert(&mut self, direction: Direction, info: NeighborInfo) {
        self.neighbors.insert(direction, info);
    }

    /// Look up the neighbor on one face.
    pub fn neighbor(&self, direction: Direction) -> Option<&NeighborInfo> {
        self.neighbors.get(&direction)
    }

    /// Iterate over all internal faces.
    pub fn iter(&self) -> impl Iterator<Item = (&Direction, &NeighborInfo)> {
        self.neighbors.iter()
    }
}

/// A halo of subcell averages sent across one interface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GhostData {
    /// Sending element.
    pub sender: ElementId,
    /// Sender's refinement level.
    pub sender_level: RefinementLevel,
    /// Grid the sender was on when packing (diagnostic; data is always
    /// subcell averages).
    pub sender_grid: ActiveGrid,
    /// The face of the *sender* this slab was cut from.
    pub sent_from: Direction,
    /// Slab extents in the sender's subcell resolution, x fastest.
    pub extents: Vec<usize>,
    /// Field data on the slab.
    pub fields: Variables,
    /// True if the slab was cut from committed (post-step) state.
    pub committed: bool,
}

impl GhostData {
    /// Serialize for transport.
    pub fn encode(&self) -> Result<Vec<u8>, SubcellError> {
        Ok(rmp_serde::to_vec(self)?)
    }

    /// Deserialize from transport bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, SubcellError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// Cut the boundary slab of `width` cells adjacent to `direction`'s face
/// out of a subcell-average field set.
///
/// Slab extents equal the grid extents with the normal axis replaced by
/// `width`; axis ordering and orientation are preserved, so for a lower
/// face the slab's last normal index is adjacent to the face and for an
/// upper face its first normal index is.
pub(crate) fn extract_boundary_slab(
    vars: &Variables,
    extents: &[usize],
    direction: Direction,
    width: usize,
) -> (Variables, Vec<usize>) {
    let axis = direction.axis;
    let n = extents[axis];
    assert!(width <= n, "slab width {} exceeds axis extent {}", width, n);

    let offset = match direction.side {
        Side::Lower => 0,
        Side::Upper => n - width,
    };

    let mut slab_extents = extents.to_vec();
    slab_extents[axis] = width;

    let grid_strides = strides(extents);
    let slab_len: usize = slab_extents.iter().product();
    let dim = extents.len();

    let mut slab = Variables::new(vars.num_fields(), slab_len);
    for f in 0..vars.num_fields() {
        let src = vars.field(f);
        let dst = slab.field_mut(f);

        let mut idx = vec![0usize; dim];
        for out in dst.iter_mut() {
            let mut src_flat = 0;
            for a in 0..dim {
                let i = if a == axis { idx[a] + offset } else { idx[a] };
                src_flat += i * grid_strides[a];
            }
            *out = src[src_flat];

            for a in 0..dim {
                idx[a] += 1;
                if idx[a] < slab_extents[a] {
                    break;
                }
                idx[a] = 0;
            }
        }
    }

    (slab, slab_extents)
}

/// Pairwise-average a slab along one axis (restriction by a factor 2).
fn restrict_axis(vars: &Variables, extents: &[usize], axis: usize) -> (Variables, Vec<usize>) {
    let n = extents[axis];
    assert!(n % 2 == 0, "restriction needs an even extent, got {}", n);

    let mut out_extents = extents.to_vec();
    out_extents[axis] = n / 2;
    resample(vars, extents, &out_extents, |a, i| {
        if a == axis {
            ResampleRule::Average(2 * i, 2 * i + 1)
        } else {
            ResampleRule::Copy(i)
        }
    })
}

/// Duplicate each cell of a slab along one axis (piecewise-constant
/// prolongation by a factor 2).
fn refine_axis(vars: &Variables, extents: &[usize], axis: usize) -> (Variables, Vec<usize>) {
    let mut out_extents = extents.to_vec();
    out_extents[axis] = extents[axis] * 2;
    resample(vars, extents, &out_extents, |a, i| {
        if a == axis {
            ResampleRule::Copy(i / 2)
        } else {
            ResampleRule::Copy(i)
        }
    })
}

/// Nearest-index resample of a slab along one axis to a target extent.
fn resample_axis(
    vars: &Variables,
    extents: &[usize],
    axis: usize,
    target: usize,
) -> (Variables, Vec<usize>) {
    let n = extents[axis];
    let mut out_extents = extents.to_vec();
    out_extents[axis] = target;
    resample(vars, extents, &out_extents, |a, i| {
        if a == axis {
            ResampleRule::Copy(i * n / target)
        } else {
            ResampleRule::Copy(i)
        }
    })
}

/// Keep `width` cells along an axis, nearest the given end.
fn trim_axis(
    vars: &Variables,
    extents: &[usize],
    axis: usize,
    width: usize,
    keep_end: Side,
) -> (Variables, Vec<usize>) {
    let n = extents[axis];
    assert!(width <= n);
    let offset = match keep_end {
        Side::Lower => 0,
        Side::Upper => n - width,
    };
    let mut out_extents = extents.to_vec();
    out_extents[axis] = width;
    resample(vars, extents, &out_extents, |a, i| {
        if a == axis {
            ResampleRule::Copy(i + offset)
        } else {
            ResampleRule::Copy(i)
        }
    })
}

enum ResampleRule {
    Copy(usize),
    Average(usize, usize),
}

fn resample(
    vars: &Variables,
    in_extents: &[usize],
    out_extents: &[usize],
    rule: impl Fn(usize, usize) -> ResampleRule,
) -> (Variables, Vec<usize>) {
    let in_strides = strides(in_extents);
    let out_len: usize = out_extents.iter().product();
    let dim = in_extents.len();

    let mut out = Variables::new(vars.num_fields(), out_len);
    for f in 0..vars.num_fields() {
        let src = vars.field(f);
        let dst = out.field_mut(f);

        let mut idx = vec![0usize; dim];
        for value in dst.iter_mut() {
            let mut base = 0;
            let mut avg_axis = None;
            for a in 0..dim {
                match rule(a, idx[a]) {
                    ResampleRule::Copy(i) => base += i * in_strides[a],
                    ResampleRule::Average(i0, i1) => avg_axis = Some((a, i0, i1)),
                }
            }
            *value = match avg_axis {
                None => src[base],
                Some((a, i0, i1)) => {
                    0.5 * (src[base + i0 * in_strides[a]] + src[base + i1 * in_strides[a]])
                }
            };

            for a in 0..dim {
                idx[a] += 1;
                if idx[a] < out_extents[a] {
                    break;
                }
                idx[a] = 0;
            }
        }
    }

    (out, out_extents.to_vec())
}

/// Halo width the sender must cut for a receiver at `receiver_level`.
///
/// A coarser receiver restricts 2:1 along the normal axis, so it needs
/// twice the cells; a finer receiver prolongs 1:2, so half (rounded up)
/// suffice.
pub(crate) fn width_to_send(
    ghost_width: usize,
    sender_level: RefinementLevel,
    receiver_level: RefinementLevel,
) -> usize {
    if receiver_level < sender_level {
        2 * ghost_width
    } else if receiver_level > sender_level {
        ghost_width.div_ceil(2)
    } else {
        ghost_width
    }
}

/// Validate an incoming halo against the receiver's topology and convert
/// it to the receiver's resolution.
///
/// Any inconsistency between the buffer's metadata and the receiver's
/// understanding of the interface is a fatal configuration error.
pub(crate) fn validate_and_convert(
    ghost: GhostData,
    direction: Direction,
    expected: &NeighborInfo,
    receiver_level: RefinementLevel,
    receiver_subcell_extents: &[usize],
    ghost_width: usize,
) -> Result<GhostData, SubcellError> {
    let mismatch = |reason: String| SubcellError::NeighborMismatch { direction, reason };

    if ghost.sender != expected.id {
        return Err(mismatch(format!(
            "ghost data from {} but topology expects {}",
            ghost.sender, expected.id
        )));
    }
    if ghost.sender_level != expected.level {
        return Err(mismatch(format!(
            "sender claims level {} but topology records {}",
            ghost.sender_level, expected.level
        )));
    }
    if ghost.sent_from != direction.opposite() {
        return Err(mismatch(format!(
            "slab cut from sender face {} but this is the {} interface",
            ghost.sent_from, direction
        )));
    }
    if ghost.extents.len() != receiver_subcell_extents.len() {
        return Err(mismatch(format!(
            "slab dimension {} does not match receiver dimension {}",
            ghost.extents.len(),
            receiver_subcell_extents.len()
        )));
    }

    let axis = direction.axis;
    let sender_finer = ghost.sender_level > receiver_level;
    let sender_coarser = ghost.sender_level < receiver_level;
    if ghost.sender_level.get().abs_diff(receiver_level.get()) > 1 {
        return Err(mismatch(format!(
            "refinement levels {} and {} differ by more than one",
            ghost.sender_level, receiver_level
        )));
    }

    let mut fields = ghost.fields.clone();
    let mut extents = ghost.extents.clone();

    if sender_finer {
        // Restrict the normal halo 2:1.
        if extents[axis] % 2 != 0 {
            return Err(mismatch(format!(
                "cannot restrict odd normal extent {}",
                extents[axis]
            )));
        }
        let (f, e) = restrict_axis(&fields, &extents, axis);
        fields = f;
        extents = e;
    } else if sender_coarser {
        // Prolong, then keep the layer nearest the face.
        let (f, e) = refine_axis(&fields, &extents, axis);
        let (f, e) = trim_axis(&f, &e, axis, ghost_width.min(e[axis]), direction.side.opposite());
        fields = f;
        extents = e;
    }

    // Tangential axes snap to the receiver's resolution.
    for a in 0..extents.len() {
        if a != axis && extents[a] != receiver_subcell_extents[a] {
            let (f, e) = resample_axis(&fields, &extents, a, receiver_subcell_extents[a]);
            fields = f;
            extents = e;
        }
    }

    // A small sender mesh may yield a narrower halo than requested; face
    // reconstruction degrades to a zero exterior slope on a 1-cell halo,
    // so anything in 1..=ghost_width is usable.
    if extents[axis] == 0 || extents[axis] > ghost_width {
        return Err(mismatch(format!(
            "halo has {} cells along the normal after conversion, want 1..={}",
            extents[axis], ghost_width
        )));
    }

    Ok(GhostData {
        extents,
        fields,
        ..ghost
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars_1d(values: &[f64]) -> Variables {
        Variables::from_fields(&[values])
    }

    #[test]
    fn test_extract_slab_1d() {
        let vars = vars_1d(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let (slab, ext) = extract_boundary_slab(&vars, &[5], Direction::lower(0), 2);
        assert_eq!(ext, vec![2]);
        assert_eq!(slab.field(0), &[0.0, 1.0]);

        let (slab, ext) = extract_boundary_slab(&vars, &[5], Direction::upper(0), 2);
        assert_eq!(ext, vec![2]);
        assert_eq!(slab.field(0), &[3.0, 4.0]);
    }

    #[test]
    fn test_extract_slab_2d() {
        // 3x3 grid, values = x + 10*y.
        let grid: Vec<f64> = (0..3)
            .flat_map(|y| (0..3).map(move |x| (x + 10 * y) as f64))
            .collect();
        let vars = vars_1d(&grid);
        let (slab, ext) = extract_boundary_slab(&vars, &[3, 3], Direction::upper(1), 1);
        assert_eq!(ext, vec![3, 1]);
        assert_eq!(slab.field(0), &[20.0, 21.0, 22.0]);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let ghost = GhostData {
            sender: ElementId::new(9),
            sender_level: RefinementLevel::new(1),
            sender_grid: ActiveGrid::Subcell,
            sent_from: Direction::upper(0),
            extents: vec![2],
            fields: vars_1d(&[1.5, 2.5]),
            committed: true,
        };
        let bytes = ghost.encode().unwrap();
        let decoded = GhostData::decode(&bytes).unwrap();
        assert_eq!(decoded, ghost);
    }

    fn make_ghost(sender_level: u32, sent_from: Direction, values: &[f64]) -> GhostData {
        GhostData {
            sender: ElementId::new(1),
            sender_level: RefinementLevel::new(sender_level),
            sender_grid: ActiveGrid::Subcell,
            sent_from,
            extents: vec![values.len()],
            fields: vars_1d(values),
            committed: true,
        }
    }

    fn expected(level: u32) -> NeighborInfo {
        NeighborInfo {
            id: ElementId::new(1),
            level: RefinementLevel::new(level),
        }
    }

    #[test]
    fn test_same_level_passthrough() {
        let ghost = make_ghost(0, Direction::upper(0), &[1.0, 2.0]);
        let out = validate_and_convert(
            ghost,
            Direction::lower(0),
            &expected(0),
            RefinementLevel::new(0),
            &[9],
            2,
        )
        .unwrap();
        assert_eq!(out.fields.field(0), &[1.0, 2.0]);
    }

    #[test]
    fn test_finer_sender_is_restricted_to_half() {
        // Finer neighbor sends 4 cells; coarse receiver keeps 2.
        let ghost = make_ghost(1, Direction::upper(0), &[1.0, 3.0, 5.0, 7.0]);
        let out = validate_and_convert(
            ghost,
            Direction::lower(0),
            &expected(1),
            RefinementLevel::new(0),
            &[9],
            2,
        )
        .unwrap();
        assert_eq!(out.extents, vec![2]);
        assert_eq!(out.fields.field(0), &[2.0, 6.0]);
    }

    #[test]
    fn test_short_even_halo_from_finer_sender_accepted() {
        // A finer sender with a tiny mesh can only supply 2 cells; the
        // restricted 1-cell halo is narrower than requested but usable.
        let ghost = make_ghost(1, Direction::upper(0), &[1.0, 3.0]);
        let out = validate_and_convert(
            ghost,
            Direction::lower(0),
            &expected(1),
            RefinementLevel::new(0),
            &[9],
            2,
        )
        .unwrap();
        assert_eq!(out.extents, vec![1]);
        assert_eq!(out.fields.field(0), &[2.0]);
    }

    #[test]
    fn test_coarser_sender_is_prolonged() {
        // Coarse neighbor sends 1 cell to a fine receiver needing 2.
        let ghost = make_ghost(0, Direction::upper(0), &[4.0]);
        let out = validate_and_convert(
            ghost,
            Direction::lower(0),
            &expected(0),
            RefinementLevel::new(1),
            &[9],
            2,
        )
        .unwrap();
        assert_eq!(out.extents, vec![2]);
        assert_eq!(out.fields.field(0), &[4.0, 4.0]);
    }

    #[test]
    fn test_wrong_sender_rejected() {
        let ghost = make_ghost(0, Direction::upper(0), &[1.0, 2.0]);
        let wrong = NeighborInfo {
            id: ElementId::new(2),
            level: RefinementLevel::new(0),
        };
        let err = validate_and_convert(
            ghost,
            Direction::lower(0),
            &wrong,
            RefinementLevel::new(0),
            &[9],
            2,
        );
        assert!(matches!(err, Err(SubcellError::NeighborMismatch { .. })));
    }

    #[test]
    fn test_wrong_orientation_rejected() {
        // Slab cut from the sender's lower face cannot serve the
        // receiver's lower face.
        let ghost = make_ghost(0, Direction::lower(0), &[1.0, 2.0]);
        let err = validate_and_convert(
            ghost,
            Direction::lower(0),
            &expected(0),
            RefinementLevel::new(0),
            &[9],
            2,
        );
        assert!(matches!(err, Err(SubcellError::NeighborMismatch { .. })));
    }

    #[test]
    fn test_level_mismatch_rejected() {
        let ghost = make_ghost(1, Direction::upper(0), &[1.0, 2.0]);
        let err = validate_and_convert(
            ghost,
            Direction::lower(0),
            &expected(0),
            RefinementLevel::new(0),
            &[9],
            2,
        );
        assert!(matches!(err, Err(SubcellError::NeighborMismatch { .. })));
    }

    #[test]
    fn test_width_to_send() {
        let l0 = RefinementLevel::new(0);
        let l1 = RefinementLevel::new(1);
        assert_eq!(width_to_send(2, l0, l0), 2);
        assert_eq!(width_to_send(2, l1, l0), 4); // fine → coarse
        assert_eq!(width_to_send(2, l0, l1), 1); // coarse → fine
    }
}
