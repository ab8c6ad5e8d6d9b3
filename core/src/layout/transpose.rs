use crate::internal::*;
use crate::layout::permutations::{permutation, Direction};
use crate::ops::Transpose;

/// Wires a transpose of `outlet` in `direction`. Only adds a node to the
/// patch.
pub fn wire_layout_transpose(
    patch: &mut ModelPatch,
    name: impl Into<String>,
    outlet: OutletId,
    rank: usize,
    direction: Direction,
) -> ChanlastResult<OutletId> {
    let perm = permutation(rank, direction)?;
    let wire = patch.wire_node(name, Transpose::new(perm.into()), &[outlet])?;
    Ok(wire[0])
}

/// Moves a channel-first value to channel-last layout.
pub fn transpose_on_input(
    patch: &mut ModelPatch,
    name: impl Into<String>,
    outlet: OutletId,
    rank: usize,
) -> ChanlastResult<OutletId> {
    wire_layout_transpose(patch, name, outlet, rank, Direction::ToChannelLast)
}

/// Brings a channel-last value back to channel-first layout.
pub fn transpose_on_output(
    patch: &mut ModelPatch,
    name: impl Into<String>,
    outlet: OutletId,
    rank: usize,
) -> ChanlastResult<OutletId> {
    wire_layout_transpose(patch, name, outlet, rank, Direction::ToChannelFirst)
}
