//! Rewriting rules moving convolutions and pools to channel-last layout.
//!
//! Every rule follows the same protocol. It declines vetoed nodes, nodes of
//! unknown or unsupported rank, and nodes already working in channel-last
//! layout. Otherwise it builds a patch that transposes the spatial inputs to
//! channel-last, wires a channel-last copy of the op, and transposes each of
//! its outputs back to channel-first before reconnecting the original
//! successors.
use crate::internal::*;
use crate::layout::permutations::permuted_output_shape;
use crate::layout::transpose::{transpose_on_input, transpose_on_output};
use crate::layout::ConvertLayout;
use crate::ops::cnn::{AvgPool, Conv, KernelFormat, MaxPool, MaxPoolV8, PoolSpec};
use crate::ops::nn::DataFormat;

/// Rank of a node eligible for rewriting, or None if it must be left alone.
fn eligible_rank(ctx: &ConvertLayout, node: &Node, pool_spec: &PoolSpec) -> Option<usize> {
    if ctx.is_vetoed(node) {
        debug!("{node} vetoed");
        return None;
    }
    let GenericFactoid::Only(rank) = node.outputs.first()?.fact.rank() else {
        debug!("{node} has an output of unknown rank");
        return None;
    };
    if !(4..=5).contains(&rank) {
        debug!("{node} has a rank {rank} output");
        return None;
    }
    if pool_spec.data_format.is_channel_last() {
        return None;
    }
    Some(rank)
}

fn channel_last(pool_spec: &PoolSpec) -> PoolSpec {
    PoolSpec { data_format: DataFormat::NHWC, ..pool_spec.clone() }
}

/// Adds `op` to the patch, declaring `shape` for each of its outputs after
/// checking it against what the op infers.
fn wire_with_declared_shape(
    patch: &mut ModelPatch,
    name: impl Into<String>,
    op: impl Into<Op>,
    inputs: &[OutletId],
    shape: &ShapeFactoid,
) -> ChanlastResult<TVec<OutletId>> {
    let op = op.into();
    let name = name.into();
    let mut facts = {
        let input_facts =
            inputs.iter().map(|o| patch.outlet_fact(*o)).collect::<ChanlastResult<TVec<_>>>()?;
        op.output_facts(&input_facts).with_context(|| format!("wiring {name} ({op})"))?
    };
    for fact in &mut facts {
        fact.shape = fact
            .shape
            .unify(shape)
            .with_context(|| format!("Declaring {shape:?} as output shape of {name} ({op})"))?;
    }
    let id = patch.add_node(name, op, facts)?;
    for (ix, input) in inputs.iter().enumerate() {
        patch.add_edge(*input, InletId::new(id, ix))?;
    }
    Ok((0..patch.node(id).outputs.len()).map(|slot| OutletId::new(id, slot)).collect())
}

/// Builds the patch replacing `node` by `op` working in channel-last
/// layout. `spatial_inputs` lists the inputs to transpose, with the suffix
/// naming their transpose. The other inputs are passed through.
fn channel_last_patch(
    model: &Model,
    node: &Node,
    name: &str,
    rank: usize,
    op: impl Into<Op>,
    spatial_inputs: &[(usize, &str)],
) -> ChanlastResult<ModelPatch> {
    let mut patch = ModelPatch::default();
    let mut wire = patch.taps(model, &node.inputs)?;
    for &(ix, suffix) in spatial_inputs {
        let input = *wire.get(ix).with_context(|| format!("{node} has no input #{ix}"))?;
        wire[ix] = transpose_on_input(&mut patch, model.unique_name(format!("{name}.{suffix}")), input, rank)?;
    }
    let shape = permuted_output_shape(node, rank)?;
    let wire = wire_with_declared_shape(
        &mut patch,
        model.unique_name(format!("{name}.channel_last")),
        op,
        &wire,
        &shape,
    )?;
    let mut restored = tvec!();
    for (slot, outlet) in wire.iter().enumerate() {
        let output_name = if wire.len() == 1 {
            name.to_string()
        } else {
            model.unique_name(format!("{name}.{slot}")).into_owned()
        };
        restored.push(transpose_on_output(&mut patch, output_name, *outlet, rank)?);
    }
    let new_nodes: Vec<usize> = patch.new_node_ids().collect();
    copy_runtime_info(&node.rt_info, &mut patch.model, &new_nodes)?;
    for (slot, outlet) in restored.into_iter().enumerate() {
        patch.shunt_outside(model, OutletId::new(node.id, slot), outlet)?;
    }
    Ok(patch)
}

pub fn convolution(
    ctx: &ConvertLayout,
    model: &Model,
    node: &Node,
    name: &str,
) -> ChanlastResult<Option<ModelPatch>> {
    let Op::Conv(conv) = &node.op else { return Ok(None) };
    let Some(rank) = eligible_rank(ctx, node, &conv.pool_spec) else { return Ok(None) };
    if conv.kernel_fmt != KernelFormat::OIHW {
        debug!("{node} has {:?} weights", conv.kernel_fmt);
        return Ok(None);
    }
    let op = Conv::new(channel_last(&conv.pool_spec), KernelFormat::OHWI);
    let spatial = [(0, "to_channel_last"), (1, "weights.to_channel_last")];
    channel_last_patch(model, node, name, rank, op, &spatial).map(Some)
}

pub fn max_pool_v1(
    ctx: &ConvertLayout,
    model: &Model,
    node: &Node,
    name: &str,
) -> ChanlastResult<Option<ModelPatch>> {
    let Op::MaxPool(pool) = &node.op else { return Ok(None) };
    let Some(rank) = eligible_rank(ctx, node, &pool.pool_spec) else { return Ok(None) };
    let op = MaxPool::new(channel_last(&pool.pool_spec));
    channel_last_patch(model, node, name, rank, op, &[(0, "to_channel_last")]).map(Some)
}

/// Whether the index axis of a MaxPoolV8 allows the rewrite. The axis is
/// kept as is on the channel-last op.
fn index_axis_allows_rewrite(axis: i64, rank: usize) -> bool {
    axis == 0 || axis == 1 || (axis < 0 && axis > -(rank as i64 + 1))
}

pub fn max_pool_v8(
    ctx: &ConvertLayout,
    model: &Model,
    node: &Node,
    name: &str,
) -> ChanlastResult<Option<ModelPatch>> {
    let Op::MaxPoolV8(pool) = &node.op else { return Ok(None) };
    let Some(rank) = eligible_rank(ctx, node, &pool.pool_spec) else { return Ok(None) };
    if !index_axis_allows_rewrite(pool.axis, rank) {
        debug!("{node} has index axis {}", pool.axis);
        return Ok(None);
    }
    let op = MaxPoolV8::new(channel_last(&pool.pool_spec), pool.index_element_type, pool.axis);
    channel_last_patch(model, node, name, rank, op, &[(0, "to_channel_last")]).map(Some)
}

pub fn avg_pool(
    ctx: &ConvertLayout,
    model: &Model,
    node: &Node,
    name: &str,
) -> ChanlastResult<Option<ModelPatch>> {
    let Op::AvgPool(pool) = &node.op else { return Ok(None) };
    let Some(rank) = eligible_rank(ctx, node, &pool.pool_spec) else { return Ok(None) };
    let op = AvgPool::new(channel_last(&pool.pool_spec), pool.exclude_pad);
    channel_last_patch(model, node, name, rank, op, &[(0, "to_channel_last")]).map(Some)
}
