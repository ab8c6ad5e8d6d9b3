//! Evaluation order for nodes.
use crate::internal::*;
use bit_set::BitSet;

/// Find an evaluation order for a model, using its default inputs and outputs
/// as boundaries.
pub fn eval_order(model: &Model) -> ChanlastResult<Vec<usize>> {
    let inputs = model.input_outlets()?.iter().map(|n| n.node).collect::<Vec<usize>>();
    let targets = model.output_outlets()?.iter().map(|n| n.node).collect::<Vec<usize>>();
    eval_order_for_nodes(model.nodes(), &inputs, &targets)
}

/// Find a working evaluation order for a list of nodes.
///
/// Inputs come before their consumers, and among the inputs of a node, the
/// first slot is scheduled first. Fails on cycles.
pub fn eval_order_for_nodes(
    nodes: &[Node],
    model_inputs: &[usize],
    model_outputs: &[usize],
) -> ChanlastResult<Vec<usize>> {
    let mut done = BitSet::with_capacity(nodes.len());
    let mut pending = BitSet::with_capacity(nodes.len());
    let mut order: Vec<usize> = vec![];
    let mut needed: Vec<(usize, bool)> = model_outputs.iter().rev().map(|&n| (n, false)).collect();
    while let Some((node, expanded)) = needed.pop() {
        ensure!(node < nodes.len(), "Invalid node id {node}");
        if done.contains(node) {
            continue;
        }
        if expanded {
            pending.remove(node);
            done.insert(node);
            order.push(node);
            continue;
        }
        if pending.contains(node) {
            bail!("Found a cycle involving node {}", nodes[node]);
        }
        pending.insert(node);
        needed.push((node, true));
        if model_inputs.contains(&node) {
            continue;
        }
        for input in nodes[node].inputs.iter().rev() {
            if !done.contains(input.node) {
                needed.push((input.node, false));
            }
        }
    }
    Ok(order)
}
