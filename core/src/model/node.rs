use super::*;
use crate::ops::{Op, OpKind};
use itertools::Itertools;
use std::fmt;

/// A Node in a Model.
///
/// Parameterized by an InferenceFact on its outlets.
#[derive(Debug, Clone)]
pub struct Node {
    /// node id in the model
    ///
    /// Caution: this id will not be persistent during networks transformation
    pub id: usize,
    /// name of the node
    ///
    /// This will usually come from the importing framework. `chanlast`
    /// transformation keep the names of the nodes whose output they restore.
    pub name: String,
    /// A list of incoming tensors, identified by the node outlet that creates
    /// them.
    pub inputs: Vec<OutletId>,
    /// The actual operation the node performs.
    pub op: Op,
    /// List of ouputs, with their descendant and tensor type information.
    pub outputs: TVec<Outlet>,
    /// Provenance attributes, propagated to the nodes that replace this one.
    pub rt_info: RuntimeInfo,
}

impl fmt::Display for Node {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "#{} \"{}\" {}", self.id, self.name, self.op)
    }
}

impl Node {
    /// Access the op of the node
    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn kind(&self) -> OpKind {
        self.op.kind()
    }

    /// Output facts, in slot order.
    pub fn output_facts(&self) -> impl Iterator<Item = &InferenceFact> {
        self.outputs.iter().map(|o| &o.fact)
    }
}

/// Information for each outlet of a node
#[derive(Clone, Default)]
pub struct Outlet {
    /// the tensor type information
    pub fact: InferenceFact,
    /// where this outlet is used.
    pub successors: TVec<InletId>,
}

impl fmt::Debug for Outlet {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "{:?} {}",
            self.fact,
            self.successors.iter().map(|o| format!("{o:?}")).join(" ")
        )
    }
}

/// Identifier for a node output in the graph.
///
/// This happens to be a unique identifier of any variable tensor in the graph
/// (as the graph typically connect one single node output to one or several
/// inputs slots)
#[derive(Clone, Copy, PartialEq, Eq, Hash, new, Default, PartialOrd, Ord)]
pub struct OutletId {
    /// node identifier in the graph
    pub node: usize,
    /// rank of the input in the node
    pub slot: usize,
}

impl fmt::Debug for OutletId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}/{}>", self.node, self.slot)
    }
}

impl From<usize> for OutletId {
    fn from(node: usize) -> OutletId {
        OutletId::new(node, 0)
    }
}

impl From<(usize, usize)> for OutletId {
    fn from(pair: (usize, usize)) -> OutletId {
        OutletId::new(pair.0, pair.1)
    }
}

/// Identifier for a node input in the graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, new, Ord, PartialOrd)]
pub struct InletId {
    /// node identifier in the graph
    pub node: usize,
    /// rank of the input in the node
    pub slot: usize,
}

impl fmt::Debug for InletId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, ">{}/{}", self.node, self.slot)
    }
}
