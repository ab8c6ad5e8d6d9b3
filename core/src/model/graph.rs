use super::*;
use crate::internal::*;
use crate::ops::{Const, TypedSource};
use itertools::Itertools;

/// Main model class.
///
/// A directed acyclic graph of operators, each outlet tagged with an
/// InferenceFact.
#[derive(Clone, Debug, Default)]
pub struct Model {
    /// all nodes in the model
    pub nodes: Vec<Node>,
    /// model inputs
    pub inputs: Vec<OutletId>,
    /// model outputs
    pub outputs: Vec<OutletId>,
    /// outlet labels
    pub outlet_labels: HashMap<OutletId, String>,
}

impl Model {
    /// Adds a source op to the network and registers it as a model input.
    pub fn add_source(&mut self, name: impl Into<String>, fact: InferenceFact) -> ChanlastResult<OutletId> {
        let source = TypedSource::new(fact.clone());
        let id = self.add_node(name, source, tvec!(fact))?;
        let id = OutletId::new(id, 0);
        self.inputs.push(id);
        Ok(id)
    }

    /// Adds a constant to the network.
    pub fn add_const(&mut self, name: impl Into<String>, v: impl IntoArcTensor) -> ChanlastResult<OutletId> {
        let v = v.into_arc_tensor();
        let fact = InferenceFact::from(&*v);
        let id = self.add_node(name, Const::new(v), tvec!(fact))?;
        Ok(OutletId::new(id, 0))
    }

    /// Adds a node, with explicit output facts. The node is not connected.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        op: impl Into<Op>,
        output_facts: TVec<InferenceFact>,
    ) -> ChanlastResult<usize> {
        let op = op.into();
        let name = name.into();
        ensure!(
            output_facts.len() == op.nboutputs(),
            "Node {name} ({op}) has {} outputs, got {} facts",
            op.nboutputs(),
            output_facts.len()
        );
        let id = self.nodes.len();
        let outputs =
            output_facts.into_iter().map(|fact| Outlet { fact, successors: tvec!() }).collect();
        let node = Node { id, name, op, inputs: vec![], outputs, rt_info: RuntimeInfo::default() };
        self.nodes.push(node);
        Ok(id)
    }

    /// Adds a node and connects its inputs, inferring its output facts from
    /// the input facts.
    pub fn wire_node(
        &mut self,
        name: impl Into<String>,
        op: impl Into<Op>,
        inputs: &[OutletId],
    ) -> ChanlastResult<TVec<OutletId>> {
        let op = op.into();
        let name = name.into();
        if self.nodes.iter().any(|n| n.name == name) {
            bail!("Duplicate node name: {name}");
        }
        let output_facts = {
            let input_facts =
                inputs.iter().map(|o| self.outlet_fact(*o)).collect::<ChanlastResult<TVec<_>>>()?;
            op.output_facts(&input_facts).with_context(|| format!("wiring {name} ({op})"))?
        };
        let id = self.add_node(name, op, output_facts)?;
        for (ix, i) in inputs.iter().enumerate() {
            self.add_edge(*i, InletId::new(id, ix))?;
        }
        Ok((0..self.nodes[id].outputs.len()).map(|ix| OutletId::new(id, ix)).collect())
    }

    /// Connect a node outlet to a node inlet.
    pub fn add_edge(&mut self, outlet: OutletId, inlet: InletId) -> ChanlastResult<()> {
        ensure!(
            outlet.node < self.nodes.len() && outlet.slot < self.nodes[outlet.node].outputs.len(),
            "Invalid outlet for edge: {outlet:?}"
        );
        ensure!(inlet.node < self.nodes.len(), "Invalid inlet for edge: {inlet:?}");
        if let Some(previous) = self.nodes[inlet.node].inputs.get(inlet.slot).cloned() {
            self.nodes[previous.node].outputs[previous.slot]
                .successors
                .retain(|&mut succ| succ != inlet);
        }
        {
            let prec = &mut self.nodes[outlet.node];
            prec.outputs[outlet.slot].successors.push(inlet);
        }
        let succ = &mut self.nodes[inlet.node];
        #[allow(clippy::comparison_chain)]
        if inlet.slot == succ.inputs.len() {
            succ.inputs.push(outlet);
        } else if inlet.slot < succ.inputs.len() {
            succ.inputs[inlet.slot] = outlet;
        } else {
            bail!("Edges must be added in order and consecutive. Trying to connect input {:?} of node {:?} ", inlet.slot, succ)
        }
        Ok(())
    }

    // Inputs

    /// Get model inputs.
    pub fn input_outlets(&self) -> ChanlastResult<&[OutletId]> {
        Ok(&self.inputs)
    }

    // Outputs

    /// Get model outputs.
    pub fn output_outlets(&self) -> ChanlastResult<&[OutletId]> {
        Ok(&self.outputs)
    }

    /// Uses every outlet nothing consumes as a model output.
    pub fn auto_outputs(&mut self) -> ChanlastResult<()> {
        self.outputs = self
            .nodes
            .iter()
            .flat_map(|n| {
                n.outputs
                    .iter()
                    .enumerate()
                    .filter(|(_, o)| o.successors.is_empty())
                    .map(move |(slot, _)| OutletId::new(n.id, slot))
            })
            .collect();
        Ok(())
    }

    /// Change model outputs.
    pub fn set_output_outlets(&mut self, outputs: &[OutletId]) -> ChanlastResult<()> {
        self.outputs = outputs.to_vec();
        Ok(())
    }

    /// Get the `ix`-th output tensor type information.
    pub fn output_fact(&self, ix: usize) -> ChanlastResult<&InferenceFact> {
        let output = self.output_outlets()?.get(ix).with_context(|| format!("No output #{ix}"))?;
        self.outlet_fact(*output)
    }

    // nodes and their facts

    pub fn node_id_by_name(&self, name: &str) -> ChanlastResult<usize> {
        self.nodes
            .iter()
            .find(|n| n.name == name)
            .map(|n| n.id)
            .with_context(|| format!("No node found for name: \"{name}\""))
    }

    /// Find a node by its name.
    pub fn node_by_name(&self, name: impl AsRef<str>) -> ChanlastResult<&Node> {
        let id: usize = self.node_id_by_name(name.as_ref())?;
        Ok(&self.nodes[id])
    }

    /// Borrow mutable reference to a node by its name.
    pub fn node_by_name_mut(&mut self, name: impl AsRef<str>) -> ChanlastResult<&mut Node> {
        let id: usize = self.node_id_by_name(name.as_ref())?;
        Ok(&mut self.nodes[id])
    }

    /// Find a node by its id.
    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    /// Find a node by its id.
    pub fn node_mut(&mut self, id: usize) -> &mut Node {
        &mut self.nodes[id]
    }

    /// Access the nodes table.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    // outlets

    /// Get tensor information for a single outlet.
    pub fn outlet_fact(&self, outlet: OutletId) -> ChanlastResult<&InferenceFact> {
        ensure!(outlet.node < self.nodes.len(), "Invalid outlet for graph");
        let outlets = &self.nodes[outlet.node].outputs;
        outlets
            .get(outlet.slot)
            .map(|o| &o.fact)
            .with_context(|| format!("Invalid outlet reference: {outlet:?}"))
    }

    // outlet labels

    /// Get label for an outlet.
    pub fn outlet_label(&self, outlet: OutletId) -> Option<&str> {
        self.outlet_labels.get(&outlet).map(|s| &**s)
    }

    /// Set label for an outlet.
    pub fn set_outlet_label(&mut self, outlet: OutletId, label: String) -> ChanlastResult<()> {
        self.outlet_labels.insert(outlet, label);
        Ok(())
    }

    /// List consumers of an outlet.
    pub fn outlet_successors(&self, outlet: OutletId) -> &[InletId] {
        &self.nodes[outlet.node].outputs[outlet.slot].successors
    }

    /// Computes an evalutation order for the graph inputs and outputs
    pub fn eval_order(&self) -> ChanlastResult<Vec<usize>> {
        super::order::eval_order(self)
    }

    /// Performs a sanity check on network connections.
    pub fn check_edges(&self) -> ChanlastResult<()> {
        for node_id in self.eval_order()? {
            let node = &self.nodes[node_id];
            for (ix, input) in node.inputs.iter().enumerate() {
                let prec = &self.nodes[input.node];
                if !prec.outputs[input.slot].successors.contains(&InletId::new(node.id, ix)) {
                    bail!(
                        "Mismatched oncoming edge, node:{} input:{} to {:?} not reciprocated",
                        node.id,
                        ix,
                        prec
                    )
                }
            }
            for (ix, output) in node.outputs.iter().enumerate() {
                for succ in &output.successors {
                    if self.nodes[succ.node].inputs[succ.slot] != OutletId::new(node.id, ix) {
                        bail!(
                            "Mismatched outgoing edge, node:{} output:{} to {:?} not reciprocated",
                            node.id,
                            ix,
                            succ
                        )
                    }
                }
            }
        }
        Ok(())
    }

    /// Build a name that is not used by any node yet, starting from `prefix`.
    pub fn unique_name<'n>(&self, prefix: impl Into<Cow<'n, str>>) -> Cow<'n, str> {
        let prefix = prefix.into();
        if self.nodes.iter().all(|n| n.name != *prefix) {
            return prefix;
        }
        for i in 1.. {
            let s = format!("{prefix}.{i}");
            if self.nodes.iter().all(|n| n.name != s) {
                return Cow::Owned(s);
            }
        }
        unreachable!();
    }

    /// Applies a transformation to the model.
    pub fn transform(&mut self, transform: &dyn ModelTransform) -> ChanlastResult<()> {
        transform.transform(self)
    }

    pub fn check_compact(&self) -> ChanlastResult<()> {
        let order = self.eval_order()?;
        let useless_sources = self
            .inputs
            .iter()
            .filter(|io| self.outlet_successors(**io).is_empty() && !self.outputs.contains(io))
            .count();
        if order.len() + useless_sources != self.nodes.len() {
            bail!(
                "Eval order is {} long, nodes are {}, including {} unused sources",
                order.len(),
                self.nodes.len(),
                useless_sources
            );
        }
        if (0..order.len()).any(|ix| order[ix] != ix) {
            bail!("eval order is not trivial");
        }
        let mut seen = std::collections::HashSet::new();
        for (ix, n) in self.nodes.iter().enumerate() {
            if ix != n.id {
                bail!("Invalid node id: position is {}, node is {}", ix, n);
            }
            if seen.contains(&n.name) {
                bail!("duplicate name {}", n.name);
            }
            seen.insert(&n.name);
        }
        Ok(())
    }

    /// Drops the nodes the outputs do not depend on, and renumbers the
    /// remaining ones in evaluation order.
    pub fn compact(&mut self) -> ChanlastResult<()> {
        let mut order = self.eval_order()?;
        if order.len() == self.nodes.len() && order.iter().enumerate().all(|(a, b)| a == *b) {
            return Ok(());
        }
        for i in &self.inputs {
            if !order.contains(&i.node) {
                order.push(i.node);
            }
        }
        let mut old_to_new = vec![usize::MAX; self.nodes.len()];
        for (ix, id) in order.iter().enumerate() {
            old_to_new[*id] = ix;
        }
        let mut old_nodes: Vec<Option<Node>> =
            std::mem::take(&mut self.nodes).into_iter().map(Some).collect();
        let mut new_nodes = Vec::with_capacity(order.len());
        for id in &order {
            let mut node = old_nodes[*id].take().with_context(|| format!("node {id} scheduled twice"))?;
            node.id = old_to_new[node.id];
            for input in &mut node.inputs {
                ensure!(old_to_new[input.node] < order.len(), "Dangling input in {}", node.name);
                input.node = old_to_new[input.node];
            }
            for output in &mut node.outputs {
                output.successors.retain(|s| old_to_new[s.node] < order.len());
                for succ in &mut output.successors {
                    succ.node = old_to_new[succ.node];
                }
                output.successors.sort();
            }
            new_nodes.push(node);
        }
        self.nodes = new_nodes;
        for outlet in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            ensure!(old_to_new[outlet.node] < order.len(), "Dangling model interface {outlet:?}");
            outlet.node = old_to_new[outlet.node];
        }
        self.outlet_labels = std::mem::take(&mut self.outlet_labels)
            .into_iter()
            .filter(|(k, _)| old_to_new[k.node] < order.len())
            .map(|(k, v)| (OutletId::new(old_to_new[k.node], k.slot), v))
            .collect();
        self.check_compact().context("after graph compaction")?;
        Ok(())
    }
}

impl fmt::Display for Model {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        for node in &self.nodes {
            let inputs = node
                .inputs
                .iter()
                .map(|o| match self.outlet_fact(*o) {
                    Ok(fact) => format!("{}/{} {fact:?}", o.node, o.slot),
                    Err(_) => format!("{}/{} ?", o.node, o.slot),
                })
                .join(", ");
            writeln!(fmt, "{:>4} {:<12} {:<32} [{inputs}]", node.id, node.op.name(), node.name)?;
            for (slot, outlet) in node.outputs.iter().enumerate() {
                let label = self.outlet_label(OutletId::new(node.id, slot)).unwrap_or("");
                let successors = outlet.successors.iter().map(|s| format!("{}/{}", s.node, s.slot)).join(", ");
                writeln!(fmt, "     #{slot} {label} {:?} -> [{successors}]", outlet.fact)?;
            }
        }
        writeln!(fmt, "outputs: {}", self.outputs.iter().map(|o| format!("{}/{}", o.node, o.slot)).join(", "))
    }
}
