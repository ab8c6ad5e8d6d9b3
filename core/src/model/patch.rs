use std::ops::{Deref, DerefMut};

use crate::internal::*;

/// A change to apply to a model.
///
/// Actually structured around a model that represent the new nodes to be
/// inserted, plus information about how to connect these new nodes to the
/// pre-existing graph.
#[derive(Clone, Debug, Default)]
pub struct ModelPatch {
    /// patch label for auditing and debugging
    pub context: Vec<String>,
    /// the model-like 'patch' of nodes to add to the model
    pub model: Model,
    /// map of patch inputs to model wires
    pub incoming: HashMap<OutletId, OutletId>,
    /// map of old wires to be replaced by new wires
    pub shunt_outlet_by: HashMap<OutletId, OutletId>,
}

impl Deref for ModelPatch {
    type Target = Model;
    fn deref(&self) -> &Model {
        &self.model
    }
}

impl DerefMut for ModelPatch {
    fn deref_mut(&mut self) -> &mut Model {
        &mut self.model
    }
}

impl ModelPatch {
    pub fn new(s: impl Into<String>) -> Self {
        Self::default().with_context(s)
    }

    pub fn push_context(&mut self, s: impl Into<String>) {
        self.context.push(s.into());
    }

    pub fn with_context(mut self, s: impl Into<String>) -> Self {
        self.context.push(s.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.model.nodes.is_empty() && self.shunt_outlet_by.is_empty()
    }

    /// Draw a tap from a preexisting node.
    ///
    /// returns an OutletId usable in the little "patch" model
    pub fn tap_model(&mut self, model: &Model, outlet: OutletId) -> ChanlastResult<OutletId> {
        if let Some((tap, _)) = self.incoming.iter().find(|(_, o)| **o == outlet) {
            return Ok(*tap);
        }
        let fact = model.outlet_fact(outlet)?.clone();
        let id = self.add_source(format!("incoming-{}/{}", outlet.node, outlet.slot), fact)?;
        self.incoming.insert(id, outlet);
        Ok(id)
    }

    /// Draw taps from a preexisting nodes.
    ///
    /// returns an OutletId usable in the little "patch" model
    pub fn taps<'a>(
        &mut self,
        model: &Model,
        outlets: impl IntoIterator<Item = &'a OutletId>,
    ) -> ChanlastResult<TVec<OutletId>> {
        outlets.into_iter().map(|o| self.tap_model(model, *o)).collect()
    }

    /// Replace an Outlet in the target model by one from the patch.
    pub fn shunt_outside(&mut self, model: &Model, outlet: OutletId, by: OutletId) -> ChanlastResult<()> {
        let original_fact = model.outlet_fact(outlet)?;
        let new_fact = self.model.outlet_fact(by)?;
        if !original_fact.compatible_with(new_fact) {
            bail!("Trying to substitute a {:?} by {:?}.\n{:?}", original_fact, new_fact, self);
        }
        self.shunt_outlet_by.insert(outlet, by);
        Ok(())
    }

    /// Ids of the patch nodes that will be inserted in the target model
    /// (taps excluded).
    pub fn new_node_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.model
            .nodes
            .iter()
            .filter(|n| !self.incoming.contains_key(&OutletId::new(n.id, 0)))
            .map(|n| n.id)
    }

    /// Apply all changes in the patch to the target model.
    pub fn apply(self, target: &mut Model) -> ChanlastResult<()> {
        let prior_target_inputs = target.input_outlets()?.len();
        let prior_target_outputs = target.output_outlets()?.len();
        let ModelPatch { model: patch, incoming: mut mapping, shunt_outlet_by, .. } = self;
        let mut all_inputs = HashMap::new(); // new_node_id_in_model -> [ patch_outlet_id ]
        for node in patch.nodes {
            if matches!(node.op, Op::Source(_))
                && mapping.contains_key(&OutletId::new(node.id, 0))
            {
                // this is a tap
                continue;
            }
            let Node { id, name, inputs, op, outputs, rt_info } = node;
            let n_outputs = outputs.len();
            let facts = outputs.into_iter().map(|of| of.fact).collect();
            let added_node_id = target.add_node(name, op, facts)?;
            target.node_mut(added_node_id).rt_info = rt_info;
            for ix in 0..n_outputs {
                mapping.insert(OutletId::new(id, ix), OutletId::new(added_node_id, ix));
            }
            all_inputs.insert(added_node_id, inputs);
        }
        for (outlet, by) in shunt_outlet_by {
            let fixed_by = *mapping.get(&by).with_context(|| format!("Unmapped patch outlet {by:?}"))?;
            let succs = target.nodes()[outlet.node].outputs[outlet.slot].successors.clone();
            for succ in succs {
                target.add_edge(fixed_by, succ)?;
            }
            for o in target.outputs.iter_mut() {
                if *o == outlet {
                    *o = fixed_by;
                }
            }
            if let Some(label) = target.outlet_label(outlet).map(|s| s.to_string()) {
                target.set_outlet_label(fixed_by, label)?;
            }
        }
        for (node, inputs) in all_inputs {
            for (ix, input) in inputs.into_iter().enumerate() {
                let input =
                    *mapping.get(&input).with_context(|| format!("Unmapped patch outlet {input:?}"))?;
                target.add_edge(input, InletId::new(node, ix))?;
            }
        }
        ensure!(target.input_outlets()?.len() == prior_target_inputs);
        ensure!(target.output_outlets()?.len() == prior_target_outputs);
        Ok(())
    }
}
