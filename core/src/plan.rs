use std::borrow::Borrow;

use crate::internal::*;
use crate::model::order::eval_order_for_nodes;
use itertools::Itertools;

/// A straightforward evaluation plan: runs every node needed by the model
/// outputs once, in evaluation order.
#[derive(Debug, Clone)]
pub struct SimplePlan<M: Borrow<Model>> {
    pub model: M,
    pub outputs: Vec<OutletId>,
    pub order: Vec<usize>,
}

impl<M: Borrow<Model>> SimplePlan<M> {
    /// This contructor returns a plan that will compute all the model default outputs in one pass.
    pub fn new(model: M) -> ChanlastResult<SimplePlan<M>> {
        let outputs = model.borrow().output_outlets()?.to_vec();
        Self::new_for_outputs(model, &outputs)
    }

    /// This contructor returns a plan that will compute all specified outputs in one pass.
    pub fn new_for_outputs(model: M, outputs: &[OutletId]) -> ChanlastResult<SimplePlan<M>> {
        let inputs = model.borrow().input_outlets()?.iter().map(|n| n.node).collect::<Vec<usize>>();
        let outputs_nodes = outputs.iter().map(|n| n.node).collect::<Vec<usize>>();
        let order = eval_order_for_nodes(model.borrow().nodes(), &inputs, &outputs_nodes)?;
        Ok(SimplePlan { model, order, outputs: outputs.to_vec() })
    }

    pub fn model(&self) -> &Model {
        self.model.borrow()
    }

    /// Feeds `inputs` to the model inputs, in order, and returns the values
    /// of the plan outputs.
    pub fn run(&self, inputs: TVec<Tensor>) -> ChanlastResult<TVec<Arc<Tensor>>> {
        let model = self.model();
        let model_inputs = model.input_outlets()?;
        ensure!(
            inputs.len() == model_inputs.len(),
            "Model has {} inputs, got {}",
            model_inputs.len(),
            inputs.len()
        );
        let mut values: Vec<Option<TVec<Arc<Tensor>>>> = vec![None; model.nodes().len()];
        for (ix, (input, outlet)) in inputs.into_iter().zip(model_inputs).enumerate() {
            let fact = model.outlet_fact(*outlet)?;
            ensure!(fact.matches(&input), "Input #{ix} is {input:?}, model expects {fact:?}");
            values[outlet.node] = Some(tvec!(input.into_arc_tensor()));
        }
        for &n in &self.order {
            if values[n].is_some() {
                continue;
            }
            let node = model.node(n);
            let inputs = node
                .inputs
                .iter()
                .map(|i| {
                    values[i.node]
                        .as_ref()
                        .and_then(|v| v.get(i.slot))
                        .cloned()
                        .with_context(|| format!("Missing value for {i:?}, input of {node}"))
                })
                .collect::<ChanlastResult<TVec<_>>>()?;
            let outputs = node.op.eval(inputs).with_context(|| format!("Evaluating {node}"))?;
            for (output, fact) in outputs.iter().zip(node.output_facts()) {
                ensure!(fact.matches(output), "{node} produced {output:?}, declared {fact:?}");
            }
            trace!("{node} => {}", outputs.iter().map(|o| format!("{o:?}")).join(" ; "));
            values[n] = Some(outputs);
        }
        self.outputs
            .iter()
            .map(|o| {
                values[o.node]
                    .as_ref()
                    .and_then(|v| v.get(o.slot))
                    .cloned()
                    .with_context(|| format!("Missing value for output {o:?}"))
            })
            .collect()
    }
}
