use crate::internal::*;
use itertools::Itertools;

type RewriteRule<Ctx> = Box<dyn Fn(&Ctx, &Model, &Node) -> ChanlastResult<Option<ModelPatch>>>;

/// A set of local rewriting rules, dispatched on the kind of op of each node.
#[allow(clippy::type_complexity)]
pub struct Rewriter<Ctx> {
    rules: HashMap<OpKind, Vec<(Cow<'static, str>, RewriteRule<Ctx>)>>,
}

impl<Ctx> Default for Rewriter<Ctx> {
    fn default() -> Self {
        Rewriter { rules: HashMap::default() }
    }
}

impl<Ctx> Rewriter<Ctx> {
    pub fn with_rule_for(
        mut self,
        kind: OpKind,
        name: impl Into<Cow<'static, str>>,
        rule: impl Fn(&Ctx, &Model, &Node, &str) -> ChanlastResult<Option<ModelPatch>> + 'static,
    ) -> Self {
        self.rules.entry(kind).or_default().push((
            name.into(),
            Box::new(move |c: &Ctx, m: &Model, n: &Node| rule(c, m, n, &n.name)),
        ));
        self
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.values().flat_map(|rules| rules.iter().map(|(name, _)| &**name))
    }

    /// Runs the rules once over the nodes of the model, in evaluation order.
    ///
    /// Nodes created by a patch are not visited again during the same run. At
    /// most one rule applies per node. Returns the number of applied patches.
    pub fn rewrite(&self, ctx: &Ctx, model: &mut Model) -> ChanlastResult<usize> {
        let mut applied = 0;
        for n in model.eval_order()? {
            let Some(rules) = self.rules.get(&model.node(n).kind()) else { continue };
            for (name, rule) in rules {
                let Some(mut patch) = (rule)(ctx, model, model.node(n)).with_context(|| {
                    format!("Evaluating rewriting rule \"{name}\" on node {}", model.node(n))
                })?
                else {
                    continue;
                };
                patch.push_context(format!("{name}/{}", model.node(n)));
                debug!("Applying patch {}", patch.context.iter().rev().join(" >> "));
                patch.apply(model).with_context(|| {
                    format!("Applying patch for rewriting rule \"{name}\" on node {}", model.node(n))
                })?;
                applied += 1;
                break;
            }
        }
        if applied > 0 {
            model.compact()?;
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::element_wise::ElementWiseOp;

    fn relu_to_neg(_ctx: &(), model: &Model, node: &Node, name: &str) -> ChanlastResult<Option<ModelPatch>> {
        if node.op != Op::ElementWise(ElementWiseOp::Relu) {
            return Ok(None);
        }
        let mut patch = ModelPatch::default();
        let tap = patch.tap_model(model, node.inputs[0])?;
        let neg = patch.wire_node(model.unique_name(format!("{name}.neg")), ElementWiseOp::Neg, &[tap])?;
        patch.shunt_outside(model, node.id.into(), neg[0])?;
        Ok(Some(patch))
    }

    #[test]
    fn single_pass_with_count() {
        crate::setup_test_logger();
        let mut model = Model::default();
        let a = model.add_source("a", f32::fact([2])).unwrap();
        let b = model.wire_node("b", ElementWiseOp::Relu, &[a]).unwrap();
        let c = model.wire_node("c", ElementWiseOp::Neg, &b).unwrap();
        let d = model.wire_node("d", ElementWiseOp::Relu, &c).unwrap();
        model.set_output_outlets(&d).unwrap();
        let rewriter = Rewriter::default().with_rule_for(OpKind::ElementWise, "relu-to-neg", relu_to_neg);
        assert_eq!(rewriter.rule_names().collect::<Vec<_>>(), vec!("relu-to-neg"));
        assert_eq!(rewriter.rewrite(&(), &mut model).unwrap(), 2);
        assert_eq!(model.nodes().len(), 4);
        assert!(model.nodes().iter().all(|n| n.op != Op::ElementWise(ElementWiseOp::Relu)));
        assert_eq!(rewriter.rewrite(&(), &mut model).unwrap(), 0);
    }

    #[test]
    fn errors_carry_context() {
        let mut model = Model::default();
        let a = model.add_source("a", f32::fact([2])).unwrap();
        let b = model.wire_node("b", ElementWiseOp::Relu, &[a]).unwrap();
        model.set_output_outlets(&b).unwrap();
        let rewriter = Rewriter::<()>::default()
            .with_rule_for(OpKind::ElementWise, "failing", |_, _, _, _| bail!("nope"));
        let err = rewriter.rewrite(&(), &mut model).unwrap_err();
        assert!(format!("{err:?}").contains("failing"));
        assert!(format!("{err:?}").contains("nope"));
    }
}
