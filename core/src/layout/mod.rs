//! Channel-last layout conversion.
//!
//! [`ConvertLayout`] walks a model once and surrounds every eligible
//! convolution and pooling node with transposes, so that the op itself runs
//! in NHWC (or NDHWC) while the rest of the graph keeps seeing NCHW (or
//! NCDHW) values.
use crate::internal::*;
use crate::transform::ModelTransform;

pub mod permutations;
pub mod rules;
pub mod transpose;

pub use self::permutations::{Direction, UnsupportedRank};

/// The individual rewriting rules of the layout conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutRule {
    Convolution,
    MaxPoolV1,
    MaxPoolV8,
    AvgPool,
}

impl LayoutRule {
    pub const ALL: [LayoutRule; 4] =
        [LayoutRule::Convolution, LayoutRule::MaxPoolV1, LayoutRule::MaxPoolV8, LayoutRule::AvgPool];

    pub fn name(&self) -> &'static str {
        match self {
            LayoutRule::Convolution => "ConvertConvolutionLayout",
            LayoutRule::MaxPoolV1 => "ConvertMaxPoolV1Layout",
            LayoutRule::MaxPoolV8 => "ConvertMaxPoolV8Layout",
            LayoutRule::AvgPool => "ConvertAvgPoolLayout",
        }
    }

    pub fn op_kind(&self) -> OpKind {
        match self {
            LayoutRule::Convolution => OpKind::Conv,
            LayoutRule::MaxPoolV1 => OpKind::MaxPool,
            LayoutRule::MaxPoolV8 => OpKind::MaxPoolV8,
            LayoutRule::AvgPool => OpKind::AvgPool,
        }
    }

    /// Tries the rule on a node.
    ///
    /// A rank without layout permutation aborts the attempt on this node
    /// only: the node is left untouched.
    pub fn apply(
        &self,
        ctx: &ConvertLayout,
        model: &Model,
        node: &Node,
        name: &str,
    ) -> ChanlastResult<Option<ModelPatch>> {
        let attempt = match self {
            LayoutRule::Convolution => rules::convolution(ctx, model, node, name),
            LayoutRule::MaxPoolV1 => rules::max_pool_v1(ctx, model, node, name),
            LayoutRule::MaxPoolV8 => rules::max_pool_v8(ctx, model, node, name),
            LayoutRule::AvgPool => rules::avg_pool(ctx, model, node, name),
        };
        skip_unsupported_rank(self.name(), node, attempt)
    }
}

fn skip_unsupported_rank(
    rule: &str,
    node: &Node,
    attempt: ChanlastResult<Option<ModelPatch>>,
) -> ChanlastResult<Option<ModelPatch>> {
    match attempt {
        Err(e) => match e.downcast_ref::<UnsupportedRank>() {
            Some(rank) => {
                warn!("{rule}: skipping {node}: {rank}");
                Ok(None)
            }
            None => Err(e),
        },
        patch => patch,
    }
}

/// Moves convolutions and pools to channel-last layout.
///
/// The veto predicate is consulted for every candidate node: when it
/// returns true the node is left as is.
pub struct ConvertLayout {
    veto: Option<Box<dyn Fn(&Node) -> bool>>,
    rules: TVec<LayoutRule>,
}

impl Default for ConvertLayout {
    fn default() -> ConvertLayout {
        ConvertLayout { veto: None, rules: LayoutRule::ALL.into_iter().collect() }
    }
}

impl fmt::Debug for ConvertLayout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ConvertLayout")
            .field("veto", &self.veto.is_some())
            .field("rules", &self.rules)
            .finish()
    }
}

impl ConvertLayout {
    pub const NAME: &'static str = "ConvertLayout";

    pub fn with_veto(self, veto: impl Fn(&Node) -> bool + 'static) -> ConvertLayout {
        ConvertLayout { veto: Some(Box::new(veto)), ..self }
    }

    pub fn with_rules(self, rules: &[LayoutRule]) -> ConvertLayout {
        ConvertLayout { rules: rules.into(), ..self }
    }

    pub fn rules(&self) -> &[LayoutRule] {
        &self.rules
    }

    pub fn is_vetoed(&self, node: &Node) -> bool {
        self.veto.as_ref().is_some_and(|veto| veto(node))
    }

    pub fn rewriter(&self) -> Rewriter<ConvertLayout> {
        self.rules.iter().fold(Rewriter::default(), |rewriter, &rule| {
            rewriter.with_rule_for(rule.op_kind(), rule.name(), move |ctx, model, node, name| {
                rule.apply(ctx, model, node, name)
            })
        })
    }

    /// Runs the conversion once over the model. Returns the number of nodes
    /// moved to channel-last layout.
    pub fn run(&self, model: &mut Model) -> ChanlastResult<usize> {
        let rewritten = self.rewriter().rewrite(self, model).context(Self::NAME)?;
        debug!("{}: {rewritten} node(s) moved to channel-last", Self::NAME);
        Ok(rewritten)
    }
}

impl ModelTransform for ConvertLayout {
    fn name(&self) -> Cow<'_, str> {
        "convert-layout".into()
    }

    fn transform(&self, model: &mut Model) -> ChanlastResult<()> {
        self.run(model)?;
        Ok(())
    }
}
