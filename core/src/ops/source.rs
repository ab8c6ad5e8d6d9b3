use crate::internal::*;
use crate::ops::check_input_arity;

/// A model input. Its value is provided by the caller when running a plan.
#[derive(Debug, Clone, new, PartialEq)]
pub struct TypedSource {
    pub fact: InferenceFact,
}

impl TypedOp for TypedSource {
    fn name(&self) -> Cow<'_, str> {
        "Source".into()
    }

    fn output_facts(&self, inputs: &[&InferenceFact]) -> ChanlastResult<TVec<InferenceFact>> {
        check_input_arity(inputs, 0..=0)?;
        Ok(tvec!(self.fact.clone()))
    }

    fn eval(&self, _inputs: TVec<Arc<Tensor>>) -> ChanlastResult<TVec<Arc<Tensor>>> {
        bail!("Sources are fed by the plan, not evaluated")
    }
}
