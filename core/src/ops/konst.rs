use crate::internal::*;
use crate::ops::check_input_arity;

#[derive(Debug, Clone, new, PartialEq)]
pub struct Const(pub Arc<Tensor>);

impl TypedOp for Const {
    fn name(&self) -> Cow<'_, str> {
        "Const".into()
    }

    fn info(&self) -> ChanlastResult<Vec<String>> {
        Ok(vec![format!("{:?}", self.0)])
    }

    fn output_facts(&self, inputs: &[&InferenceFact]) -> ChanlastResult<TVec<InferenceFact>> {
        check_input_arity(inputs, 0..=0)?;
        Ok(tvec!(InferenceFact::from(&*self.0)))
    }

    fn eval(&self, _inputs: TVec<Arc<Tensor>>) -> ChanlastResult<TVec<Arc<Tensor>>> {
        Ok(tvec![self.0.clone()])
    }
}
