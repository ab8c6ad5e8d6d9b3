use crate::internal::*;
use crate::ops::check_input_arity;
use num_traits::Float;

/// Unary element-wise operators over float tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementWiseOp {
    Relu,
    Neg,
}

impl ElementWiseOp {
    fn eval_t<T: Datum + Float>(&self, t: &Tensor) -> ChanlastResult<Tensor> {
        let view = t.to_array_view::<T>()?;
        let result = match self {
            ElementWiseOp::Relu => view.mapv(|x| x.max(T::zero())),
            ElementWiseOp::Neg => view.mapv(|x| -x),
        };
        Ok(result.into())
    }
}

impl TypedOp for ElementWiseOp {
    fn name(&self) -> Cow<'_, str> {
        format!("{self:?}").into()
    }

    fn output_facts(&self, inputs: &[&InferenceFact]) -> ChanlastResult<TVec<InferenceFact>> {
        check_input_arity(inputs, 1..=1)?;
        Ok(tvec!(inputs[0].clone()))
    }

    fn eval(&self, inputs: TVec<Arc<Tensor>>) -> ChanlastResult<TVec<Arc<Tensor>>> {
        check_input_arity(&inputs, 1..=1)?;
        let output = dispatch_floatlike!(Self::eval_t(inputs[0].datum_type())(self, &inputs[0]))?;
        Ok(tvec!(output.into_arc_tensor()))
    }
}
