use crate::internal::*;
use crate::ops::check_input_arity;
use crate::ops::cnn::{PoolSpec, Tap, WindowGeometry};
use ndarray::prelude::*;
use num_traits::Float;

/// Average pooling.
///
/// With `exclude_pad`, each window is divided by the number of valid input
/// positions it covers; otherwise padding positions count too. Positions
/// beyond the padded input (ceil rounding) never count.
#[derive(Debug, Clone, new, PartialEq, Eq, Hash)]
pub struct AvgPool {
    pub pool_spec: PoolSpec,
    pub exclude_pad: bool,
}

impl AvgPool {
    fn eval_t<T: Datum + Float>(&self, input: &Tensor) -> ChanlastResult<Tensor> {
        let ishape = self.pool_spec.data_format.shape(input.shape())?;
        let rank = ishape.rank();
        ensure!(
            rank == self.pool_spec.rank() + 2,
            "Pooling a {:?} input with a {}D window",
            input.shape(),
            self.pool_spec.rank()
        );
        let input = input.to_array_view::<T>()?.permuted_axes(&*ishape.channel_first_axes());
        let geo = WindowGeometry::new(&self.pool_spec, &input.shape()[2..])?;
        let mut oshape: TVec<usize> = input.shape()[..2].into();
        oshape.extend(geo.output_hw.iter().copied());
        let mut output = ArrayD::<T>::zeros(&*oshape);
        let mut ix: TVec<usize> = tvec!(0; rank);
        for (coords, value) in output.indexed_iter_mut() {
            let coords = coords.slice();
            ix[0] = coords[0];
            ix[1] = coords[1];
            let mut sum = T::zero();
            let mut count = 0usize;
            geo.visit(&coords[2..], |_, tap| match tap {
                Tap::Input(x) => {
                    ix[2..].copy_from_slice(x);
                    sum = sum + input[&*ix];
                    count += 1;
                }
                Tap::Padding if !self.exclude_pad => count += 1,
                _ => (),
            });
            if count > 0 {
                *value = sum / <T as num_traits::NumCast>::from(count).context("Window too large")?;
            }
        }
        let output = output.permuted_axes(&*self.pool_spec.data_format.from_channel_first_axes(rank));
        Ok(output.into())
    }
}

impl TypedOp for AvgPool {
    fn name(&self) -> Cow<'_, str> {
        "AvgPool".into()
    }

    fn info(&self) -> ChanlastResult<Vec<String>> {
        let mut info = self.pool_spec.info();
        info.push(format!("Exclude pad: {}", self.exclude_pad));
        Ok(info)
    }

    fn output_facts(&self, inputs: &[&InferenceFact]) -> ChanlastResult<TVec<InferenceFact>> {
        check_input_arity(inputs, 1..=1)?;
        let shape = self.pool_spec.pool_output_shape(&inputs[0].shape)?;
        Ok(tvec!(InferenceFact { datum_type: inputs[0].datum_type, shape }))
    }

    fn eval(&self, inputs: TVec<Arc<Tensor>>) -> ChanlastResult<TVec<Arc<Tensor>>> {
        check_input_arity(&inputs, 1..=1)?;
        let output = dispatch_floatlike!(Self::eval_t(inputs[0].datum_type())(self, &inputs[0]))?;
        Ok(tvec!(output.into_arc_tensor()))
    }
}
