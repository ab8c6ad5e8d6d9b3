use crate::internal::*;
use crate::ops::check_input_arity;
use crate::ops::cnn::{PoolSpec, Tap, WindowGeometry};
use ndarray::prelude::*;
use num_traits::Float;

/// Computes max pooling in the channel-first view of the input, then lays
/// the results out in the data format of the pool.
///
/// Indices are positions in the flattened channel-first input, counted from
/// `axis`: with axis 0 they cover the whole tensor, with axis 1 they restart
/// at every batch entry. Windows with no valid input give `-inf` at index 0.
fn max_pool_t<T: Datum + Float>(
    spec: &PoolSpec,
    input: &Tensor,
    axis: usize,
) -> ChanlastResult<(Tensor, ArrayD<i64>)> {
    let ishape = spec.data_format.shape(input.shape())?;
    let rank = ishape.rank();
    ensure!(
        rank == spec.rank() + 2,
        "Pooling a {:?} input with a {}D window",
        input.shape(),
        spec.rank()
    );
    let input = input.to_array_view::<T>()?.permuted_axes(&*ishape.channel_first_axes());
    let geo = WindowGeometry::new(spec, &input.shape()[2..])?;
    let mut strides: TVec<i64> = tvec!(0; rank);
    let mut stride = 1i64;
    for ax in (axis..rank).rev() {
        strides[ax] = stride;
        stride *= input.shape()[ax] as i64;
    }
    let mut oshape: TVec<usize> = input.shape()[..2].into();
    oshape.extend(geo.output_hw.iter().copied());
    let mut values = ArrayD::<T>::zeros(&*oshape);
    let mut indices = ArrayD::<i64>::zeros(&*oshape);
    let mut ix: TVec<usize> = tvec!(0; rank);
    for ((coords, value), index) in values.indexed_iter_mut().zip(indices.iter_mut()) {
        let coords = coords.slice();
        ix[0] = coords[0];
        ix[1] = coords[1];
        let mut best: Option<(T, i64)> = None;
        geo.visit(&coords[2..], |_, tap| {
            if let Tap::Input(x) = tap {
                ix[2..].copy_from_slice(x);
                let v = input[&*ix];
                if best.is_none_or(|(max, _)| v > max) {
                    let position = ix.iter().zip(&strides).map(|(i, s)| *i as i64 * s).sum();
                    best = Some((v, position));
                }
            }
        });
        (*value, *index) = best.unwrap_or((T::neg_infinity(), 0));
    }
    let axes = spec.data_format.from_channel_first_axes(rank);
    Ok((values.permuted_axes(&*axes).into(), indices.permuted_axes(&*axes)))
}

/// Max pooling with a single output (opset 1 flavour: no dilations).
#[derive(Debug, Clone, new, PartialEq, Eq, Hash)]
pub struct MaxPool {
    pub pool_spec: PoolSpec,
}

impl MaxPool {
    fn eval_t<T: Datum + Float>(&self, input: &Tensor) -> ChanlastResult<Tensor> {
        Ok(max_pool_t::<T>(&self.pool_spec, input, 0)?.0)
    }
}

impl TypedOp for MaxPool {
    fn name(&self) -> Cow<'_, str> {
        "MaxPool".into()
    }

    fn info(&self) -> ChanlastResult<Vec<String>> {
        Ok(self.pool_spec.info())
    }

    fn output_facts(&self, inputs: &[&InferenceFact]) -> ChanlastResult<TVec<InferenceFact>> {
        check_input_arity(inputs, 1..=1)?;
        ensure!(
            self.pool_spec.dilations().iter().all(|d| *d == 1),
            "MaxPool does not support dilations, use MaxPoolV8"
        );
        let shape = self.pool_spec.pool_output_shape(&inputs[0].shape)?;
        Ok(tvec!(InferenceFact { datum_type: inputs[0].datum_type, shape }))
    }

    fn eval(&self, inputs: TVec<Arc<Tensor>>) -> ChanlastResult<TVec<Arc<Tensor>>> {
        check_input_arity(&inputs, 1..=1)?;
        let output = dispatch_floatlike!(Self::eval_t(inputs[0].datum_type())(self, &inputs[0]))?;
        Ok(tvec!(output.into_arc_tensor()))
    }
}

/// Max pooling with dilations and a second output holding the position of
/// each selected value.
///
/// `axis` sets where index flattening starts. It may be negative (counted
/// from the end) and is only checked at evaluation.
#[derive(Debug, Clone, new, PartialEq, Eq, Hash)]
pub struct MaxPoolV8 {
    pub pool_spec: PoolSpec,
    pub index_element_type: DatumType,
    pub axis: i64,
}

impl MaxPoolV8 {
    pub fn normalized_axis(&self, rank: usize) -> ChanlastResult<usize> {
        let axis = if self.axis < 0 { self.axis + rank as i64 } else { self.axis };
        ensure!(
            (0..rank as i64).contains(&axis),
            "Invalid index axis {} for a rank {} input",
            self.axis,
            rank
        );
        Ok(axis as usize)
    }

    fn eval_t<T: Datum + Float>(&self, input: &Tensor) -> ChanlastResult<(Tensor, ArrayD<i64>)> {
        max_pool_t::<T>(&self.pool_spec, input, self.normalized_axis(input.rank())?)
    }
}

impl TypedOp for MaxPoolV8 {
    fn name(&self) -> Cow<'_, str> {
        "MaxPoolV8".into()
    }

    fn info(&self) -> ChanlastResult<Vec<String>> {
        let mut info = self.pool_spec.info();
        info.push(format!("Indices: {:?} from axis {}", self.index_element_type, self.axis));
        Ok(info)
    }

    fn nboutputs(&self) -> usize {
        2
    }

    fn output_facts(&self, inputs: &[&InferenceFact]) -> ChanlastResult<TVec<InferenceFact>> {
        check_input_arity(inputs, 1..=1)?;
        ensure!(
            matches!(self.index_element_type, DatumType::I32 | DatumType::I64),
            "Indices must be I32 or I64, got {:?}",
            self.index_element_type
        );
        let shape = self.pool_spec.pool_output_shape(&inputs[0].shape)?;
        Ok(tvec!(
            InferenceFact { datum_type: inputs[0].datum_type, shape: shape.clone() },
            InferenceFact::dt(self.index_element_type).with_shape(shape)
        ))
    }

    fn eval(&self, inputs: TVec<Arc<Tensor>>) -> ChanlastResult<TVec<Arc<Tensor>>> {
        check_input_arity(&inputs, 1..=1)?;
        let (values, indices) =
            dispatch_floatlike!(Self::eval_t(inputs[0].datum_type())(self, &inputs[0]))?;
        let indices = Tensor::from(indices).cast_to_dt(self.index_element_type)?;
        Ok(tvec!(values.into_arc_tensor(), indices.into_arc_tensor()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::cnn::RoundingType;
    use crate::ops::nn::DataFormat;

    fn input() -> Tensor {
        let data: Vec<f32> = (0..2 * 2 * 4 * 4).map(|x| ((x * 7) % 11) as f32).collect();
        Tensor::from_shape(&[2, 2, 4, 4], &data).unwrap()
    }

    #[test]
    fn values() {
        let input = Tensor::from_shape(&[1, 1, 2, 4], &[1f32, 5., 2., 0., 3., 4., 8., 6.]).unwrap();
        let op = MaxPool::new(PoolSpec::nchw(tvec!(2, 2)).with_strides(tvec!(2, 2)));
        let output = op.eval(tvec!(input.into_arc_tensor())).unwrap();
        assert_eq!(*output[0], Tensor::from_shape(&[1, 1, 1, 2], &[5f32, 8.]).unwrap());
    }

    #[test]
    fn v1_rejects_dilations() {
        let op = MaxPool::new(PoolSpec::nchw(tvec!(2, 2)).with_dilations(tvec!(2, 2)));
        assert!(op.output_facts(&[&f32::fact([1, 1, 8, 8])]).is_err());
    }

    #[test]
    fn ceil_window_outside() {
        let input = Tensor::from_shape(&[1, 1, 5], &[1f32, 2., 3., 4., 9.]).unwrap();
        let spec = PoolSpec::nchw(tvec!(2)).with_strides(tvec!(2)).with_rounding_type(RoundingType::Ceil);
        let output = MaxPoolV8::new(spec, DatumType::I64, 0).eval(tvec!(input.into_arc_tensor())).unwrap();
        assert_eq!(*output[0], Tensor::from_shape(&[1, 1, 3], &[2f32, 4., 9.]).unwrap());
        assert_eq!(*output[1], Tensor::from_shape(&[1, 1, 3], &[1i64, 3, 4]).unwrap());
    }

    #[test]
    fn indices_axis() {
        let input = Tensor::from_shape(&[2, 1, 1, 2], &[1f32, 2., 4., 3.]).unwrap().into_arc_tensor();
        let spec = PoolSpec::nchw(tvec!(1, 2));
        let op = MaxPoolV8::new(spec.clone(), DatumType::I32, 0);
        let output = op.eval(tvec!(input.clone())).unwrap();
        assert_eq!(*output[1], Tensor::from_shape(&[2, 1, 1, 1], &[1i32, 2]).unwrap());
        let op = MaxPoolV8::new(spec, DatumType::I32, 1);
        let output = op.eval(tvec!(input)).unwrap();
        assert_eq!(*output[1], Tensor::from_shape(&[2, 1, 1, 1], &[1i32, 0]).unwrap());
    }

    #[test]
    fn normalized_axis() {
        let op = MaxPoolV8::new(PoolSpec::nchw(tvec!(2, 2)), DatumType::I64, -1);
        assert_eq!(op.normalized_axis(4).unwrap(), 3);
        let op = MaxPoolV8 { axis: -5, ..op };
        assert!(op.normalized_axis(4).is_err());
        assert_eq!(op.normalized_axis(5).unwrap(), 0);
    }

    #[test]
    fn facts() {
        let spec = PoolSpec::nchw(tvec!(2, 2)).with_strides(tvec!(2, 2)).with_data_format(DataFormat::NHWC);
        let op = MaxPoolV8::new(spec, DatumType::I32, 0);
        let output = op.output_facts(&[&f32::fact(shapefactoid![1, 8, _, 3])]).unwrap();
        assert_eq!(output[0], f32::fact(shapefactoid![1, 4, _, 3]));
        assert_eq!(output[1], i32::fact(shapefactoid![1, 4, _, 3]));
        let op = MaxPoolV8 { index_element_type: DatumType::F32, ..op };
        assert!(op.output_facts(&[&f32::fact([1, 8, 8, 3])]).is_err());
    }

    #[test]
    fn channel_last_matches_channel_first() {
        let input = input();
        let spec = PoolSpec::nchw(tvec!(2, 2)).with_dilations(tvec!(1, 2)).with_pads(tvec!(1, 1), tvec!(0, 1));
        let nchw = MaxPoolV8::new(spec.clone(), DatumType::I64, 1);
        let nhwc = MaxPoolV8::new(spec.with_data_format(DataFormat::NHWC), DatumType::I64, 1);
        let expected = nchw.eval(tvec!(input.clone().into_arc_tensor())).unwrap();
        let found = nhwc.eval(tvec!(input.permute_axes(&[0, 2, 3, 1]).unwrap().into_arc_tensor())).unwrap();
        for (found, expected) in found.iter().zip(expected.iter()) {
            assert_eq!(found.permute_axes(&[0, 3, 1, 2]).unwrap(), **expected);
        }
    }
}
