use crate::internal::*;
use crate::ops::check_input_arity;
use crate::ops::cnn::{PoolSpec, Tap, WindowGeometry};
use ndarray::prelude::*;
use num_traits::Float;

/// Layout of convolution weights.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum KernelFormat {
    /// Output channels, input channels, then spatial axes.
    #[default]
    OIHW,
    /// Output channels, spatial axes, then input channels.
    OHWI,
}

impl KernelFormat {
    pub fn h_axis(&self) -> usize {
        match self {
            KernelFormat::OIHW => 2,
            KernelFormat::OHWI => 1,
        }
    }

    pub fn i_axis(&self, rank: usize) -> usize {
        match self {
            KernelFormat::OIHW => 1,
            KernelFormat::OHWI => rank - 1,
        }
    }

    /// Axes of a kernel of this format, listed in OIHW order.
    pub fn oihw_axes(&self, rank: usize) -> TVec<usize> {
        let mut axes = tvec!(0, self.i_axis(rank));
        axes.extend(self.h_axis()..self.h_axis() + rank - 2);
        axes
    }

    pub fn spatial_shape<'a, D>(&self, full_shape: &'a [D]) -> &'a [D] {
        &full_shape[self.h_axis()..][..full_shape.len() - 2]
    }
}

/// Direct convolution, without groups.
///
/// Inputs are the activations, the weights (`O` output channels, `I` input
/// channels and the spatial kernel, laid out according to `kernel_fmt`), and
/// an optional bias of shape `[O]`.
#[derive(Debug, Clone, new, PartialEq, Eq, Hash)]
pub struct Conv {
    pub pool_spec: PoolSpec,
    pub kernel_fmt: KernelFormat,
}

impl Conv {
    fn eval_t<T: Datum + Float>(&self, inputs: &[Arc<Tensor>]) -> ChanlastResult<Tensor> {
        let ishape = self.pool_spec.data_format.shape(inputs[0].shape())?;
        let rank = ishape.rank();
        ensure!(
            rank == self.pool_spec.rank() + 2 && inputs[1].rank() == rank,
            "Convolving a {:?} input with {:?} weights for a {}D kernel",
            inputs[0].shape(),
            inputs[1].shape(),
            self.pool_spec.rank()
        );
        let input = inputs[0].to_array_view::<T>()?.permuted_axes(&*ishape.channel_first_axes());
        let kernel = inputs[1].to_array_view::<T>()?.permuted_axes(&*self.kernel_fmt.oihw_axes(rank));
        let channels = input.shape()[1];
        let output_channels = kernel.shape()[0];
        ensure!(
            kernel.shape()[1] == channels && kernel.shape()[2..] == *self.pool_spec.kernel_shape,
            "Weights {:?} do not match input {:?}",
            inputs[1].shape(),
            inputs[0].shape()
        );
        let bias = inputs.get(2).map(|b| b.as_slice::<T>()).transpose()?;
        if let Some(bias) = bias {
            ensure!(bias.len() == output_channels, "Expected {} biases, got {}", output_channels, bias.len());
        }
        let geo = WindowGeometry::new(&self.pool_spec, &input.shape()[2..])?;
        let mut oshape: TVec<usize> = tvec!(input.shape()[0], output_channels);
        oshape.extend(geo.output_hw.iter().copied());
        let mut output = ArrayD::<T>::zeros(&*oshape);
        let mut input_ix: TVec<usize> = tvec!(0; rank);
        let mut kernel_ix: TVec<usize> = tvec!(0; rank);
        for (coords, value) in output.indexed_iter_mut() {
            let coords = coords.slice();
            let mut sum = bias.map(|b| b[coords[1]]).unwrap_or_else(T::zero);
            input_ix[0] = coords[0];
            kernel_ix[0] = coords[1];
            geo.visit(&coords[2..], |k, tap| {
                if let Tap::Input(x) = tap {
                    input_ix[2..].copy_from_slice(x);
                    kernel_ix[2..].copy_from_slice(k);
                    for c in 0..channels {
                        input_ix[1] = c;
                        kernel_ix[1] = c;
                        sum = sum + input[&*input_ix] * kernel[&*kernel_ix];
                    }
                }
            });
            *value = sum;
        }
        let output = output.permuted_axes(&*self.pool_spec.data_format.from_channel_first_axes(rank));
        Ok(output.into())
    }
}

impl TypedOp for Conv {
    fn name(&self) -> Cow<'_, str> {
        "Conv".into()
    }

    fn info(&self) -> ChanlastResult<Vec<String>> {
        let mut info = self.pool_spec.info();
        info.push(format!("Kernel format: {:?}", self.kernel_fmt));
        Ok(info)
    }

    fn output_facts(&self, inputs: &[&InferenceFact]) -> ChanlastResult<TVec<InferenceFact>> {
        check_input_arity(inputs, 2..=3)?;
        let (input, kernel) = (inputs[0], inputs[1]);
        let datum_type = input.datum_type.unify(&kernel.datum_type)?;
        let mut channels = DimFact::default();
        if let GenericFactoid::Only(rank) = kernel.rank() {
            ensure!(
                rank == self.pool_spec.rank() + 2,
                "Expected rank {} weights, got {:?}",
                self.pool_spec.rank() + 2,
                kernel.shape
            );
            let dims: TVec<DimFact> = kernel.shape.dims().copied().collect();
            for (dim, expected) in self.kernel_fmt.spatial_shape(&dims).iter().zip(&self.pool_spec.kernel_shape) {
                dim.unify(&dimfact!(*expected))
                    .with_context(|| format!("Weights {:?} for kernel {:?}", kernel.shape, self.pool_spec.kernel_shape))?;
            }
            channels = dims[0];
            if let GenericFactoid::Only(irank) = input.rank() {
                if irank == rank {
                    let c = input.shape.dim(self.pool_spec.data_format.c_axis(rank)).unwrap_or_default();
                    c.unify(&dims[self.kernel_fmt.i_axis(rank)])
                        .with_context(|| format!("Input {:?} and weights {:?}", input.shape, kernel.shape))?;
                }
            }
        }
        if let Some(bias) = inputs.get(2) {
            if let GenericFactoid::Only(rank) = bias.rank() {
                ensure!(rank == 1, "Bias must be a vector, got {:?}", bias.shape);
                channels = channels.unify(&bias.shape.dim(0).unwrap_or_default())?;
            }
        }
        let shape = self.pool_spec.output_shape(&input.shape, channels)?;
        Ok(tvec!(InferenceFact { datum_type, shape }))
    }

    fn eval(&self, inputs: TVec<Arc<Tensor>>) -> ChanlastResult<TVec<Arc<Tensor>>> {
        check_input_arity(&inputs, 2..=3)?;
        let output = dispatch_floatlike!(Self::eval_t(inputs[0].datum_type())(self, &inputs))?;
        Ok(tvec!(output.into_arc_tensor()))
    }
}
