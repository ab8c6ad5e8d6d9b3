use crate::internal::*;

use crate::ops::cnn::padding::ComputedPaddedDim;
use crate::ops::cnn::PaddingSpec;
use crate::ops::nn::{BaseDataShape, DataFormat};

/// Padding mode of a convolution or pooling op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AutoPad {
    /// Use the explicit pads.
    #[default]
    Explicit,
    SameUpper,
    SameLower,
    Valid,
}

/// Rounding applied to the output size of explicitly padded ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RoundingType {
    #[default]
    Floor,
    Ceil,
}

/// Geometry shared by convolutions and pools: data format, window shape,
/// strides, dilations and padding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PoolSpec {
    pub data_format: DataFormat,
    pub kernel_shape: TVec<usize>,
    pub strides: Option<TVec<usize>>,
    pub dilations: Option<TVec<usize>>,
    pub pads_begin: TVec<usize>,
    pub pads_end: TVec<usize>,
    pub auto_pad: AutoPad,
    pub rounding_type: RoundingType,
}

impl PoolSpec {
    pub fn nchw(kernel_shape: TVec<usize>) -> PoolSpec {
        let zeros = tvec!(0; kernel_shape.len());
        PoolSpec {
            data_format: DataFormat::NCHW,
            pads_begin: zeros.clone(),
            pads_end: zeros,
            kernel_shape,
            ..PoolSpec::default()
        }
    }

    pub fn with_strides(self, strides: TVec<usize>) -> PoolSpec {
        PoolSpec { strides: Some(strides), ..self }
    }

    pub fn with_dilations(self, dilations: TVec<usize>) -> PoolSpec {
        PoolSpec { dilations: Some(dilations), ..self }
    }

    pub fn with_pads(self, pads_begin: TVec<usize>, pads_end: TVec<usize>) -> PoolSpec {
        PoolSpec { pads_begin, pads_end, ..self }
    }

    pub fn with_auto_pad(self, auto_pad: AutoPad) -> PoolSpec {
        PoolSpec { auto_pad, ..self }
    }

    pub fn with_rounding_type(self, rounding_type: RoundingType) -> PoolSpec {
        PoolSpec { rounding_type, ..self }
    }

    pub fn with_data_format(self, data_format: DataFormat) -> PoolSpec {
        PoolSpec { data_format, ..self }
    }

    pub fn rank(&self) -> usize {
        self.kernel_shape.len()
    }

    pub fn strides(&self) -> Cow<'_, [usize]> {
        self.strides.as_deref().map(Cow::Borrowed).unwrap_or_else(|| vec![1; self.rank()].into())
    }

    pub fn dilations(&self) -> Cow<'_, [usize]> {
        self.dilations
            .as_deref()
            .map(Cow::Borrowed)
            .unwrap_or_else(|| vec![1; self.rank()].into())
    }

    pub fn padding(&self) -> PaddingSpec {
        match self.auto_pad {
            AutoPad::Explicit => PaddingSpec::Explicit(
                self.pads_begin.clone(),
                self.pads_end.clone(),
                self.rounding_type == RoundingType::Ceil,
            ),
            AutoPad::Valid => PaddingSpec::Valid,
            AutoPad::SameUpper => PaddingSpec::SameUpper,
            AutoPad::SameLower => PaddingSpec::SameLower,
        }
    }

    pub fn info(&self) -> Vec<String> {
        vec![
            format!("Data format: {:?}", self.data_format),
            format!(
                "Kernel shape:{:?} (strides:{:?}, dilations:{:?})",
                self.kernel_shape, self.strides, self.dilations
            ),
            format!(
                "Padding: {:?} begin:{:?} end:{:?} rounding:{:?}",
                self.auto_pad, self.pads_begin, self.pads_end, self.rounding_type
            ),
        ]
    }

    pub fn validate(&self) -> ChanlastResult<()> {
        let rank = self.rank();
        ensure!(rank > 0, "Empty kernel shape");
        ensure!(self.kernel_shape.iter().all(|k| *k > 0), "Null kernel dimension in {:?}", self.kernel_shape);
        ensure!(self.strides().len() == rank && self.strides().iter().all(|s| *s > 0), "Invalid strides {:?}", self.strides);
        ensure!(
            self.dilations().len() == rank && self.dilations().iter().all(|s| *s > 0),
            "Invalid dilations {:?}",
            self.dilations
        );
        if self.auto_pad == AutoPad::Explicit {
            ensure!(
                self.pads_begin.len() == rank && self.pads_end.len() == rank,
                "Invalid pads {:?} {:?} for a {}D window",
                self.pads_begin,
                self.pads_end,
                rank
            );
        }
        Ok(())
    }

    /// Computes the padded geometry for concrete spatial input dimensions.
    pub fn computed_padding(&self, input_hw: &[usize]) -> ChanlastResult<TVec<ComputedPaddedDim>> {
        self.validate()?;
        ensure!(
            input_hw.len() == self.rank(),
            "Input has {} spatial axes, window has {}",
            input_hw.len(),
            self.rank()
        );
        Ok(self.padding().compute(input_hw, &self.kernel_shape, &self.dilations(), &self.strides()))
    }

    /// Computes the output shape, with `channels` output channels.
    ///
    /// Unknown spatial input dimensions give unknown output dimensions, an
    /// input of unknown rank gives an output of unknown rank.
    pub fn output_shape(&self, input: &ShapeFactoid, channels: DimFact) -> ChanlastResult<ShapeFactoid> {
        self.validate()?;
        let GenericFactoid::Only(rank) = input.rank() else {
            return Ok(shapefactoid![..]);
        };
        ensure!(
            rank == self.rank() + 2,
            "Expected a rank {} input for a {}D window, got {:?}",
            self.rank() + 2,
            self.rank(),
            input
        );
        let dims: TVec<DimFact> = input.dims().copied().collect();
        let ishape: BaseDataShape<DimFact> = self.data_format.shape(dims)?;
        let padding = self.padding();
        let strides = self.strides();
        let dilations = self.dilations();
        let hw: TVec<DimFact> = ishape
            .hw_dims()
            .iter()
            .enumerate()
            .map(|(ix, d)| match d {
                GenericFactoid::Only(d) => GenericFactoid::Only(
                    padding.compute_one(ix, *d, self.kernel_shape[ix], dilations[ix], strides[ix]).output,
                ),
                GenericFactoid::Any => GenericFactoid::Any,
            })
            .collect();
        let oshape = self.data_format.from_n_c_hw(*ishape.n(), channels, &hw)?;
        Ok(ShapeFactoid::closed(oshape.shape))
    }

    /// Output shape of a pooling op: as many channels as the input.
    pub fn pool_output_shape(&self, input: &ShapeFactoid) -> ChanlastResult<ShapeFactoid> {
        let channels = match input.rank() {
            GenericFactoid::Only(rank) if rank >= 3 => {
                input.dim(self.data_format.c_axis(rank)).unwrap_or_default()
            }
            _ => GenericFactoid::Any,
        };
        self.output_shape(input, channels)
    }
}
