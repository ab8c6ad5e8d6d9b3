use crate::internal::*;
use std::ops::Range;

/// Position of the channel axis in activation tensors.
///
/// The names stand for any number of spatial axes: NCHW covers NCDHW, and
/// NHWC covers NDHWC.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum DataFormat {
    #[default]
    NCHW,
    NHWC,
}

impl DataFormat {
    pub fn is_channel_last(&self) -> bool {
        *self == DataFormat::NHWC
    }

    pub fn c_axis(&self, rank: usize) -> usize {
        match self {
            DataFormat::NCHW => 1,
            DataFormat::NHWC => rank - 1,
        }
    }

    /// Permutation bringing a channel-first tensor of the given rank to this
    /// format.
    pub fn from_channel_first_axes(&self, rank: usize) -> TVec<usize> {
        match self {
            DataFormat::NCHW => (0..rank).collect(),
            DataFormat::NHWC => std::iter::once(0).chain(2..rank).chain(std::iter::once(1)).collect(),
        }
    }

    pub fn shape<D: Clone>(&self, shape: impl AsRef<[D]>) -> ChanlastResult<BaseDataShape<D>> {
        let shape: TVec<D> = shape.as_ref().iter().cloned().collect();
        ensure!(shape.len() >= 3, "{:?} needs a batch, a channel and at least one spatial axis", self);
        Ok(BaseDataShape { fmt: *self, shape })
    }

    pub fn from_n_c_hw<D: Clone>(&self, n: D, c: D, hw: &[D]) -> ChanlastResult<BaseDataShape<D>> {
        let mut me = tvec!(n);
        if *self == DataFormat::NCHW {
            me.push(c.clone());
        }
        me.extend(hw.iter().cloned());
        if *self == DataFormat::NHWC {
            me.push(c);
        }
        self.shape(me)
    }
}

/// A shape, interpreted through a DataFormat.
#[derive(Clone, Debug, PartialEq)]
pub struct BaseDataShape<D: Clone> {
    pub fmt: DataFormat,
    pub shape: TVec<D>,
}

impl<D: Clone> BaseDataShape<D> {
    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn hw_rank(&self) -> usize {
        self.rank() - 2
    }

    #[inline]
    pub fn n_axis(&self) -> usize {
        0
    }

    #[inline]
    pub fn c_axis(&self) -> usize {
        self.fmt.c_axis(self.rank())
    }

    #[inline]
    pub fn h_axis(&self) -> usize {
        match self.fmt {
            DataFormat::NCHW => 2,
            DataFormat::NHWC => 1,
        }
    }

    #[inline]
    pub fn hw_axes(&self) -> Range<usize> {
        self.h_axis()..self.h_axis() + self.hw_rank()
    }

    #[inline]
    pub fn n(&self) -> &D {
        &self.shape[self.n_axis()]
    }

    #[inline]
    pub fn c(&self) -> &D {
        &self.shape[self.c_axis()]
    }

    #[inline]
    pub fn hw_dims(&self) -> &[D] {
        &self.shape[self.hw_axes()]
    }

    /// Axes of the shape, listed in channel-first order.
    pub fn channel_first_axes(&self) -> TVec<usize> {
        let mut axes = tvec!(self.n_axis(), self.c_axis());
        axes.extend(self.hw_axes());
        axes
    }
}
