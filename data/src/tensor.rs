//! `Tensor` is the data container flowing through the reference plan.
use crate::datum::{Datum, DatumType};
use anyhow::{bail, ensure, format_err};
use itertools::Itertools;
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use std::fmt;
use std::sync::Arc;

pub mod litteral;

#[doc(hidden)]
#[derive(Clone, PartialEq)]
pub enum TensorData {
    Bool(ArrayD<bool>),
    U8(ArrayD<u8>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

/// Tensor, owning its data in standard (row major) layout.
#[derive(Clone, PartialEq)]
pub struct Tensor {
    data: TensorData,
}

impl Tensor {
    pub fn from_shape<T: Datum>(shape: &[usize], data: &[T]) -> anyhow::Result<Tensor> {
        let array = ArrayD::from_shape_vec(shape, data.to_vec())?;
        Ok(array.into())
    }

    pub fn zero<T: Datum>(shape: &[usize]) -> Tensor {
        ArrayD::<T>::default(shape).into()
    }

    pub fn datum_type(&self) -> DatumType {
        match &self.data {
            TensorData::Bool(_) => DatumType::Bool,
            TensorData::U8(_) => DatumType::U8,
            TensorData::I32(_) => DatumType::I32,
            TensorData::I64(_) => DatumType::I64,
            TensorData::F32(_) => DatumType::F32,
            TensorData::F64(_) => DatumType::F64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match &self.data {
            TensorData::Bool(a) => a.shape(),
            TensorData::U8(a) => a.shape(),
            TensorData::I32(a) => a.shape(),
            TensorData::I64(a) => a.shape(),
            TensorData::F32(a) => a.shape(),
            TensorData::F64(a) => a.shape(),
        }
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    /// Get the number of values in the tensor.
    #[inline]
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Access the data as a `ndarray::ArrayView`.
    pub fn to_array_view<T: Datum>(&self) -> anyhow::Result<ArrayViewD<'_, T>> {
        T::view(&self.data).ok_or_else(|| {
            format_err!(
                "Tensor datum type error: tensor is {:?}, accessed as {:?}",
                self.datum_type(),
                T::datum_type()
            )
        })
    }

    pub fn to_scalar<T: Datum>(&self) -> anyhow::Result<T> {
        let view = self.to_array_view::<T>()?;
        ensure!(view.len() == 1, "to_scalar on a tensor of shape {:?}", self.shape());
        view.iter().next().copied().ok_or_else(|| format_err!("empty tensor"))
    }

    pub fn as_slice<T: Datum>(&self) -> anyhow::Result<&[T]> {
        self.to_array_view::<T>()?
            .to_slice()
            .ok_or_else(|| format_err!("Tensor is not in standard layout"))
    }

    fn permute_axes_t<T: Datum>(&self, axes: &[usize]) -> anyhow::Result<Tensor> {
        let permuted = self.to_array_view::<T>()?.permuted_axes(axes);
        Ok(permuted.as_standard_layout().into_owned().into())
    }

    /// Reorder the axes of the tensor: axis `i` of the result is axis
    /// `axes[i]` of `self`.
    pub fn permute_axes(&self, axes: &[usize]) -> anyhow::Result<Tensor> {
        ensure!(
            axes.len() == self.rank() && (0..self.rank()).all(|ax| axes.contains(&ax)),
            "Invalid permutation {:?} for tensor of rank {}",
            axes,
            self.rank()
        );
        dispatch_datum!(Self::permute_axes_t(self.datum_type())(self, axes))
    }

    fn cast_to_t<T: Datum + ToPrimitive>(&self, dt: DatumType) -> anyhow::Result<Tensor> {
        let view = self.to_array_view::<T>()?;
        let casted: Tensor = match dt {
            DatumType::U8 => view.map(|x| x.to_u8().unwrap_or_default()).into(),
            DatumType::I32 => view.map(|x| x.to_i32().unwrap_or_default()).into(),
            DatumType::I64 => view.map(|x| x.to_i64().unwrap_or_default()).into(),
            DatumType::F32 => view.map(|x| x.to_f32().unwrap_or_default()).into(),
            DatumType::F64 => view.map(|x| x.to_f64().unwrap_or_default()).into(),
            DatumType::Bool => bail!("Can not cast {:?} to {:?}", self.datum_type(), dt),
        };
        Ok(casted)
    }

    /// Numeric conversion between number types.
    pub fn cast_to_dt(&self, dt: DatumType) -> anyhow::Result<Tensor> {
        if self.datum_type() == dt {
            return Ok(self.clone());
        }
        dispatch_numbers!(Self::cast_to_t(self.datum_type())(self, dt))
    }
}

impl<T: Datum> From<ArrayD<T>> for Tensor {
    fn from(array: ArrayD<T>) -> Tensor {
        let array = if array.is_standard_layout() {
            array
        } else {
            array.as_standard_layout().into_owned()
        };
        Tensor { data: T::wrap(array) }
    }
}

pub trait IntoArcTensor {
    fn into_arc_tensor(self) -> Arc<Tensor>;
}

impl IntoArcTensor for Tensor {
    fn into_arc_tensor(self) -> Arc<Tensor> {
        Arc::new(self)
    }
}

impl IntoArcTensor for Arc<Tensor> {
    fn into_arc_tensor(self) -> Arc<Tensor> {
        self
    }
}

impl<T: Datum> IntoArcTensor for ArrayD<T> {
    fn into_arc_tensor(self) -> Arc<Tensor> {
        Arc::new(self.into())
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{},{:?}", self.shape().iter().join(","), self.datum_type())?;
        if self.len() <= 12 {
            let values = match &self.data {
                TensorData::Bool(a) => a.iter().join(", "),
                TensorData::U8(a) => a.iter().join(", "),
                TensorData::I32(a) => a.iter().join(", "),
                TensorData::I64(a) => a.iter().join(", "),
                TensorData::F32(a) => a.iter().join(", "),
                TensorData::F64(a) => a.iter().join(", "),
            };
            write!(fmt, " {values}")?;
        }
        Ok(())
    }
}
