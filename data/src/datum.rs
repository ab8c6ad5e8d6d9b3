//! Element types.
use crate::tensor::{Tensor, TensorData};
use ndarray::{ArrayD, ArrayViewD};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum DatumType {
    Bool,
    U8,
    I32,
    I64,
    F32,
    F64,
}

impl DatumType {
    pub fn is_float(&self) -> bool {
        matches!(self, DatumType::F32 | DatumType::F64)
    }

    #[inline]
    pub fn size_of(&self) -> usize {
        dispatch_datum!(std::mem::size_of(self)())
    }
}

impl fmt::Display for DatumType {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{self:?}")
    }
}

impl std::str::FromStr for DatumType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "I32" | "i32" => Ok(DatumType::I32),
            "I64" | "i64" => Ok(DatumType::I64),
            "U8" | "u8" => Ok(DatumType::U8),
            "F32" | "f32" => Ok(DatumType::F32),
            "F64" | "f64" => Ok(DatumType::F64),
            "Bool" | "bool" => Ok(DatumType::Bool),
            _ => anyhow::bail!("Unknown type {}", s),
        }
    }
}

pub trait Datum:
    Clone + Copy + Send + Sync + fmt::Debug + fmt::Display + Default + 'static + PartialEq
{
    fn name() -> &'static str;
    fn datum_type() -> DatumType;

    #[doc(hidden)]
    fn wrap(array: ArrayD<Self>) -> TensorData;
    #[doc(hidden)]
    fn view(data: &TensorData) -> Option<ArrayViewD<'_, Self>>;
}

macro_rules! datum {
    ($t:ty, $v:ident) => {
        impl From<$t> for Tensor {
            fn from(it: $t) -> Tensor {
                crate::tensor::litteral::tensor0(it)
            }
        }

        impl Datum for $t {
            fn name() -> &'static str {
                stringify!($t)
            }

            fn datum_type() -> DatumType {
                DatumType::$v
            }

            fn wrap(array: ArrayD<Self>) -> TensorData {
                TensorData::$v(array)
            }

            fn view(data: &TensorData) -> Option<ArrayViewD<'_, Self>> {
                match data {
                    TensorData::$v(array) => Some(array.view()),
                    _ => None,
                }
            }
        }
    };
}

datum!(bool, Bool);
datum!(u8, U8);
datum!(i32, I32);
datum!(i64, I64);
datum!(f32, F32);
datum!(f64, F64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(DatumType::F32.size_of(), 4);
        assert_eq!(DatumType::I64.size_of(), 8);
        assert_eq!(DatumType::Bool.size_of(), 1);
    }

    #[test]
    fn parse() {
        assert_eq!("i64".parse::<DatumType>().unwrap(), DatumType::I64);
        assert!("f16".parse::<DatumType>().is_err());
    }
}
