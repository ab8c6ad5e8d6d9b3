use super::Tensor;
use crate::datum::Datum;
use ndarray::*;

pub fn tensor0<A: Datum>(x: A) -> Tensor {
    Tensor::from(arr0(x).into_dyn())
}

pub fn tensor1<A: Datum>(xs: &[A]) -> Tensor {
    Tensor::from(arr1(xs).into_dyn())
}
