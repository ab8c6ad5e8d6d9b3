#[macro_use]
mod macros;

/// A Smallvec instantiation with 4 embeddable values.
///
/// Used about everywhere, for node inputs and outputs, tensor dimensions or
/// axis permutations.
pub type TVec<T> = smallvec::SmallVec<[T; 4]>;

pub mod prelude {
    pub use crate::datum::{Datum, DatumType};
    pub use crate::factoid::{DimFact, Factoid, GenericFactoid, ShapeFactoid, TypeFactoid};
    pub use crate::tensor::litteral::*;
    pub use crate::tensor::{IntoArcTensor, Tensor};
    pub use crate::TVec;
    pub use crate::{dimfact, dispatch_datum, dispatch_floatlike, dispatch_numbers, shapefactoid, tvec};
}

pub mod internal {
    pub use crate::prelude::*;
    pub use crate::tensor::TensorData;
    pub use anyhow::{
        anyhow, bail, ensure, format_err, Context as ChanlastErrorContext, Error as ChanlastError,
        Result as ChanlastResult,
    };
    pub use ndarray;
    pub use smallvec;
    pub use std::borrow::Cow;
    pub use std::collections::HashMap;
    pub use std::fmt;
    pub use std::sync::Arc;
}

pub use anyhow;

mod datum;
mod factoid;
mod tensor;
