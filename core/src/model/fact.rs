//! Partial tensor types representations.
use crate::internal::*;

/// Partial information about a tensor.
///
/// Every outlet in a graph is tagged with what is known about the tensors
/// flowing through it: element type and shape. Both may be partially known
/// (for instance, a tensor of rank 4 with an unknown batch dimension, or a
/// tensor of unknown rank).
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct InferenceFact {
    pub datum_type: TypeFactoid,
    pub shape: ShapeFactoid,
}

impl InferenceFact {
    /// Constructs the most general tensor fact possible.
    pub fn new() -> InferenceFact {
        InferenceFact::default()
    }

    pub fn any() -> InferenceFact {
        InferenceFact::default()
    }

    pub fn dt(dt: DatumType) -> InferenceFact {
        InferenceFact::default().with_datum_type(dt)
    }

    pub fn dt_shape<S: Into<ShapeFactoid>>(dt: DatumType, shape: S) -> InferenceFact {
        InferenceFact::dt(dt).with_shape(shape)
    }

    pub fn shape<S: Into<ShapeFactoid>>(shape: S) -> InferenceFact {
        InferenceFact::default().with_shape(shape)
    }

    pub fn with_datum_type(self, dt: DatumType) -> InferenceFact {
        InferenceFact { datum_type: dt.into(), ..self }
    }

    pub fn with_shape<S: Into<ShapeFactoid>>(self, shape: S) -> InferenceFact {
        InferenceFact { shape: shape.into(), ..self }
    }

    pub fn rank(&self) -> GenericFactoid<usize> {
        self.shape.rank()
    }

    /// Checks that a tensor is compatible with the fact.
    pub fn matches(&self, t: &Tensor) -> bool {
        self.unify(&InferenceFact::from(t)).is_ok()
    }

    /// Checks that two facts may describe the same tensor.
    pub fn compatible_with(&self, other: &InferenceFact) -> bool {
        self.unify(other).is_ok()
    }

    pub fn format_dt_shape(&self) -> String {
        let dt = self.datum_type.concretize().map(|dt| format!("{dt:?}")).unwrap_or("?".to_string());
        if !self.shape.is_open() && self.shape.dims().next().is_none() {
            dt
        } else {
            format!("{:?},{}", self.shape, dt)
        }
    }
}

impl Factoid for InferenceFact {
    type Concrete = (DatumType, TVec<usize>);

    fn concretize(&self) -> Option<Self::Concrete> {
        Some((self.datum_type.concretize()?, self.shape.concretize()?))
    }

    fn unify(&self, other: &Self) -> ChanlastResult<Self> {
        let fact = InferenceFact {
            datum_type: self.datum_type.unify(&other.datum_type)?,
            shape: self.shape.unify(&other.shape)?,
        };
        trace!("Unifying {self:?} with {other:?} into {fact:?}.");
        Ok(fact)
    }
}

impl<'a> From<&'a Tensor> for InferenceFact {
    fn from(t: &'a Tensor) -> InferenceFact {
        InferenceFact::dt_shape(t.datum_type(), t.shape())
    }
}

impl fmt::Debug for InferenceFact {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{}", self.format_dt_shape())
    }
}

/// Shortcut to build facts out of element types: `f32::fact([1, 3, 8, 8])`.
pub trait DatumExt {
    fn fact<S: Into<ShapeFactoid>>(shape: S) -> InferenceFact;
}

impl<T: Datum> DatumExt for T {
    fn fact<S: Into<ShapeFactoid>>(shape: S) -> InferenceFact {
        InferenceFact::dt_shape(T::datum_type(), shape)
    }
}
