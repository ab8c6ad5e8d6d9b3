//! Partial information about tensors: element type and shape, each of them
//! possibly unknown.
use crate::datum::DatumType;
use crate::TVec;
use anyhow::bail;
use itertools::Itertools;
use std::fmt;

/// Partial information about any value.
pub trait Factoid: fmt::Debug + Clone + PartialEq + Default {
    type Concrete: fmt::Debug;

    /// Tries to transform the fact into a concrete value.
    fn concretize(&self) -> Option<Self::Concrete>;

    /// Tries to unify the fact with another fact of the same type.
    fn unify(&self, other: &Self) -> anyhow::Result<Self>;
}

/// Partial information about a value of type T.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub enum GenericFactoid<T: fmt::Debug + Clone + PartialEq> {
    Only(T),
    #[default]
    Any,
}

impl<T: Copy + Clone + fmt::Debug + PartialEq> Copy for GenericFactoid<T> {}

impl<T: fmt::Debug + Clone + PartialEq> Factoid for GenericFactoid<T> {
    type Concrete = T;

    fn concretize(&self) -> Option<T> {
        match self {
            GenericFactoid::Any => None,
            GenericFactoid::Only(m) => Some(m.clone()),
        }
    }

    fn unify(&self, other: &Self) -> anyhow::Result<Self> {
        let fact = match (self, other) {
            (_, GenericFactoid::Any) => self.clone(),
            (GenericFactoid::Any, _) => other.clone(),
            _ if self == other => self.clone(),
            _ => bail!("Impossible to unify {:?} with {:?}.", self, other),
        };
        Ok(fact)
    }
}

impl<T: fmt::Debug + Clone + PartialEq> From<T> for GenericFactoid<T> {
    fn from(t: T) -> Self {
        GenericFactoid::Only(t)
    }
}

impl<T: fmt::Debug + Clone + PartialEq> fmt::Debug for GenericFactoid<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GenericFactoid::Any => write!(formatter, "?"),
            GenericFactoid::Only(u) => write!(formatter, "{u:?}"),
        }
    }
}

/// Partial information about a dimension.
pub type DimFact = GenericFactoid<usize>;

/// Partial information about an element type.
pub type TypeFactoid = GenericFactoid<DatumType>;

/// Partial information about a shape.
///
/// A closed shape has a known rank, and each of its dimensions may or may
/// not be known. An open shape has an unknown rank: its dimensions are the
/// known prefix of the shape, if any.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ShapeFactoid {
    open: bool,
    dims: TVec<DimFact>,
}

impl ShapeFactoid {
    /// Constructs an open shape fact.
    pub fn open(dims: TVec<DimFact>) -> ShapeFactoid {
        ShapeFactoid { open: true, dims }
    }

    /// Constructs a closed shape fact.
    pub fn closed(dims: TVec<DimFact>) -> ShapeFactoid {
        ShapeFactoid { open: false, dims }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Rank of the shape, when it is statically known.
    pub fn rank(&self) -> GenericFactoid<usize> {
        if self.open { GenericFactoid::Any } else { GenericFactoid::Only(self.dims.len()) }
    }

    pub fn dim(&self, i: usize) -> Option<DimFact> {
        self.dims.get(i).copied()
    }

    /// Known dimensions of the shape (the known prefix for an open shape).
    pub fn dims(&self) -> impl Iterator<Item = &DimFact> {
        self.dims.iter()
    }
}

impl Factoid for ShapeFactoid {
    type Concrete = TVec<usize>;

    fn concretize(&self) -> Option<TVec<usize>> {
        if self.open {
            return None;
        }
        self.dims.iter().map(|d| d.concretize()).collect()
    }

    fn unify(&self, other: &Self) -> anyhow::Result<Self> {
        let (x, y) = (self, other);
        if !x.open && !y.open && x.dims.len() != y.dims.len() {
            bail!("Impossible to unify closed shapes of different rank (found {:?} and {:?}).", x, y)
        }
        if x.open && !y.open && x.dims.len() > y.dims.len() {
            bail!("Impossible to unify {:?} with {:?}: rank is too small.", x, y)
        }
        if y.open && !x.open && y.dims.len() > x.dims.len() {
            bail!("Impossible to unify {:?} with {:?}: rank is too small.", y, x)
        }
        let dimensions: TVec<DimFact> = x
            .dims
            .iter()
            .zip_longest(y.dims.iter())
            .map(|pair| match pair {
                itertools::EitherOrBoth::Both(a, b) => a.unify(b),
                itertools::EitherOrBoth::Left(d) | itertools::EitherOrBoth::Right(d) => Ok(*d),
            })
            .collect::<anyhow::Result<_>>()?;
        if x.open && y.open {
            Ok(ShapeFactoid::open(dimensions))
        } else {
            Ok(ShapeFactoid::closed(dimensions))
        }
    }
}

impl Default for ShapeFactoid {
    /// Returns the most general shape fact possible.
    fn default() -> ShapeFactoid {
        ShapeFactoid::open(tvec![])
    }
}

impl FromIterator<usize> for ShapeFactoid {
    /// Converts an iterator over usize into a closed shape.
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> ShapeFactoid {
        ShapeFactoid::closed(iter.into_iter().map(GenericFactoid::Only).collect())
    }
}

impl FromIterator<DimFact> for ShapeFactoid {
    /// Converts an iterator over dimension facts into a closed shape.
    fn from_iter<I: IntoIterator<Item = DimFact>>(iter: I) -> ShapeFactoid {
        ShapeFactoid::closed(iter.into_iter().collect())
    }
}

impl From<&[usize]> for ShapeFactoid {
    fn from(d: &[usize]) -> ShapeFactoid {
        d.iter().copied().collect()
    }
}

impl<const N: usize> From<[usize; N]> for ShapeFactoid {
    fn from(d: [usize; N]) -> ShapeFactoid {
        d.into_iter().collect()
    }
}

impl From<TVec<usize>> for ShapeFactoid {
    fn from(d: TVec<usize>) -> ShapeFactoid {
        d.into_iter().collect()
    }
}

impl fmt::Debug for ShapeFactoid {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{}", self.dims.iter().map(|d| format!("{d:?}")).join(","))?;
        if self.open {
            if self.dims.is_empty() {
                write!(formatter, "..")?;
            } else {
                write!(formatter, ",..")?;
            }
        }
        Ok(())
    }
}
