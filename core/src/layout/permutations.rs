//! Axis permutations between channel-first and channel-last layouts.
use crate::internal::*;

const TO_CHANNEL_LAST_4D: [usize; 4] = [0, 2, 3, 1];
const TO_CHANNEL_FIRST_4D: [usize; 4] = [0, 3, 1, 2];
const TO_CHANNEL_LAST_5D: [usize; 5] = [0, 2, 3, 4, 1];
const TO_CHANNEL_FIRST_5D: [usize; 5] = [0, 4, 1, 2, 3];

/// Layout permutations only exist for 4D and 5D tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedRank(pub usize);

impl fmt::Display for UnsupportedRank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "No layout permutation for rank {}, expected 4 or 5", self.0)
    }
}

impl std::error::Error for UnsupportedRank {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// NCHW to NHWC, NCDHW to NDHWC.
    ToChannelLast,
    /// NHWC to NCHW, NDHWC to NCDHW.
    ToChannelFirst,
}

impl Direction {
    pub fn inverse(&self) -> Direction {
        match self {
            Direction::ToChannelLast => Direction::ToChannelFirst,
            Direction::ToChannelFirst => Direction::ToChannelLast,
        }
    }
}

pub fn to_channel_last(rank: usize) -> Result<&'static [usize], UnsupportedRank> {
    match rank {
        4 => Ok(&TO_CHANNEL_LAST_4D),
        5 => Ok(&TO_CHANNEL_LAST_5D),
        _ => Err(UnsupportedRank(rank)),
    }
}

pub fn to_channel_first(rank: usize) -> Result<&'static [usize], UnsupportedRank> {
    match rank {
        4 => Ok(&TO_CHANNEL_FIRST_4D),
        5 => Ok(&TO_CHANNEL_FIRST_5D),
        _ => Err(UnsupportedRank(rank)),
    }
}

pub fn permutation(rank: usize, direction: Direction) -> Result<&'static [usize], UnsupportedRank> {
    match direction {
        Direction::ToChannelLast => to_channel_last(rank),
        Direction::ToChannelFirst => to_channel_first(rank),
    }
}

/// Reorders `values`: item `i` of the result is `values[perm[i]]`.
pub fn permute<T: Clone>(values: &[T], perm: &[usize]) -> ChanlastResult<TVec<T>> {
    ensure!(values.len() == perm.len(), "Permuting {} values with {:?}", values.len(), perm);
    perm.iter()
        .map(|&ax| values.get(ax).cloned().with_context(|| format!("Invalid permutation {perm:?}")))
        .collect()
}

pub fn inverse(perm: &[usize]) -> TVec<usize> {
    let mut inverse = tvec!(0; perm.len());
    for (ix, &ax) in perm.iter().enumerate() {
        inverse[ax] = ix;
    }
    inverse
}

/// Permutes a partially known shape. `Any` dimensions stay unknown.
pub fn permute_shape(shape: &ShapeFactoid, perm: &[usize]) -> ChanlastResult<ShapeFactoid> {
    ensure!(
        shape.rank() == GenericFactoid::Only(perm.len()),
        "Permuting shape {:?} with {:?}",
        shape,
        perm
    );
    let dims: TVec<DimFact> = shape.dims().copied().collect();
    Ok(ShapeFactoid::closed(permute(&dims, perm)?))
}

/// Shape of the first output of `node` once moved to channel-last layout.
pub fn permuted_output_shape(node: &Node, rank: usize) -> ChanlastResult<ShapeFactoid> {
    let perm = to_channel_last(rank)?;
    let fact = node.outputs.first().map(|o| &o.fact).with_context(|| format!("{node} has no output"))?;
    ensure!(
        fact.rank() == GenericFactoid::Only(rank),
        "Expected a rank {} output for {}, got {:?}",
        rank,
        node,
        fact.shape
    );
    permute_shape(&fact.shape, perm)
}
