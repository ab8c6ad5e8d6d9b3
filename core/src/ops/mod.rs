//! Ops
use crate::internal::*;

pub mod cnn;
pub mod element_wise;
pub mod konst;
pub mod nn;
pub mod source;
pub mod transpose;

pub use self::cnn::{AvgPool, Conv, MaxPool, MaxPoolV8};
pub use self::element_wise::ElementWiseOp;
pub use self::konst::Const;
pub use self::source::TypedSource;
pub use self::transpose::Transpose;

/// Behaviour every operator provides: naming, fact inference and
/// evaluation.
pub trait TypedOp: fmt::Debug + Clone + PartialEq + Into<Op> {
    /// Vernacular name of the op.
    fn name(&self) -> Cow<'_, str>;

    /// Short (one-line) strings giving hints on internal implementation or
    /// important configuration details to be displayed in dumps.
    fn info(&self) -> ChanlastResult<Vec<String>> {
        Ok(vec![])
    }

    fn nboutputs(&self) -> usize {
        1
    }

    /// Deduce output facts from input facts.
    fn output_facts(&self, inputs: &[&InferenceFact]) -> ChanlastResult<TVec<InferenceFact>>;

    fn eval(&self, inputs: TVec<Arc<Tensor>>) -> ChanlastResult<TVec<Arc<Tensor>>>;
}

/// Tag of an operator variant, used to dispatch rewriting rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Source,
    Const,
    Transpose,
    ElementWise,
    Conv,
    MaxPool,
    MaxPoolV8,
    AvgPool,
}

/// The closed set of operators a Model can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Source(TypedSource),
    Const(Const),
    Transpose(Transpose),
    ElementWise(ElementWiseOp),
    Conv(Conv),
    MaxPool(MaxPool),
    MaxPoolV8(MaxPoolV8),
    AvgPool(AvgPool),
}

macro_rules! dispatch_op {
    ($self: expr, $op: ident => $e: expr) => {
        match $self {
            Op::Source($op) => $e,
            Op::Const($op) => $e,
            Op::Transpose($op) => $e,
            Op::ElementWise($op) => $e,
            Op::Conv($op) => $e,
            Op::MaxPool($op) => $e,
            Op::MaxPoolV8($op) => $e,
            Op::AvgPool($op) => $e,
        }
    };
}

macro_rules! op_from {
    ($($variant: ident($op: ty)),*) => {
        $(
            impl From<$op> for Op {
                fn from(op: $op) -> Op {
                    Op::$variant(op)
                }
            }
        )*
    };
}

op_from!(
    Source(TypedSource),
    Const(Const),
    Transpose(Transpose),
    ElementWise(ElementWiseOp),
    Conv(Conv),
    MaxPool(MaxPool),
    MaxPoolV8(MaxPoolV8),
    AvgPool(AvgPool)
);

impl Op {
    pub fn kind(&self) -> OpKind {
        match self {
            Op::Source(_) => OpKind::Source,
            Op::Const(_) => OpKind::Const,
            Op::Transpose(_) => OpKind::Transpose,
            Op::ElementWise(_) => OpKind::ElementWise,
            Op::Conv(_) => OpKind::Conv,
            Op::MaxPool(_) => OpKind::MaxPool,
            Op::MaxPoolV8(_) => OpKind::MaxPoolV8,
            Op::AvgPool(_) => OpKind::AvgPool,
        }
    }

    pub fn name(&self) -> Cow<'_, str> {
        dispatch_op!(self, op => op.name())
    }

    pub fn info(&self) -> ChanlastResult<Vec<String>> {
        dispatch_op!(self, op => op.info())
    }

    pub fn nboutputs(&self) -> usize {
        dispatch_op!(self, op => op.nboutputs())
    }

    pub fn output_facts(&self, inputs: &[&InferenceFact]) -> ChanlastResult<TVec<InferenceFact>> {
        let facts = dispatch_op!(self, op => op.output_facts(inputs))?;
        ensure!(
            facts.len() == self.nboutputs(),
            "{} inferred {} facts for {} outputs",
            self,
            facts.len(),
            self.nboutputs()
        );
        Ok(facts)
    }

    pub fn eval(&self, inputs: TVec<Arc<Tensor>>) -> ChanlastResult<TVec<Arc<Tensor>>> {
        dispatch_op!(self, op => op.eval(inputs))
    }
}

impl fmt::Display for Op {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.name())
    }
}

/// Checks the number of inputs an op receives.
pub fn check_input_arity(inputs: &[impl fmt::Debug], expected: std::ops::RangeInclusive<usize>) -> ChanlastResult<()> {
    if !expected.contains(&inputs.len()) {
        bail!("Wrong input number. Op expects {:?}, got {}.", expected, inputs.len())
    } else {
        Ok(())
    }
}
