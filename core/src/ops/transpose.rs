use crate::internal::*;
use crate::ops::check_input_arity;

/// Reorders the axes of its input: axis `i` of the output is axis `perm[i]`
/// of the input.
#[derive(Debug, Clone, new, PartialEq, Eq, Hash)]
pub struct Transpose {
    pub perm: TVec<usize>,
}

impl Transpose {
    pub fn rank(&self) -> usize {
        self.perm.len()
    }

    fn check_perm(&self) -> ChanlastResult<()> {
        let mut sorted = self.perm.clone();
        sorted.sort_unstable();
        ensure!(
            sorted.iter().enumerate().all(|(ix, ax)| ix == *ax),
            "{:?} is not a permutation",
            self.perm
        );
        Ok(())
    }
}

impl TypedOp for Transpose {
    fn name(&self) -> Cow<'_, str> {
        "Transpose".into()
    }

    fn info(&self) -> ChanlastResult<Vec<String>> {
        Ok(vec![format!("perm: {:?}", self.perm)])
    }

    fn output_facts(&self, inputs: &[&InferenceFact]) -> ChanlastResult<TVec<InferenceFact>> {
        check_input_arity(inputs, 1..=1)?;
        self.check_perm()?;
        let input = inputs[0];
        let shape: ShapeFactoid = match input.rank() {
            GenericFactoid::Only(rank) => {
                ensure!(
                    rank == self.rank(),
                    "Transposing a rank {} input with {:?}",
                    rank,
                    self.perm
                );
                let dims: TVec<DimFact> = input.shape.dims().copied().collect();
                self.perm.iter().map(|ax| dims[*ax]).collect()
            }
            GenericFactoid::Any => ShapeFactoid::closed(tvec!(DimFact::default(); self.rank())),
        };
        Ok(tvec!(InferenceFact { datum_type: input.datum_type, shape }))
    }

    fn eval(&self, inputs: TVec<Arc<Tensor>>) -> ChanlastResult<TVec<Arc<Tensor>>> {
        check_input_arity(&inputs, 1..=1)?;
        Ok(tvec!(inputs[0].permute_axes(&self.perm)?.into_arc_tensor()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facts() {
        let op = Transpose::new(tvec!(0, 2, 3, 1));
        let input = f32::fact(shapefactoid![1, 3, _, 8]);
        let output = op.output_facts(&[&input]).unwrap();
        assert_eq!(output[0], f32::fact(shapefactoid![1, _, 8, 3]));
    }

    #[test]
    fn facts_unknown_rank() {
        let op = Transpose::new(tvec!(0, 2, 1));
        let output = op.output_facts(&[&InferenceFact::dt(DatumType::F32)]).unwrap();
        assert_eq!(output[0], f32::fact(shapefactoid![_, _, _]));
    }

    #[test]
    fn facts_rank_mismatch() {
        let op = Transpose::new(tvec!(0, 2, 1));
        assert!(op.output_facts(&[&f32::fact([1, 2, 3, 4])]).is_err());
        let op = Transpose::new(tvec!(0, 0, 1));
        assert!(op.output_facts(&[&f32::fact([1, 2, 3])]).is_err());
    }

    #[test]
    fn eval() {
        let input = Tensor::from_shape(&[2, 3], &[0i32, 1, 2, 3, 4, 5]).unwrap();
        let output = Transpose::new(tvec!(1, 0)).eval(tvec!(input.into_arc_tensor())).unwrap();
        assert_eq!(*output[0], Tensor::from_shape(&[3, 2], &[0i32, 3, 1, 4, 2, 5]).unwrap());
    }
}
