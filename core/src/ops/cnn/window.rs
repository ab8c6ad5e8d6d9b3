use crate::internal::*;
use crate::ops::cnn::PoolSpec;
use ndarray::indices;
use ndarray::prelude::*;

/// Concrete sliding window geometry over the spatial axes of an input.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowGeometry {
    pub input_hw: TVec<usize>,
    pub output_hw: TVec<usize>,
    pub kernel: TVec<usize>,
    pub strides: TVec<usize>,
    pub dilations: TVec<usize>,
    pub pad_before: TVec<usize>,
    pub pad_after: TVec<usize>,
}

/// Where a kernel position lands in the input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tap<'a> {
    /// A valid input position.
    Input(&'a [usize]),
    /// In the padding area around the input.
    Padding,
    /// Beyond the padded input (ceil rounding can produce such windows).
    Outside,
}

impl WindowGeometry {
    pub fn new(spec: &PoolSpec, input_hw: &[usize]) -> ChanlastResult<WindowGeometry> {
        let computed = spec.computed_padding(input_hw)?;
        Ok(WindowGeometry {
            input_hw: input_hw.into(),
            output_hw: computed.iter().map(|d| d.output).collect(),
            kernel: spec.kernel_shape.clone(),
            strides: spec.strides().iter().copied().collect(),
            dilations: spec.dilations().iter().copied().collect(),
            pad_before: computed.iter().map(|d| d.pad_before).collect(),
            pad_after: computed.iter().map(|d| d.pad_after).collect(),
        })
    }

    /// Calls `f` for each kernel position of the window producing the output
    /// at spatial coordinates `output`, in row-major kernel order.
    pub fn visit(&self, output: &[usize], mut f: impl FnMut(&[usize], Tap)) {
        let mut input = tvec!(0; self.input_hw.len());
        for k in indices(&*self.kernel) {
            let k = k.slice();
            let mut tap = 0u8;
            for axis in 0..k.len() {
                let padded = output[axis] * self.strides[axis] + k[axis] * self.dilations[axis];
                let x = padded as isize - self.pad_before[axis] as isize;
                if padded >= self.input_hw[axis] + self.pad_before[axis] + self.pad_after[axis] {
                    tap = tap.max(2);
                } else if x < 0 || x as usize >= self.input_hw[axis] {
                    tap = tap.max(1);
                } else {
                    input[axis] = x as usize;
                }
            }
            let tap = match tap {
                0 => Tap::Input(&input),
                1 => Tap::Padding,
                _ => Tap::Outside,
            };
            f(k, tap);
        }
    }
}
