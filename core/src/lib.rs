//! # chanlast
//!
//! Graph rewriting passes moving convolution and pooling operators from
//! channel-first layout (NCHW, NCDHW) to channel-last layout (NHWC, NDHWC),
//! without changing the layout the rest of the graph sees.
//!
//! Each matched operator is surrounded by explicit transposes: its inputs
//! are permuted to channel-last, the operator is rebuilt to work in
//! channel-last with a permuted declared output shape, and every output is
//! permuted back to channel-first before it reaches the original consumers.
//!
//! ## Example
//!
//! ```
//! use chanlast_core::internal::*;
//! use chanlast_core::ops::cnn::{Conv, PoolSpec};
//!
//! let mut model = Model::default();
//! let input = model.add_source("input", f32::fact([1, 3, 8, 8])).unwrap();
//! let weights = model.add_const("weights", Tensor::zero::<f32>(&[16, 3, 3, 3])).unwrap();
//! let conv = Conv::new(PoolSpec::nchw(tvec!(3, 3)), Default::default());
//! let conv = model.wire_node("conv", conv, &[input, weights]).unwrap();
//! model.set_output_outlets(&conv).unwrap();
//!
//! let rewritten = ConvertLayout::default().run(&mut model).unwrap();
//! assert_eq!(rewritten, 1);
//! assert_eq!(model.node_by_name("conv").unwrap().op.name(), "Transpose");
//! ```

#[macro_use]
extern crate derive_new;
#[macro_use]
extern crate log;

pub mod layout;
pub mod model;
pub mod ops;
pub mod plan;
pub mod transform;

pub use chanlast_data;

pub mod prelude {
    pub use crate::layout::{ConvertLayout, LayoutRule};
    pub use crate::model::{DatumExt, InferenceFact, InletId, Model, ModelPatch, Node, OutletId};
    pub use crate::plan::SimplePlan;
    pub use crate::transform::ModelTransform;
    pub use chanlast_data::prelude::*;
}

pub mod internal {
    pub use crate::model::*;
    pub use crate::ops::{Op, OpKind, TypedOp};
    pub use crate::prelude::*;
    pub use chanlast_data::internal::*;
}

#[cfg(test)]
#[allow(dead_code)]
fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("CHANLAST_LOG").try_init();
}
