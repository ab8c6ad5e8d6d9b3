//! ## Models and their lifecycle
//!
//! A `Model` is a graph of `Node`s, each of them carrying an `Op` and tagging
//! each of its outputs with an `InferenceFact`: what is known of the element
//! type and shape of the tensors flowing through it.
//!
//! Models are built with `add_source`, `add_const` and `wire_node`, then
//! altered in place by `ModelPatch`es. The `Rewriter` drives local rewriting
//! rules over a model, applies the patches they produce and compacts the
//! model when it is done.
use crate::internal::*;

mod fact;
mod graph;
mod node;
pub mod order;
mod patch;
mod rewriter;
mod rt_info;

pub use self::fact::*;
pub use self::graph::*;
pub use self::node::*;
pub use self::order::eval_order;
pub use self::patch::ModelPatch;
pub use self::rewriter::Rewriter;
pub use self::rt_info::{copy_runtime_info, RuntimeInfo};
