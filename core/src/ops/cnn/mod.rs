//! Convolution and pooling operators, and the window geometry they share.
pub mod avgpool;
pub mod conv;
pub mod maxpool;
mod padding;
pub mod pools;
mod window;

pub use self::avgpool::AvgPool;
pub use self::conv::{Conv, KernelFormat};
pub use self::maxpool::{MaxPool, MaxPoolV8};
pub use self::padding::{ComputedPaddedDim, PaddingSpec};
pub use self::pools::{AutoPad, PoolSpec, RoundingType};
pub use self::window::{Tap, WindowGeometry};
