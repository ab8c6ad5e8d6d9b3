mod data_formats;

pub use self::data_formats::{BaseDataShape, DataFormat};
