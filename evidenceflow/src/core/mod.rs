//! Property metadata and stage result records.

mod properties;
mod result;

pub use properties::{meta_of_type, PropertyMap, PropertyMeta};
pub use result::{PropertyValue, StageResult};
