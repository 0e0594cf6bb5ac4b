//! Element types, index masks and virtual arrays shared by fields and procedures.

mod data_type;
mod index_mask;
mod varray;

pub use data_type::{DataType, Value};
pub use index_mask::{IndexMask, MaskIter};
pub use varray::VArray;
