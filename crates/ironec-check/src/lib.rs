pub mod narrow;

#[cfg(test)]
pub(crate) mod testkit;

pub use narrow::{narrow_pou, NarrowError, Narrower};
