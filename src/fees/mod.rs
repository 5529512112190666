// Fee allocation for procedures

pub mod allocator;

pub use allocator::{allocate, AllocationError, FeeSplit};
