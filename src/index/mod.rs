pub mod codec;
pub mod memory;
pub mod posting;
pub mod writer;
