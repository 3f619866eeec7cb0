//! Processing nodes

mod concat;
mod forward;

pub use concat::ConcatNode;
pub use forward::ForwardNode;
