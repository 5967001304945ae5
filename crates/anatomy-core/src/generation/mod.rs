//! Generation - spawning bodies, organs and tools from catalog prototypes

mod body;
mod tools;

pub use body::*;
pub use tools::*;
