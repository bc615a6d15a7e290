pub mod generation;
pub mod identity;

pub use generation::*;
pub use identity::*;
