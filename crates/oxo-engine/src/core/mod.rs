pub use self::{board::*, symmetry::*};

pub(crate) mod board;
pub(crate) mod symmetry;
