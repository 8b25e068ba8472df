//! Program tree definitions

mod expr;
mod span;

pub use expr::*;
pub use span::*;
