mod constants;
mod sort_order;
mod type_utils;

pub use constants::*;
pub use sort_order::*;
pub use type_utils::*;
