mod bit_layout;
mod decode;

pub use bit_layout::*;
pub use decode::*;
