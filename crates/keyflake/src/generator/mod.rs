mod atomic;
mod cached;
mod dispatch;
mod interface;
mod lock;
mod mutex;
mod state;
mod status;

pub use atomic::*;
pub use cached::*;
pub use dispatch::*;
pub use interface::*;
pub use lock::*;
pub(crate) use mutex::*;
pub use state::*;
pub use status::*;
