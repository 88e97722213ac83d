mod money;
mod receipt;
mod reference;

pub use money::*;
pub use receipt::*;
pub use reference::*;
