mod argument;
mod flags;
mod provider;
mod slot;

pub use argument::*;
pub use flags::*;
pub use provider::*;
pub use slot::*;
