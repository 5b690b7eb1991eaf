mod arity;
#[allow(clippy::module_inception)]
mod initializer;
mod settings;
pub(crate) mod state;

pub use arity::*;
pub use initializer::*;
pub use settings::*;
pub use state::InitState;
