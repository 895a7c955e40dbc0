pub mod caller;
pub mod permissions;

pub use caller::*;
pub use permissions::*;
