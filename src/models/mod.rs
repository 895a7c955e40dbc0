pub mod projects;
pub mod taxonomy;
pub mod work;

pub use projects::*;
pub use taxonomy::*;
pub use work::*;
