pub mod error;
pub mod fetch;
pub mod limits;
pub mod traits;
pub mod types;

pub use error::*;
pub use fetch::*;
pub use limits::*;
pub use traits::*;
pub use types::*;
