pub mod indicator;
pub mod models;
pub mod traits;

pub use indicator::*;
pub use models::*;
pub use traits::*;
