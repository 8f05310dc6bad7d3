pub mod definition;
pub mod events;
pub mod models;
pub mod params;
pub mod registry;
pub mod result;
pub mod traits;

pub use definition::*;
pub use events::*;
pub use models::*;
pub use params::*;
pub use registry::*;
pub use result::*;
pub use traits::*;
