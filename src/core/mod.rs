pub mod batch_index;
pub mod clip;
pub mod config;
pub mod error;
pub mod event;


pub use batch_index::*;
pub use clip::*;
pub use config::*;
pub use error::*;
pub use event::*;
