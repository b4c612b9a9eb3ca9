pub mod liftover;
pub mod locus;
pub mod xpos;

mod error;

pub use error::{Error, Result};
