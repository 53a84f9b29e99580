pub mod cell;
pub mod color;
pub mod config;
pub mod decode;
pub mod error;
pub mod grid;
pub mod log;
pub mod pipeline;
pub mod render;

mod parse_util;

pub use error::Error;
pub use error::Result;

pub type CellCoord = i64;
