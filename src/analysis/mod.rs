mod error;
mod codec;
mod mismatch;
mod matrix;
mod primers;
mod tail_index;
mod jmer_index;
mod alignment;
mod types;
mod screener;

pub use error::*;
pub use codec::*;
pub use mismatch::*;
pub use matrix::*;
pub use primers::*;
pub use tail_index::*;
pub use jmer_index::*;
pub use alignment::*;
pub use types::*;
pub use screener::*;
