//! Wire models for the WeCom API

mod message;
mod token;

pub use message::*;
pub use token::*;
