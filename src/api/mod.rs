//! WeCom server API

pub mod client;
mod message;

pub use client::WeComClient;
pub use message::send_text;
