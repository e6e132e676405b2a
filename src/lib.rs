#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod client;
pub mod error;
pub mod status;
pub mod ws;

pub use client::Client;
pub use status::Status;

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;
