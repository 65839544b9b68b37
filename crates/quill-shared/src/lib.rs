//! # Quill Shared
//!
//! Wire types shared by the server and its API clients.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, ErrorResponse};
