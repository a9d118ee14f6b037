//! Data Transfer Objects for HTTP request/response serialization.

pub mod request;
pub mod response;
