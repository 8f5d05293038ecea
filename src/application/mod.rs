//! Application services layer.

pub mod banners;
pub mod context;
pub mod error;
pub mod pagination;
pub mod repos;
pub mod tokens;
