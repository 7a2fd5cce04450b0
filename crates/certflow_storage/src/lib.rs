#![forbid(unsafe_code)]

pub mod audit;
pub mod repo;
pub mod shared;
pub mod store;
