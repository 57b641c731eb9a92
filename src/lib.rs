pub mod app;
pub mod common;
pub mod seed;
pub mod shutdown;
