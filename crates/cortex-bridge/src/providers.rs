pub mod base;
pub mod configs;
pub mod cortex;
pub mod sse;
pub mod utils;
