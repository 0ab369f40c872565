pub mod file_session;
pub mod handle;
pub mod monitoring;
pub mod parser;
pub mod render;
pub mod resolution;
pub mod session;
pub mod suggestion;
