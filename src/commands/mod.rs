pub mod chunk;
pub mod process;
pub mod qa;
pub mod status;
pub mod store;
