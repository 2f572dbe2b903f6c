//! CLI command implementations

pub mod create;
pub mod delta;
pub mod down;
pub mod init;
pub mod list;
pub mod nuclear;
pub mod refresh;
pub mod up;
