//! Kernel state and bootstrap

pub mod init;
pub mod state;

pub use init::init_kernel;
pub use state::{KernelState, KERNEL};
