//
// lib.rs
// medimage-utils
//
// Exposes the crate's modules and re-exports the CLI entry point for both binary and library consumers.
//

// Public surface of the library: each module mirrors a CLI verb or shared utility.
pub mod batch;
pub mod cli;
pub mod extract;
pub mod models;
pub mod nifti_io;
pub mod resample;
pub mod resize;
pub mod volume;

pub use cli::{run as run_cli, Cli, Commands};
