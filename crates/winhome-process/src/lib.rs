//! Subprocess plumbing shared by every component that shells out.
//!
//! [`process::run`] is the single "spawn, feed stdin, drain both streams,
//! enforce a deadline and an output cap" primitive. Package managers,
//! bootstrappers, the plugin runner, and host appliers all go through it, so
//! pipe handling and kill-on-overrun behaviour live in one place.
//!
//! [`RuntimeResolver`] locates tool executables without trusting the
//! process `PATH` alone, because tools installed earlier in the same run are
//! often not visible on the inherited `PATH` yet.

pub mod process;
pub mod resolver;

pub use self::process::{
    ProcessCommand, ProcessError, ProcessOutput, ProcessRunner, SystemProcessRunner, run,
};
pub use self::resolver::RuntimeResolver;
