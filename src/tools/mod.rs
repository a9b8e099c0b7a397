//! Tools module - external collaborators the executor acts through
//!
//! Each collaborator is a small `async_trait` seam with one production
//! implementation, so the step loop can be driven by fakes in tests.
//!
//! - [`ShellExecutor`] / [`NativeShell`]: run a command, get exit status + output
//! - [`FileSystem`] / [`LocalFileSystem`]: whole-file read and write
//! - [`VersionControl`] / [`GitCli`]: stage all + commit
//! - [`Approver`] / [`AutoApprove`]: interactive confirmation gate

pub mod approval;
pub mod filesystem;
pub mod git;
pub mod shell;

pub use approval::{Approver, AutoApprove};
pub use filesystem::{FileSystem, LocalFileSystem};
pub use git::{GitCli, VersionControl};
pub use shell::{CommandOutput, NativeShell, ShellExecutor};
