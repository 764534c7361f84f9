pub mod runtime_error;
pub mod snapshot;
pub mod vm;

pub use runtime_error::RuntimeError;
pub use snapshot::{Snapshot, Status};
pub use vm::{InputProvider, Output, PrintHook, Vm, VmConfig};
