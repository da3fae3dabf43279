pub mod formatting;
pub mod types;

pub use formatting::format_error;
pub use types::{CheckError, CompileError, HashError, SourceError, VerifyError, ViewError};
