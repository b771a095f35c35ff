//! Stateless helpers used next to the pool: telemetry, tokens, hashing and
//! external commands. None of them touch pool state.

pub mod command;
pub mod hash;
pub mod telemetry;
pub mod token;

pub use command::run_command;
pub use hash::content_hash;
pub use telemetry::{init_tracing, LogSink};
pub use token::{issue_token, verify_token, User, UserTokenClaims};
