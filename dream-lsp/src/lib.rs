#![forbid(unsafe_code)]

//! Dream Language Server Protocol (LSP) library.
//!
//! The server is a thin adapter around the external Dream compiler: it hands
//! document text to the `parse` executable, reconstructs positioned
//! diagnostics from its stderr, pulls symbols from its `--symbols` JSON, and
//! caches the result per content hash so unchanged documents never trigger a
//! second process invocation.

pub mod analysis;
pub mod builtins;
pub mod cache;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod symbols;
pub mod text;

pub use analysis::AnalysisWorker;
pub use cache::{AnalysisResult, ParseCache, CACHE_TTL, MAX_CACHE_SIZE};
pub use compiler::CompilerError;
pub use symbols::SymbolInfo;

use sha2::{Digest, Sha256};

pub fn sha256_hex(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    hex::encode(hasher.finalize())
}
