pub mod classify;
pub mod error;
pub mod filter;
pub mod flap;
pub mod inax1;
pub mod lineage;
pub mod matcher;
pub mod output;
pub mod record;
pub mod report;
pub mod rewrite;
pub mod runner;
pub mod state;
pub mod strategy;
pub mod syntax;
pub mod types;

pub use error::{Error, Result};
pub use strategy::{Strategy, StrategyKind, StrategyOptions};
pub use syntax::{Dialect, SyntaxTree};

pub fn detect_dialect(path: &std::path::Path) -> Option<Dialect> {
    match path.extension()?.to_str()? {
        "c" | "h" => Some(Dialect::C),
        "cc" | "cpp" | "cxx" | "c++" | "hpp" | "hh" | "hxx" | "C" | "H" => Some(Dialect::Cpp),
        _ => None,
    }
}
