pub mod compiler;
pub mod index;
pub mod tokens;

pub use compiler::{CompileConfig, CompileError, CompiledGeneration, Compiler};
pub use index::{CompiledIndex, Domain, StageContent};
pub use tokens::{ApproxTokenCounter, TokenCounter};
