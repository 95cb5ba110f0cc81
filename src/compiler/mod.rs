//! 编译模块：将原始指纹表编译为可执行的模式规格
pub mod pattern;
pub mod compiler;

pub use self::pattern::{CompiledPattern, PatternSpec, Technology, VersionedPattern, strip_pattern_meta};
pub use self::compiler::RuleCompiler;
