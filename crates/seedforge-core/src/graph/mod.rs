pub mod analyzer;

pub use analyzer::{analyze_dependencies, DependencyAnalysis, TableDependency};
