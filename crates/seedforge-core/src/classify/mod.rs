pub mod rules;

pub use rules::match_column_name;
