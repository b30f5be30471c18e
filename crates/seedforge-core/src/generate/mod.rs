pub mod fk;
pub mod pk;
pub mod providers;
pub mod row;
pub mod value;

pub use fk::{resolve_fk_value, FkRowState};
pub use pk::{PkRow, PkTracker};
pub use providers::{generate_json_value, generate_value};
pub use row::generate_row;
pub use value::{borrowed, owned, Record, RecordMeta, Value};
