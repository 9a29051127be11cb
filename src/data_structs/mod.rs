mod enums;
mod record;
pub mod schema;

pub use enums::{RunMode, YieldSource};
pub use record::RunRecord;
