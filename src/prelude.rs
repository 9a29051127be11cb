pub use crate::aggregate::{find_run_files, RunAggregator};
pub use crate::data_structs::{RunMode, RunRecord, YieldSource};
pub use crate::io::extract::{
    extract_dataset,
    extract_sts,
    DatasetMetrics,
    SchemaKind,
    StsMetrics,
};
pub use crate::io::table::{RunTable, TableSummary};
pub use crate::io::xml::{parse_document, XmlElement};
pub use crate::tools::regression::{compare_models, FTest, LinearModel};
pub use crate::tools::report::{ReportConfig, StatReport};
