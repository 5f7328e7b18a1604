pub mod aggregate;
pub mod cancel;
pub mod convert;
pub mod encoding;
pub mod pipeline;
pub mod profile;
pub mod reference;
pub mod report;
pub mod store;
pub mod sync;

pub use tablepulse_common::{Result, TablePulseError};

pub use aggregate::{combine_results, write_combined, COMBINED_FILE_NAME};
pub use cancel::CancelToken;
pub use convert::convert_dir;
pub use encoding::{detect_encoding, sniff_encoding};
pub use pipeline::{analyze_and_combine, run_pipeline};
pub use profile::{profile_dir, ColumnMetadataRecord, MissingValueRecord, ProfileResults};
pub use reference::{ColumnCatalog, MainTable};
pub use report::{HtmlReportGenerator, ReportGenerator};
pub use store::{ObjectStore, RemoteObject, S3Store};
pub use sync::{sync_prefix, upload_dir};
