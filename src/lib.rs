//! Portion records for the MBG school meal calculator.
//!
//! Each record holds a school's large ("besar") and small ("kecil") portion
//! counts. The [`RecordStore`] keeps them in display order, mirrors every
//! change into a [`KeyValueStore`], and derives bundle ("ikat") and
//! remainder ("ompreng") figures for reports.

pub mod config;
pub mod error;
pub mod record;
pub mod report;
pub mod storage;
pub mod store;
pub mod totals;

pub use config::{StoreConfig, BUNDLE_SIZE, STORAGE_KEY};
pub use error::{ConfigError, ExportError, StorageError, StoreError, ValidationError};
pub use record::{parse_portion, PortionKind, Record, RecordFields, RecordForm, RecordId};
pub use report::{Report, ReportRow};
pub use storage::{FileStorage, KeyValueStore, MemoryStorage};
pub use store::{Applied, RecordStore};
pub use totals::{PortionBreakdown, RecordBreakdown, Totals};
