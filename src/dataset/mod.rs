//! Dataset subsystem.
//!
//! # Data Flow
//! ```text
//! hub tree listing
//!     → loader.rs (glob select, cache download, label inference) → Dataset
//!     → split.rs (seeded shuffle, ceil(test_size * n) to test) → DatasetDict
//!     → publish.rs (imagefolder layout, batched commits) → PublishReport
//! ```

pub mod loader;
pub mod publish;
pub mod split;
pub mod types;

pub use loader::DatasetLoader;
pub use publish::{DatasetPublisher, PublishReport, UploadBatch};
pub use split::train_test_split;
pub use types::{Dataset, DatasetDict, DatasetError, DatasetResult, ImageRecord, TEST_SPLIT, TRAIN_SPLIT};
