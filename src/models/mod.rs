pub mod causal;
pub mod dataset;
pub mod loaders;
pub mod outcome;
pub mod program;
pub mod record;

pub use causal::CausalCode;
pub use dataset::{ColumnSpec, Dataset};
pub use loaders::load_dataset;
pub use outcome::{Outcome, OutcomeStatus};
pub use program::ProgramType;
pub use record::{normalize_identifier, normalize_records, Record};
