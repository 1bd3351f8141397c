pub mod draft;
pub mod history;
pub mod input;
pub mod key;
pub mod summary;

pub use draft::{DraftState, Field, ItemInput, RemoteLatest, Selection};
pub use history::{LatestEntry, RecordedRow, latest_by_name, remote_latest_from_wire};
pub use input::{InputError, parse_field, parse_field_value};
pub use key::{DraftKey, TRAINING_NAMESPACE};
pub use summary::{SummaryRow, TrainingSummary};
