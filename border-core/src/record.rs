//! Key-value records for diagnostics.
//!
//! A [`Record`] stores named values produced while interacting with an environment, such as the
//! per-environment flags computed by a task evaluator or the mean of reward stages.
//!
//! ```rust
//! use border_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("success", RecordValue::Flags(vec![true, false]));
//! record.insert("obj_goal_dist", RecordValue::Array1(vec![0.0, 0.12]));
//! record.insert("reaching", RecordValue::Scalar(0.8));
//!
//! assert_eq!(record.get_flags("success").unwrap(), &[true, false]);
//! ```
mod base;

pub use base::{Record, RecordValue};
