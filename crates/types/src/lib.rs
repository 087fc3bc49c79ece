//! Shared type definitions for job lines and their execution journals.

pub mod journal;
pub mod line;

pub use journal::{JobJournal, JobLineJournal, JournalStatus};
pub use line::{ArgMap, ArgSpec, Context, JobLine, JobLineDefinition, JobLineDocument, JobLineStep};
