//! Data models for students, attendance records, and sync queue items.

pub mod attendance;
pub mod student;
pub mod sync;

pub use attendance::{AttendanceRecord, AttendanceStatus};
pub use student::{Roster, Student};
pub use sync::{SyncItemKind, SyncItemStatus, SyncQueueItem};
