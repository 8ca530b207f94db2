pub mod dispatch;
pub mod notify;
pub mod snapshot;

pub use dispatch::{EventHandler, EventSink};
pub use notify::{NotificationMessage, Notifier};
pub use snapshot::{DiskSnapshotWriter, SnapshotWriter};
