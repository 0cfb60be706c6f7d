pub mod notification;
pub mod timeline;

pub use notification::Notification;
pub use timeline::TimelineView;
