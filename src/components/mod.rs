pub(crate) mod notify;
pub mod ui;

pub(crate) use notify::NotificationStack;
