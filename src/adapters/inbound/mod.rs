mod list_watcher;

pub use list_watcher::ListWatcher;
