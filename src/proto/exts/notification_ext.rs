use crate::proto::gnmi::Notification;
use crate::proto::gnmi::Path;
use crate::proto::gnmi::TypedValue;
use crate::proto::gnmi::Update;

impl Update {
    pub fn new(
        path: Path,
        val: TypedValue,
    ) -> Self {
        Self {
            path: Some(path),
            val: Some(val),
            duplicates: 0,
        }
    }
}

impl Notification {
    /// True when the notification carries neither deletes nor updates.
    pub fn is_empty(&self) -> bool {
        self.delete.is_empty() && self.update.is_empty()
    }

    /// Full paths (prefix joined with each element) of every deleted path.
    pub fn full_delete_paths(&self) -> impl Iterator<Item = Path> + '_ {
        let prefix = self.prefix.clone().unwrap_or_default();
        self.delete.iter().map(move |p| prefix.join(p))
    }
}
