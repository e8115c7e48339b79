use crate::proto::gnmi::Notification;
use crate::proto::gnmi::Path;
use crate::proto::gnmi::Update;
use crate::MirrorError;

/// Mirrors every path of a notification from its state container into the
/// sibling config container.
///
/// Each deleted or updated path must have the state container as its parent
/// element: `/interfaces/interface[name=eth0]/state/mtu` gains the sibling
/// `/interfaces/interface[name=eth0]/config/mtu`. Mirrored deletes go before
/// the original ones, mirrored updates after them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRewriter {
    state_container: String,
    config_container: String,
}

impl Default for MirrorRewriter {
    fn default() -> Self {
        Self::new(
            crate::constants::DEFAULT_STATE_CONTAINER,
            crate::constants::DEFAULT_CONFIG_CONTAINER,
        )
    }
}

impl MirrorRewriter {
    pub fn new(
        state_container: impl Into<String>,
        config_container: impl Into<String>,
    ) -> Self {
        Self {
            state_container: state_container.into(),
            config_container: config_container.into(),
        }
    }

    pub fn rewrite(
        &self,
        notification: Notification,
    ) -> Result<Notification, MirrorError> {
        let mut delete = Vec::with_capacity(notification.delete.len() * 2);
        for path in &notification.delete {
            let mirrored = self.mirror(path).map_err(|reason| match reason {
                Reject::TooShort => MirrorError::TooShort {
                    path: path.to_string(),
                    sentinel: self.state_container.clone(),
                },
                Reject::NotState => MirrorError::NonStateDelete {
                    path: path.to_string(),
                    sentinel: self.state_container.clone(),
                },
            })?;
            delete.push(mirrored);
        }
        delete.extend(notification.delete.iter().cloned());

        let mut mirrored_updates = Vec::with_capacity(notification.update.len());
        for update in &notification.update {
            let path = update.path.clone().unwrap_or_default();
            let mirrored = self.mirror(&path).map_err(|reason| match reason {
                Reject::TooShort => MirrorError::TooShort {
                    path: path.to_string(),
                    sentinel: self.state_container.clone(),
                },
                Reject::NotState => MirrorError::NonStateUpdate {
                    path: path.to_string(),
                    sentinel: self.state_container.clone(),
                },
            })?;
            mirrored_updates.push(Update {
                path: Some(mirrored),
                ..update.clone()
            });
        }

        let mut update = notification.update;
        update.extend(mirrored_updates);

        Ok(Notification {
            delete,
            update,
            ..notification
        })
    }

    fn mirror(
        &self,
        path: &Path,
    ) -> Result<Path, Reject> {
        let len = path.elem.len();
        if len < 2 {
            return Err(Reject::TooShort);
        }
        if path.elem[len - 2].name != self.state_container {
            return Err(Reject::NotState);
        }
        let mut mirrored = path.clone();
        mirrored.elem[len - 2].name = self.config_container.clone();
        Ok(mirrored)
    }
}

enum Reject {
    TooShort,
    NotState,
}
