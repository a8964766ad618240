use std::sync::Arc;

use crate::connection::{Properties, PASSWORD_PROPERTY, USER_PROPERTY};
use crate::registry::RemoteServerInfo;

/// Rewrites connection properties before a remote catalog is opened.
pub trait ConnectionFilter: Send + Sync {
    fn filter_properties(&self, properties: &mut Properties);
}

/// Build the property set for a remote connection.
///
/// Filters run in order on a copy of the stored properties. Credentials are
/// injected afterwards, so no filter observes them and none can override
/// them.
pub fn remote_connection_properties(
    info: &RemoteServerInfo,
    filters: &[Arc<dyn ConnectionFilter>],
) -> Properties {
    let mut properties = info.properties.clone();

    for filter in filters {
        filter.filter_properties(&mut properties);
    }

    if let Some(user) = &info.user {
        properties.insert(USER_PROPERTY.to_string(), user.clone());
    }
    if let Some(password) = &info.password {
        properties.insert(PASSWORD_PROPERTY.to_string(), password.clone());
    }
    properties
}
