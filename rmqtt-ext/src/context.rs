use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use rmqtt_conf::Settings;

use crate::types::NodeId;
use crate::{extend, plugin};

#[derive(Clone)]
pub struct ServerContext {
    inner: Arc<ServerContextInner>,
}

pub struct ServerContextInner {
    pub settings: Settings,
    pub extends: extend::Manager,
    pub plugins: plugin::Manager,
}

impl Deref for ServerContext {
    type Target = ServerContextInner;
    #[inline]
    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl ServerContext {
    pub fn new(settings: Settings) -> Self {
        let plugins = plugin::Manager::new(settings.plugins.clone());
        ServerContext {
            inner: Arc::new(ServerContextInner { settings, extends: extend::Manager::new(), plugins }),
        }
    }

    #[inline]
    pub fn node_id(&self) -> NodeId {
        self.settings.node.id
    }
}

impl fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ServerContext ...")?;
        Ok(())
    }
}
