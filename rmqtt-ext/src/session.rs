use std::sync::Arc;

use crate::types::{Id, ProtocolLevel, MQTT_LEVEL_5};

/// The client side of a subscription request as the hooks see it.
#[derive(Clone, Debug)]
pub struct Session {
    pub id: Id,
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    proto_ver: ProtocolLevel,
}

impl Session {
    #[inline]
    pub fn new(id: Id, proto_ver: ProtocolLevel) -> Self {
        Self { id, inner: Arc::new(SessionInner { proto_ver }) }
    }

    #[inline]
    pub fn protocol(&self) -> ProtocolLevel {
        self.inner.proto_ver
    }

    #[inline]
    pub fn is_v5(&self) -> bool {
        self.inner.proto_ver == MQTT_LEVEL_5
    }
}
