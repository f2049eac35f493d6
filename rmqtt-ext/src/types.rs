use std::fmt;
use std::sync::Arc;

use bytestring::ByteString;
use serde::{Deserialize, Serialize};

pub type NodeId = u64;
pub type ClientId = ByteString;
pub type UserName = ByteString;
pub type Reason = ByteString;
///topic filter
pub type TopicFilter = ByteString;
pub type ProtocolLevel = u8;

pub const MQTT_LEVEL_31: ProtocolLevel = 3;
pub const MQTT_LEVEL_311: ProtocolLevel = 4;
pub const MQTT_LEVEL_5: ProtocolLevel = 5;

#[derive(Clone)]
pub struct Id(Arc<_Id>);

struct _Id {
    id: ByteString,
    client_id: ClientId,
    username: Option<UserName>,
}

impl Id {
    #[inline]
    pub fn new(node_id: NodeId, client_id: ClientId, username: Option<UserName>) -> Self {
        Self(Arc::new(_Id {
            id: ByteString::from(format!(
                "{}@{}/{}",
                node_id,
                client_id,
                username.as_ref().map(<UserName as AsRef<str>>::as_ref).unwrap_or_default()
            )),
            client_id,
            username,
        }))
    }

    #[inline]
    pub fn from(node_id: NodeId, client_id: ClientId) -> Self {
        Self::new(node_id, client_id, None)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0.id
    }

    #[inline]
    pub fn client_id(&self) -> &ClientId {
        &self.0.client_id
    }

    #[inline]
    pub fn username(&self) -> Option<&UserName> {
        self.0.username.as_ref()
    }
}

impl AsRef<str> for Id {
    #[inline]
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Id {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Debug for Id {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl PartialEq<Id> for Id {
    #[inline]
    fn eq(&self, other: &Id) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Id {}

/// Quality of Service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QoS {
    /// At most once delivery
    AtMostOnce = 0,
    /// At least once delivery
    AtLeastOnce = 1,
    /// Exactly once delivery
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QoS {
    type Error = crate::MqttError;

    #[inline]
    fn try_from(qos: u8) -> Result<Self, Self::Error> {
        match qos {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            _ => Err(crate::MqttError::Msg(format!("invalid qos value, {}", qos))),
        }
    }
}

/// A single topic filter of a SUBSCRIBE packet, as handed to the subscribe hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscribe {
    pub topic_filter: TopicFilter,
    pub qos: QoS,
}

impl Subscribe {
    #[inline]
    pub fn new<T: Into<TopicFilter>>(topic_filter: T, qos: QoS) -> Self {
        Self { topic_filter: topic_filter.into(), qos }
    }
}

/// SUBACK reason codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscribeAckReason {
    GrantedQos0 = 0,
    GrantedQos1 = 1,
    GrantedQos2 = 2,
    UnspecifiedError = 128,
    ImplementationSpecificError = 131,
    NotAuthorized = 135,
    TopicFilterInvalid = 143,
    PacketIdentifierInUse = 145,
    QuotaExceeded = 151,
    SharedSubscriptionNotSupported = 158,
    SubscriptionIdentifiersNotSupported = 161,
    WildcardSubscriptionsNotSupported = 162,
}

impl SubscribeAckReason {
    ///MQTT 3.1.1 only knows the granted QoS levels and a single failure code (0x80).
    #[inline]
    pub fn v3_return_code(&self) -> u8 {
        match self {
            SubscribeAckReason::GrantedQos0 => 0,
            SubscribeAckReason::GrantedQos1 => 1,
            SubscribeAckReason::GrantedQos2 => 2,
            _ => 0x80,
        }
    }
}

impl From<SubscribeAckReason> for u8 {
    fn from(v: SubscribeAckReason) -> Self {
        v as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeReturn {
    ack_reason: SubscribeAckReason,
    reason_string: Option<Reason>,
}

pub type SubscribeAclResult = SubscribeReturn;

impl SubscribeReturn {
    #[inline]
    pub fn new_success(qos: QoS) -> Self {
        let ack_reason = match qos {
            QoS::AtMostOnce => SubscribeAckReason::GrantedQos0,
            QoS::AtLeastOnce => SubscribeAckReason::GrantedQos1,
            QoS::ExactlyOnce => SubscribeAckReason::GrantedQos2,
        };
        Self { ack_reason, reason_string: None }
    }

    #[inline]
    pub fn new_failure(ack_reason: SubscribeAckReason, reason_string: Option<Reason>) -> Self {
        Self { ack_reason, reason_string }
    }

    #[inline]
    pub fn success(&self) -> Option<QoS> {
        match self.ack_reason {
            SubscribeAckReason::GrantedQos0 => Some(QoS::AtMostOnce),
            SubscribeAckReason::GrantedQos1 => Some(QoS::AtLeastOnce),
            SubscribeAckReason::GrantedQos2 => Some(QoS::ExactlyOnce),
            _ => None,
        }
    }

    #[inline]
    pub fn failure(&self) -> bool {
        self.success().is_none()
    }

    #[inline]
    pub fn ack_reason(&self) -> SubscribeAckReason {
        self.ack_reason
    }

    #[inline]
    pub fn reason_string(&self) -> Option<&Reason> {
        self.reason_string.as_ref()
    }
}
