#![deny(unsafe_code)]

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use rmqtt_ext::{
    context::ServerContext,
    hook::{Handler, HookResult, Parameter, Register, ReturnType, Type},
    macros::Plugin,
    plugin::{PackageInfo, Plugin},
    register,
    types::{SubscribeAckReason, SubscribeAclResult},
    Result,
};

use config::PluginConfig;
pub use validator::{
    denied_root, is_wildcard_only, validate, DenyWildcardAuthorizer, Root, SubscriptionAuthorizer,
    ValidationOutcome, REASON_STRING, WILDCARD_CHARS,
};

mod config;
mod validator;

register!(DenyWildcardPlugin::new);

#[derive(Plugin)]
struct DenyWildcardPlugin {
    scx: ServerContext,
    register: Box<dyn Register>,
    cfg: Arc<RwLock<PluginConfig>>,
}

impl DenyWildcardPlugin {
    #[inline]
    async fn new<N: Into<String>>(scx: ServerContext, name: N) -> Result<Self> {
        let name = name.into();
        let cfg = scx.plugins.read_config_default::<PluginConfig>(&name)?;
        log::debug!("{} DenyWildcardPlugin cfg: {:?}", name, cfg);
        let register = scx.extends.hook_mgr().register();
        Ok(Self { scx, register, cfg: Arc::new(RwLock::new(cfg)) })
    }
}

#[async_trait]
impl Plugin for DenyWildcardPlugin {
    #[inline]
    async fn init(&mut self) -> Result<()> {
        log::info!("{} init", self.name());
        let priority = self.cfg.read().await.priority;
        self.register
            .add_priority(Type::ClientSubscribeCheckAcl, priority, Box::new(DenyWildcardHandler::new()))
            .await;
        Ok(())
    }

    #[inline]
    async fn get_config(&self) -> Result<serde_json::Value> {
        self.cfg.read().await.to_json()
    }

    #[inline]
    async fn load_config(&mut self) -> Result<()> {
        let new_cfg = self.scx.plugins.read_config_default::<PluginConfig>(self.name())?;
        *self.cfg.write().await = new_cfg;
        log::debug!("load_config ok, {:?}", self.cfg);
        Ok(())
    }

    #[inline]
    async fn start(&mut self) -> Result<()> {
        log::info!("Using the Deny Wildcard plugin. Subscribing to '#' is prohibited.");
        self.register.start().await;
        Ok(())
    }

    #[inline]
    async fn stop(&mut self) -> Result<bool> {
        log::info!("{} stop", self.name());
        self.register.stop().await;
        Ok(true)
    }
}

struct DenyWildcardHandler {
    authorizer: DenyWildcardAuthorizer,
}

impl DenyWildcardHandler {
    fn new() -> Self {
        Self { authorizer: DenyWildcardAuthorizer }
    }
}

#[async_trait]
impl Handler for DenyWildcardHandler {
    async fn hook(&self, param: &Parameter, acc: Option<HookResult>) -> ReturnType {
        if let Parameter::ClientSubscribeCheckAcl(session, subscribe) = param {
            //a failure decided by a higher priority handler stands
            if let Some(HookResult::SubscribeAclResult(acl_result)) = &acc {
                if acl_result.failure() {
                    return (false, acc);
                }
            }

            if let ValidationOutcome::Rejected { reason } =
                self.authorizer.authorize(&subscribe.topic_filter, session.id.client_id())
            {
                return (
                    false,
                    Some(HookResult::SubscribeAclResult(SubscribeAclResult::new_failure(
                        SubscribeAckReason::NotAuthorized,
                        Some(reason.into()),
                    ))),
                );
            }
        }
        (true, acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmqtt_ext::conf::Settings;
    use rmqtt_ext::session::Session;
    use rmqtt_ext::types::{Id, QoS, Reason, Subscribe, MQTT_LEVEL_311, MQTT_LEVEL_5};

    const NAME: &str = "rmqtt-deny-wildcard";

    struct Fixed {
        proceed: bool,
        result: SubscribeAclResult,
    }

    #[async_trait]
    impl Handler for Fixed {
        async fn hook(&self, _param: &Parameter, _acc: Option<HookResult>) -> ReturnType {
            (self.proceed, Some(HookResult::SubscribeAclResult(self.result.clone())))
        }
    }

    fn session() -> Session {
        Session::new(Id::new(1, "client".into(), Some("user".into())), MQTT_LEVEL_5)
    }

    fn denied() -> SubscribeAclResult {
        SubscribeAclResult::new_failure(SubscribeAckReason::NotAuthorized, Some(Reason::from(REASON_STRING)))
    }

    async fn check(scx: &ServerContext, s: Session, tf: &str) -> Option<SubscribeAclResult> {
        let sub = Subscribe::new(tf, QoS::AtLeastOnce);
        scx.extends.hook_mgr().hook(s).client_subscribe_check_acl(&sub).await
    }

    #[tokio::test]
    async fn test_register_and_check() {
        let scx = ServerContext::new(Settings::default());
        register(&scx, true, false).await.expect("register");
        assert!(scx.plugins.is_active(NAME));

        assert_eq!(check(&scx, session(), "#").await, Some(denied()));
        assert_eq!(check(&scx, session(), "$share/group/+/+").await, Some(denied()));
        assert_eq!(check(&scx, session(), "$expired/#").await, Some(denied()));
        //no other handler decides, the host grants the requested QoS
        assert_eq!(check(&scx, session(), "topic/#").await, None);
        assert_eq!(check(&scx, session(), "$dropped/topic/+").await, None);

        let r = check(&scx, session(), "+/#").await.expect("acl result");
        assert!(r.failure());
        assert_eq!(u8::from(r.ack_reason()), 0x87);
        assert_eq!(r.ack_reason().v3_return_code(), 0x80);
        assert_eq!(r.reason_string().map(|r| &r[..]), Some(REASON_STRING));
    }

    #[tokio::test]
    async fn test_v311_session() {
        let scx = ServerContext::new(Settings::default());
        register(&scx, true, false).await.expect("register");
        let s = Session::new(Id::from(1, "old".into()), MQTT_LEVEL_311);
        let r = check(&scx, s, "#").await.expect("acl result");
        assert_eq!(r.ack_reason().v3_return_code(), 0x80);
    }

    #[tokio::test]
    async fn test_admin_clients_are_checked() {
        let scx = ServerContext::new(Settings::default());
        register(&scx, true, false).await.expect("register");
        for proto_ver in [MQTT_LEVEL_311, MQTT_LEVEL_5] {
            let s = Session::new(Id::new(1, "admin".into(), Some("admin".into())), proto_ver);
            assert_eq!(check(&scx, s, "#").await, Some(denied()));
        }
    }

    #[tokio::test]
    async fn test_lazy_start_and_stop() {
        let scx = ServerContext::new(Settings::default());
        register(&scx, false, false).await.expect("register");
        assert!(!scx.plugins.is_active(NAME));
        assert_eq!(check(&scx, session(), "#").await, None);

        scx.plugins.start(NAME).await.expect("start");
        assert_eq!(check(&scx, session(), "#").await, Some(denied()));

        assert!(scx.plugins.stop(NAME).await.expect("stop"));
        assert!(!scx.plugins.is_active(NAME));
        assert_eq!(check(&scx, session(), "#").await, None);
    }

    #[tokio::test]
    async fn test_lower_priority_handlers() {
        let scx = ServerContext::new(Settings::default());
        register(&scx, true, false).await.expect("register");

        let granted = SubscribeAclResult::new_success(QoS::AtMostOnce);
        let others = scx.extends.hook_mgr().register();
        others
            .add_priority(
                Type::ClientSubscribeCheckAcl,
                1,
                Box::new(Fixed { proceed: false, result: granted.clone() }),
            )
            .await;
        others.start().await;

        //accepted filters continue down the chain, rejected ones stop here
        assert_eq!(check(&scx, session(), "topic/#").await, Some(granted));
        assert_eq!(check(&scx, session(), "#").await, Some(denied()));
    }

    #[tokio::test]
    async fn test_preceding_failure_kept() {
        let scx = ServerContext::new(Settings::default());
        register(&scx, true, false).await.expect("register");

        let quota = SubscribeAclResult::new_failure(SubscribeAckReason::QuotaExceeded, None);
        let others = scx.extends.hook_mgr().register();
        others
            .add_priority(
                Type::ClientSubscribeCheckAcl,
                1000,
                Box::new(Fixed { proceed: true, result: quota.clone() }),
            )
            .await;
        others.start().await;

        assert_eq!(check(&scx, session(), "#").await, Some(quota.clone()));
        assert_eq!(check(&scx, session(), "topic").await, Some(quota));
    }

    #[tokio::test]
    async fn test_preceding_success_overridden() {
        let scx = ServerContext::new(Settings::default());
        register(&scx, true, false).await.expect("register");

        let others = scx.extends.hook_mgr().register();
        others
            .add_priority(
                Type::ClientSubscribeCheckAcl,
                1000,
                Box::new(Fixed { proceed: true, result: SubscribeAclResult::new_success(QoS::ExactlyOnce) }),
            )
            .await;
        others.start().await;

        assert_eq!(check(&scx, session(), "#").await, Some(denied()));
    }

    #[tokio::test]
    async fn test_config() {
        let scx = ServerContext::new(Settings::default());
        register(&scx, true, false).await.expect("register");
        let cfg = scx.plugins.get_config(NAME).await.expect("config");
        assert_eq!(cfg, serde_json::json!({"priority": 100}));
        scx.plugins.load_config(NAME).await.expect("load config");

        let list = scx.plugins.to_json().await.expect("json");
        assert_eq!(list[0]["name"], NAME);
        assert_eq!(list[0]["inited"], true);
    }
}
