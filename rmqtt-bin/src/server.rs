#![deny(unsafe_code)]

use structopt::StructOpt;
use tokio::io::{AsyncBufReadExt, BufReader};

use rmqtt_ext::conf::{Options, Settings};
use rmqtt_ext::context::ServerContext;
use rmqtt_ext::hook::Hook;
use rmqtt_ext::logger::logger_init;
use rmqtt_ext::session::Session;
use rmqtt_ext::types::{Id, ProtocolLevel, QoS, Subscribe, SubscribeAclResult, MQTT_LEVEL_5};
use rmqtt_ext::{MqttError, Result};

#[allow(dead_code)]
mod plugin {
    include!(concat!(env!("OUT_DIR"), "/plugin.rs"));
}

mod version {
    include!(concat!(env!("OUT_DIR"), "/version.rs"));
}

#[derive(StructOpt, Debug)]
#[structopt(name = "rmqtt-subcheck", about = "Checks MQTT topic filters against the subscribe ACL plugins")]
struct Args {
    #[structopt(flatten)]
    opts: Options,

    /// Client id of the subscriber
    #[structopt(long = "client-id", default_value = "rmqtt-subcheck")]
    client_id: String,

    /// Username of the subscriber
    #[structopt(long)]
    username: Option<String>,

    /// Requested QoS
    #[structopt(long, default_value = "0", parse(try_from_str = parse_qos))]
    qos: QoS,

    /// MQTT protocol level, 3, 4 or 5
    #[structopt(long, default_value = "5")]
    protocol: ProtocolLevel,

    /// Topic filters, read line by line from stdin when none are given
    topic_filters: Vec<String>,
}

fn parse_qos(s: &str) -> Result<QoS> {
    let qos = s.parse::<u8>().map_err(|e| MqttError::Msg(format!("invalid qos {:?}, {}", s, e)))?;
    Ok(QoS::try_from(qos)?)
}

#[tokio::main]
async fn main() {
    let Args { opts, client_id, username, qos, protocol, topic_filters } = Args::from_args();

    //init config
    let settings = Settings::init(opts).expect("settings init failed");

    //init log
    let _logger = logger_init(settings).expect("logger init failed");

    let _ = Settings::logs();
    log::info!("{}", version::VERSION);

    let scx = ServerContext::new(settings.clone());

    //register plugin
    plugin::registers(&scx, &settings.plugins.default_startups).await.expect("register plugin failed");

    //hook, before startup
    scx.extends.hook_mgr().before_startup().await;

    let id = Id::new(scx.node_id(), client_id.into(), username.map(Into::into));
    let hook = scx.extends.hook_mgr().hook(Session::new(id, protocol));

    let checked = if topic_filters.is_empty() {
        check_stdin(hook.as_ref(), qos, protocol).await
    } else {
        for tf in topic_filters {
            check(hook.as_ref(), &tf, qos, protocol).await;
        }
        Ok(())
    };
    if let Err(e) = checked {
        log::error!("read topic filters failed, {:?}", e);
    }

    scx.plugins.stop_all().await;
}

async fn check_stdin(hook: &dyn Hook, qos: QoS, protocol: ProtocolLevel) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        check(hook, line.trim_end_matches('\r'), qos, protocol).await;
    }
    Ok(())
}

async fn check(hook: &dyn Hook, tf: &str, qos: QoS, protocol: ProtocolLevel) {
    let acl_result = hook
        .client_subscribe_check_acl(&Subscribe::new(tf.to_owned(), qos))
        .await
        .unwrap_or_else(|| SubscribeAclResult::new_success(qos));
    let code = if protocol == MQTT_LEVEL_5 {
        u8::from(acl_result.ack_reason())
    } else {
        acl_result.ack_reason().v3_return_code()
    };
    println!(
        "{}\t{:#04x}\t{}",
        tf,
        code,
        acl_result.reason_string().map(|r| &r[..]).unwrap_or("-")
    );
}
