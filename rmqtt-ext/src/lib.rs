#![deny(unsafe_code)]

//! Host side of the rmqtt extension points: subscription types, the hook chain,
//! the plugin manager and the shared server context a plugin is built from.

pub mod context; // Shared server context
pub mod error; // Host failure kinds
pub mod extend; // Extension points
pub mod hook; // Hook chain
pub mod logger; // log -> slog bridge
pub mod plugin; // Plugin lifecycle management
pub mod session; // Subscriber side of a request
pub mod types; // Common data types

pub use error::MqttError;
pub use rmqtt_conf as conf;
pub use rmqtt_macros as macros;

pub type Error = anyhow::Error;
pub type Result<T, E = Error> = anyhow::Result<T, E>;

///Generates `register` and `register_named` for a plugin whose constructor is
///`async fn new(scx: ServerContext, name: String) -> Result<Self>`.
#[macro_export]
macro_rules! register {
    ($name:path) => {
        #[inline]
        pub async fn register_named<N: Into<String>>(
            scx: &$crate::context::ServerContext,
            name: N,
            default_startup: bool,
            immutable: bool,
        ) -> $crate::Result<()> {
            let name = name.into();
            let scx1 = scx.clone();
            let name1 = name.clone();
            scx.plugins
                .register(name, default_startup, immutable, move || -> $crate::plugin::DynPluginResult {
                    let scx = scx1.clone();
                    let name = name1.clone();
                    Box::pin(async move {
                        $name(scx, name).await.map(|p| -> $crate::plugin::DynPlugin { Box::new(p) })
                    })
                })
                .await
        }

        #[inline]
        pub async fn register(
            scx: &$crate::context::ServerContext,
            default_startup: bool,
            immutable: bool,
        ) -> $crate::Result<()> {
            register_named(scx, env!("CARGO_PKG_NAME"), default_startup, immutable).await
        }
    };
}
