use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;

use async_trait::async_trait;
use serde_json::json;

use rmqtt_conf::Plugins;

use crate::{MqttError, Result};

type DashMap<K, V> = dashmap::DashMap<K, V, ahash::RandomState>;

pub trait PackageInfo {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn descr(&self) -> Option<&str> {
        None
    }

    fn authors(&self) -> Option<Vec<&str>> {
        None
    }

    fn homepage(&self) -> Option<&str> {
        None
    }

    fn license(&self) -> Option<&str> {
        None
    }

    fn repository(&self) -> Option<&str> {
        None
    }
}

#[async_trait]
pub trait Plugin: PackageInfo + Send + Sync {
    #[inline]
    async fn init(&mut self) -> Result<()> {
        Ok(())
    }

    #[inline]
    async fn get_config(&self) -> Result<serde_json::Value> {
        Ok(json!({}))
    }

    #[inline]
    async fn load_config(&mut self) -> Result<()> {
        Err(MqttError::from("unimplemented!").into())
    }

    #[inline]
    async fn start(&mut self) -> Result<()> {
        Ok(())
    }

    ///Returns false when the plug-in refuses to stop
    #[inline]
    async fn stop(&mut self) -> Result<bool> {
        Ok(true)
    }

    #[inline]
    async fn attrs(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

pub trait PluginFn: 'static + Sync + Send + Fn() -> BoxFuture<Result<DynPlugin>> {}

impl<T> PluginFn for T where T: 'static + Sync + Send + ?Sized + Fn() -> BoxFuture<Result<DynPlugin>> {}

pub type DynPluginResult = BoxFuture<Result<DynPlugin>>;
pub type DynPlugin = Box<dyn Plugin>;
pub type DynPluginFn = Box<dyn PluginFn>;

pub struct Entry {
    inited: bool,
    active: bool,
    //will reject stop operations
    immutable: bool,
    plugin: Option<DynPlugin>,
    plugin_f: Option<DynPluginFn>,
}

impl Entry {
    #[inline]
    pub fn inited(&self) -> bool {
        self.inited
    }

    #[inline]
    pub fn active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn immutable(&self) -> bool {
        self.immutable
    }

    #[inline]
    fn plugin(&self, name: &str) -> Result<&dyn Plugin> {
        if let Some(plugin) = &self.plugin {
            Ok(plugin.as_ref())
        } else {
            Err(MqttError::PluginNotInitialized(name.into()).into())
        }
    }

    #[inline]
    async fn plugin_mut(&mut self, name: &str) -> Result<&mut dyn Plugin> {
        if let Some(plugin_f) = self.plugin_f.take() {
            self.plugin.replace(plugin_f().await?);
        }

        if let Some(plugin) = self.plugin.as_mut() {
            Ok(plugin.as_mut())
        } else {
            Err(MqttError::PluginNotInitialized(name.into()).into())
        }
    }

    #[inline]
    pub async fn to_json(&self, name: &str) -> Result<serde_json::Value> {
        if let Ok(plugin) = self.plugin(name) {
            Ok(json!({
                "name": plugin.name(),
                "version": plugin.version(),
                "descr": plugin.descr(),
                "authors": plugin.authors(),
                "license": plugin.license(),
                "inited": self.inited,
                "active": self.active,
                "immutable": self.immutable,
                "attrs": plugin.attrs().await,
            }))
        } else {
            Ok(json!({
                "name": name,
                "inited": self.inited,
                "active": self.active,
                "immutable": self.immutable,
            }))
        }
    }
}

pub struct Manager {
    plugins: DashMap<String, Entry>,
    cfg: Plugins,
}

impl Manager {
    pub(crate) fn new(cfg: Plugins) -> Self {
        Self { plugins: DashMap::default(), cfg }
    }

    ///Register a Plugin
    pub async fn register<N: Into<String>, F: PluginFn>(
        &self,
        name: N,
        default_startup: bool,
        immutable: bool,
        plugin_f: F,
    ) -> Result<()> {
        let name = name.into();

        if let Some((_, mut entry)) = self.plugins.remove(&name) {
            if entry.active {
                entry.plugin_mut(&name).await?.stop().await?;
            }
        }

        let (plugin, plugin_f) = if default_startup {
            let mut plugin = plugin_f().await?;
            plugin.init().await?;
            plugin.start().await?;
            (Some(plugin), None)
        } else {
            let boxed_f: Box<dyn PluginFn> = Box::new(plugin_f);
            (None, Some(boxed_f))
        };

        let entry = Entry { inited: default_startup, active: default_startup, immutable, plugin, plugin_f };
        self.plugins.insert(name, entry);
        Ok(())
    }

    ///Return Config
    pub async fn get_config(&self, name: &str) -> Result<serde_json::Value> {
        if let Some(entry) = self.get(name) {
            entry.plugin(name)?.get_config().await
        } else {
            Err(MqttError::PluginNotFound(name.into()).into())
        }
    }

    ///Load Config
    pub async fn load_config(&self, name: &str) -> Result<()> {
        if let Some(mut entry) = self.get_mut(name) {
            if entry.inited {
                entry.plugin_mut(name).await?.load_config().await?;
                Ok(())
            } else {
                Err(MqttError::PluginNotInitialized(name.into()).into())
            }
        } else {
            Err(MqttError::PluginNotFound(name.into()).into())
        }
    }

    ///Read the configuration of a plugin, the configuration file must exist
    pub fn read_config<'de, T: serde::Deserialize<'de>>(&self, name: &str) -> Result<T> {
        self.cfg.load_config(name)
    }

    ///Read the configuration of a plugin, falling back to default values
    pub fn read_config_default<'de, T: serde::Deserialize<'de>>(&self, name: &str) -> Result<T> {
        self.cfg.load_config_default(name)
    }

    ///Start a Plugin
    pub async fn start(&self, name: &str) -> Result<()> {
        if let Some(mut entry) = self.get_mut(name) {
            if !entry.inited {
                entry.plugin_mut(name).await?.init().await?;
                entry.inited = true;
            }
            if !entry.active {
                entry.plugin_mut(name).await?.start().await?;
                entry.active = true;
            }
            Ok(())
        } else {
            Err(MqttError::PluginNotFound(name.into()).into())
        }
    }

    ///Stop a Plugin
    pub async fn stop(&self, name: &str) -> Result<bool> {
        if let Some(mut entry) = self.get_mut(name) {
            if entry.immutable {
                return Err(MqttError::PluginImmutable(name.into()).into());
            }
            if entry.active {
                let stopped = entry.plugin_mut(name).await?.stop().await?;
                entry.active = !stopped;
                Ok(stopped)
            } else {
                Err(MqttError::PluginNotStarted(name.into()).into())
            }
        } else {
            Err(MqttError::PluginNotFound(name.into()).into())
        }
    }

    ///Stop every active, mutable Plugin
    pub async fn stop_all(&self) {
        let names = self
            .plugins
            .iter()
            .filter(|entry| entry.active && !entry.immutable)
            .map(|entry| entry.key().clone())
            .collect::<Vec<_>>();
        for name in names {
            match self.stop(&name).await {
                Ok(true) => log::info!("{} stopped", name),
                Ok(false) => log::warn!("{} refused to stop", name),
                Err(e) => log::warn!("{} stop failed, {:?}", name, e),
            }
        }
    }

    ///Plugin is active
    pub fn is_active(&self, name: &str) -> bool {
        if let Some(entry) = self.plugins.get(name) {
            entry.active()
        } else {
            false
        }
    }

    ///Get a Plugin
    pub fn get(&self, name: &str) -> Option<impl Deref<Target = Entry> + '_> {
        self.plugins.get(name)
    }

    ///Get a mut Plugin
    pub fn get_mut(&self, name: &str) -> Option<impl DerefMut<Target = Entry> + '_> {
        self.plugins.get_mut(name)
    }

    ///List Plugins as json
    pub async fn to_json(&self) -> Result<Vec<serde_json::Value>> {
        let mut plugins = Vec::new();
        for entry in self.plugins.iter() {
            plugins.push(entry.value().to_json(entry.key()).await?);
        }
        Ok(plugins)
    }
}
