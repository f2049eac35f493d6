#![deny(unsafe_code)]

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use anyhow::anyhow;
use config::{Config, File, Source};
use once_cell::sync::OnceCell;
use serde::Deserialize;

use self::logging::Log;

pub use self::options::Options;

pub mod logging;
pub mod options;

pub type Result<T> = anyhow::Result<T>;

static SETTINGS: OnceCell<Settings> = OnceCell::new();

#[derive(Clone)]
pub struct Settings(Arc<Inner>);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Inner {
    #[serde(default)]
    pub node: Node,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub plugins: Plugins,
    #[serde(default, skip)]
    pub opts: Options,
}

impl Deref for Settings {
    type Target = Inner;
    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl Default for Settings {
    #[inline]
    fn default() -> Self {
        Self(Arc::new(Inner::default()))
    }
}

impl Settings {
    pub fn new(opts: Options) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::with_name("/etc/rmqtt/rmqtt").required(false))
            .add_source(File::with_name("rmqtt").required(false))
            .add_source(
                config::Environment::with_prefix("rmqtt")
                    .try_parsing(true)
                    .list_separator(" ")
                    .with_list_parse_key("plugins.default_startups"),
            );

        if let Some(cfg) = opts.cfg_name.as_ref() {
            builder = builder.add_source(File::with_name(cfg).required(false));
        }

        let mut inner: Inner = builder.build()?.try_deserialize()?;

        //Command line configuration overriding file configuration
        if let Some(id) = opts.node_id {
            inner.node.id = id;
        }
        if let Some(plugins_default_startups) = opts.plugins_default_startups.as_ref() {
            inner.plugins.default_startups.clone_from(plugins_default_startups)
        }

        inner.opts = opts;
        Ok(Self(Arc::new(inner)))
    }

    #[inline]
    pub fn instance() -> &'static Self {
        match SETTINGS.get() {
            Some(c) => c,
            None => {
                unreachable!("Settings not initialized");
            }
        }
    }

    #[inline]
    pub fn init(opts: Options) -> Result<&'static Self> {
        SETTINGS.set(Settings::new(opts)?).map_err(|_| anyhow!("Settings init failed"))?;
        SETTINGS.get().ok_or_else(|| anyhow!("Settings init failed"))
    }

    #[inline]
    pub fn logs() -> Result<()> {
        let cfg = Self::instance();
        log::debug!("Config info is {:?}", cfg.0);
        log::info!("node_id is {}", cfg.node.id);
        log::info!("log config is: {:?}", cfg.log);
        log::info!("plugins dir is {}", cfg.plugins.dir);
        log::info!("plugins default startups: {:?}", cfg.plugins.default_startups);
        Ok(())
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Settings ...")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Node {
    #[serde(default = "Node::id_default")]
    pub id: u64,
}

impl Default for Node {
    #[inline]
    fn default() -> Self {
        Self { id: Self::id_default() }
    }
}

impl Node {
    fn id_default() -> u64 {
        1
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Plugins {
    #[serde(default = "Plugins::dir_default")]
    pub dir: String,
    #[serde(default)]
    pub default_startups: Vec<String>,
}

impl Default for Plugins {
    #[inline]
    fn default() -> Self {
        Self { dir: Self::dir_default(), default_startups: Vec::new() }
    }
}

impl Plugins {
    fn dir_default() -> String {
        "./plugins/".into()
    }

    pub fn load_config<'de, T: serde::Deserialize<'de>>(&self, name: &str) -> Result<T> {
        let (cfg, _) = self.load_config_with_required(name, true)?;
        Ok(cfg)
    }

    pub fn load_config_default<'de, T: serde::Deserialize<'de>>(&self, name: &str) -> Result<T> {
        let (cfg, def) = self.load_config_with_required(name, false)?;
        if def {
            log::warn!("The configuration for plugin '{name}' does not exist, default values will be used!");
        }
        Ok(cfg)
    }

    fn load_config_with_required<'de, T: serde::Deserialize<'de>>(
        &self,
        name: &str,
        required: bool,
    ) -> Result<(T, bool)> {
        let dir = self.dir.trim_end_matches(['/', '\\']);
        let s = Config::builder()
            .add_source(File::with_name(&format!("{dir}/{name}")).required(required))
            .add_source(
                config::Environment::with_prefix(&format!("rmqtt_plugin_{}", name.replace('-', "_")))
                    .try_parsing(true),
            )
            .build()?;
        let count = s.collect()?.len();
        Ok((s.try_deserialize::<T>()?, count == 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct DemoConfig {
        #[serde(default = "DemoConfig::priority_default")]
        priority: u32,
    }

    impl DemoConfig {
        fn priority_default() -> u32 {
            7
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.node.id, 1);
        assert_eq!(settings.plugins.dir, "./plugins/");
        assert!(settings.plugins.default_startups.is_empty());
        assert!(settings.opts.cfg_name.is_none());
    }

    #[test]
    fn test_load_missing_plugin_config_uses_defaults() {
        let plugins = Plugins { dir: "./no-such-plugins-dir/".into(), default_startups: Vec::new() };
        let cfg: DemoConfig = plugins.load_config_default("rmqtt-conf-demo").expect("defaults");
        assert_eq!(cfg.priority, 7);
    }

    #[test]
    fn test_load_missing_plugin_config_required() {
        let plugins = Plugins { dir: "./no-such-plugins-dir/".into(), default_startups: Vec::new() };
        assert!(plugins.load_config::<DemoConfig>("rmqtt-conf-demo").is_err());
    }
}
