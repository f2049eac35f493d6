use thiserror::Error;

#[derive(Error, Debug)]
pub enum MqttError {
    #[error("{0} the plug-in does not exist")]
    PluginNotFound(String),
    #[error("{0} the plug-in is not initialized")]
    PluginNotInitialized(String),
    #[error("{0} the plug-in is not started")]
    PluginNotStarted(String),
    #[error("{0} the plug-in is immutable, it cannot be stopped")]
    PluginImmutable(String),
    #[error("handler id is repetition, {0}")]
    HandlerRepetition(String),
    #[error("config error, {0}")]
    Config(String),
    #[error("{0}")]
    Msg(String),
}

impl From<String> for MqttError {
    #[inline]
    fn from(e: String) -> Self {
        MqttError::Msg(e)
    }
}

impl From<&str> for MqttError {
    #[inline]
    fn from(e: &str) -> Self {
        MqttError::Msg(e.to_string())
    }
}
