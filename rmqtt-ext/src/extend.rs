use crate::hook::{DefaultHookManager, HookManager};

pub struct Manager {
    hook_mgr: Box<dyn HookManager>,
}

impl Manager {
    #[inline]
    pub(crate) fn new() -> Self {
        Self { hook_mgr: Box::new(DefaultHookManager::new()) }
    }

    #[inline]
    pub fn hook_mgr(&self) -> &dyn HookManager {
        self.hook_mgr.as_ref()
    }
}
