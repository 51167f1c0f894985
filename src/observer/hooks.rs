use std::fmt;
use std::sync::Arc;

type VisitorHook = Arc<dyn Fn(&str) + 'static>;

/// Optional callbacks notified with the visitor ID once the proxy has synchronised it.
#[derive(Clone, Default)]
pub struct SyncHooks {
    ga4_sync: Option<VisitorHook>,
    chatbot_start: Option<VisitorHook>,
}

impl fmt::Debug for SyncHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncHooks")
            .field("ga4_sync", &self.ga4_sync.is_some())
            .field("chatbot_start", &self.chatbot_start.is_some())
            .finish()
    }
}

impl SyncHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the hook that links the visitor to a GA4 client.
    pub fn on_ga4_sync<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + 'static,
    {
        self.ga4_sync = Some(Arc::new(hook));
        self
    }

    /// Registers the hook that starts the chatbot for the visitor.
    pub fn on_chatbot_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + 'static,
    {
        self.chatbot_start = Some(Arc::new(hook));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ga4_sync.is_none() && self.chatbot_start.is_none()
    }

    /// Runs the registered hooks: GA4 sync first, then chatbot start.
    pub(crate) fn notify(&self, visitor_id: &str) {
        if let Some(hook) = &self.ga4_sync {
            log::debug!("Notifying GA4 sync hook");
            hook(visitor_id);
        }
        if let Some(hook) = &self.chatbot_start {
            log::debug!("Notifying chatbot start hook");
            hook(visitor_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn notify_runs_hooks_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let ga4_calls = calls.clone();
        let chat_calls = calls.clone();
        let hooks = SyncHooks::new()
            .on_chatbot_start(move |id| chat_calls.lock().unwrap().push(format!("chat:{id}")))
            .on_ga4_sync(move |id| ga4_calls.lock().unwrap().push(format!("ga4:{id}")));

        hooks.notify("V1");

        assert_eq!(*calls.lock().unwrap(), vec!["ga4:V1", "chat:V1"]);
    }

    #[test]
    fn empty_hooks_are_a_no_op() {
        let hooks = SyncHooks::new();
        assert!(hooks.is_empty());
        hooks.notify("V1");
    }
}
