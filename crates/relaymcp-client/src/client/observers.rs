//! Notification observer registry.
//!
//! Server notifications fan out to per-kind observers; anything without
//! a dedicated hook lands on the generic observer. Callback lists are
//! cloned out of the lock before invocation.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{debug, warn};

use relaymcp_protocol::types::{
    LoggingMessageNotification, ProgressNotification, ResourceUpdatedNotification, methods,
};

type GenericFn = dyn Fn(&str, Option<&Value>) + Send + Sync;
type UnitFn = dyn Fn() + Send + Sync;
type UriFn = dyn Fn(&str) + Send + Sync;
type LogFn = dyn Fn(&LoggingMessageNotification) + Send + Sync;
type ProgressFn = dyn Fn(&ProgressNotification) + Send + Sync;

#[derive(Default)]
struct Lists {
    generic: Vec<Arc<GenericFn>>,
    tool_list_changed: Vec<Arc<UnitFn>>,
    resource_list_changed: Vec<Arc<UnitFn>>,
    resource_updated: Vec<Arc<UriFn>>,
    prompt_list_changed: Vec<Arc<UnitFn>>,
    log_message: Vec<Arc<LogFn>>,
    progress: Vec<Arc<ProgressFn>>,
}

/// Observer registry for inbound notifications.
#[derive(Default)]
pub(crate) struct NotificationObservers {
    lists: Mutex<Lists>,
}

impl std::fmt::Debug for NotificationObservers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationObservers").finish_non_exhaustive()
    }
}

impl NotificationObservers {
    pub(crate) fn on_notification<F>(&self, callback: F)
    where
        F: Fn(&str, Option<&Value>) + Send + Sync + 'static,
    {
        self.lists
            .lock()
            .expect("observer mutex poisoned")
            .generic
            .push(Arc::new(callback));
    }

    pub(crate) fn on_tool_list_changed<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.lists
            .lock()
            .expect("observer mutex poisoned")
            .tool_list_changed
            .push(Arc::new(callback));
    }

    pub(crate) fn on_resource_list_changed<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.lists
            .lock()
            .expect("observer mutex poisoned")
            .resource_list_changed
            .push(Arc::new(callback));
    }

    pub(crate) fn on_resource_updated<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.lists
            .lock()
            .expect("observer mutex poisoned")
            .resource_updated
            .push(Arc::new(callback));
    }

    pub(crate) fn on_prompt_list_changed<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.lists
            .lock()
            .expect("observer mutex poisoned")
            .prompt_list_changed
            .push(Arc::new(callback));
    }

    pub(crate) fn on_log_message<F>(&self, callback: F)
    where
        F: Fn(&LoggingMessageNotification) + Send + Sync + 'static,
    {
        self.lists
            .lock()
            .expect("observer mutex poisoned")
            .log_message
            .push(Arc::new(callback));
    }

    pub(crate) fn on_progress<F>(&self, callback: F)
    where
        F: Fn(&ProgressNotification) + Send + Sync + 'static,
    {
        self.lists
            .lock()
            .expect("observer mutex poisoned")
            .progress
            .push(Arc::new(callback));
    }

    /// Route one inbound notification to its observers.
    pub(crate) fn route(&self, method: &str, params: Option<&Value>) {
        match method {
            methods::TOOLS_LIST_CHANGED => {
                for cb in self.snapshot(|l| l.tool_list_changed.clone()) {
                    cb();
                }
            }
            methods::RESOURCES_LIST_CHANGED => {
                for cb in self.snapshot(|l| l.resource_list_changed.clone()) {
                    cb();
                }
            }
            methods::RESOURCES_UPDATED => {
                match params
                    .cloned()
                    .map(serde_json::from_value::<ResourceUpdatedNotification>)
                {
                    Some(Ok(update)) => {
                        for cb in self.snapshot(|l| l.resource_updated.clone()) {
                            cb(&update.uri);
                        }
                    }
                    _ => warn!("resource update notification without a valid uri"),
                }
            }
            methods::PROMPTS_LIST_CHANGED => {
                for cb in self.snapshot(|l| l.prompt_list_changed.clone()) {
                    cb();
                }
            }
            methods::LOG_MESSAGE => {
                match params
                    .cloned()
                    .map(serde_json::from_value::<LoggingMessageNotification>)
                {
                    Some(Ok(message)) => {
                        for cb in self.snapshot(|l| l.log_message.clone()) {
                            cb(&message);
                        }
                    }
                    _ => warn!("malformed log message notification"),
                }
            }
            methods::PROGRESS => {
                match params
                    .cloned()
                    .map(serde_json::from_value::<ProgressNotification>)
                {
                    Some(Ok(progress)) => {
                        for cb in self.snapshot(|l| l.progress.clone()) {
                            cb(&progress);
                        }
                    }
                    _ => warn!("malformed progress notification"),
                }
            }
            methods::CANCELLED => {
                debug!("server cancelled a request: {params:?}");
            }
            other => {
                debug!("unrouted notification: {other}");
            }
        }

        // The generic observer sees everything, routed or not.
        for cb in self.snapshot(|l| l.generic.clone()) {
            cb(method, params);
        }
    }

    fn snapshot<T>(&self, pick: impl FnOnce(&Lists) -> Vec<T>) -> Vec<T> {
        pick(&self.lists.lock().expect("observer mutex poisoned"))
    }
}
