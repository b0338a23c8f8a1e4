//! User-facing notifications for capture failures and completions.
//!
//! Desktop notifications go through the freedesktop D-Bus interface; when no
//! session bus is available the message is only logged.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinSet;
use zbus::{Connection, proxy};

/// D-Bus interface for freedesktop Notifications.
#[proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
    /// Send a notification. Returns the notification ID.
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: Vec<&str>,
        hints: HashMap<&str, zbus::zvariant::Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;
}

/// How severe a notification is; selects the icon and log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Info,
    Error,
}

impl Urgency {
    fn icon(self) -> &'static str {
        match self {
            Urgency::Info => "camera-photo",
            Urgency::Error => "dialog-error",
        }
    }
}

/// Reports capture results to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, urgency: Urgency, summary: &str, body: &str);
}

/// Send a desktop notification over the session bus.
pub async fn send_notification(summary: &str, body: &str, icon: &str) -> Result<(), String> {
    let connection = Connection::session()
        .await
        .map_err(|e| format!("Failed to connect to session bus: {}", e))?;

    let proxy = NotificationsProxy::new(&connection)
        .await
        .map_err(|e| format!("Failed to create notifications proxy: {}", e))?;

    proxy
        .notify(
            "Pagesnap",
            0,
            icon,
            summary,
            body,
            vec![],
            HashMap::new(),
            3000, // 3 second timeout
        )
        .await
        .map_err(|e| format!("Failed to send notification: {}", e))?;

    Ok(())
}

/// Notifier that posts desktop notifications from background tasks.
///
/// Sends are tracked so a short-lived process can [`flush`](Self::flush)
/// them before its runtime shuts down.
pub struct DesktopNotifier {
    runtime_handle: tokio::runtime::Handle,
    pending: Mutex<JoinSet<()>>,
}

impl DesktopNotifier {
    pub fn new(runtime_handle: tokio::runtime::Handle) -> Self {
        Self {
            runtime_handle,
            pending: Mutex::new(JoinSet::new()),
        }
    }

    fn track<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.pending.lock() {
            Ok(mut pending) => {
                pending.spawn_on(task, &self.runtime_handle);
            }
            Err(_) => {
                log::warn!("Notification tracker poisoned, sending untracked");
                self.runtime_handle.spawn(task);
            }
        }
    }

    /// Waits for every notification sent so far, giving up after `timeout`.
    pub async fn flush(&self, timeout: Duration) {
        let mut pending = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => return,
        };
        let drained = tokio::time::timeout(timeout, async {
            while let Some(result) = pending.join_next().await {
                if let Err(e) = result {
                    log::warn!("Notification task failed: {}", e);
                }
            }
        })
        .await;
        if drained.is_err() {
            log::warn!(
                "Gave up on {} pending notification(s) after {:?}",
                pending.len(),
                timeout
            );
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, urgency: Urgency, summary: &str, body: &str) {
        LogNotifier.notify(urgency, summary, body);

        let summary = summary.to_string();
        let body = body.to_string();
        self.track(async move {
            if let Err(e) = send_notification(&summary, &body, urgency.icon()).await {
                log::warn!("{}", e);
            }
        });
    }
}

/// Notifier that only writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, urgency: Urgency, summary: &str, body: &str) {
        match urgency {
            Urgency::Info => log::info!("{}: {}", summary, body),
            Urgency::Error => log::error!("{}: {}", summary, body),
        }
    }
}
