use std::sync::Arc;

use tokio::sync::{Mutex, Notify, mpsc};
use tokio_util::sync::CancellationToken;

use crate::capture::{
    dependencies::CaptureDependencies,
    message::ExtensionMessage,
    pipeline::{PipelineContext, perform_capture},
    types::{CaptureError, CaptureOutcome, CaptureRequest, CaptureSettings, CaptureStatus},
};
use crate::notification::Urgency;

/// Shared state for managing async capture operations.
///
/// Requests are queued to a background task that runs them one at a time, so
/// at most one capture touches the page's scroll position at once.
#[derive(Clone)]
pub struct CaptureManager {
    /// Channel for sending capture requests.
    request_tx: mpsc::UnboundedSender<CaptureRequest>,
    /// Shared status of the current capture operation.
    status: Arc<Mutex<CaptureStatus>>,
    /// Shared result of the last capture (if any).
    last_result: Arc<Mutex<Option<CaptureOutcome>>>,
    /// Signalled whenever a new result is stored.
    result_ready: Arc<Notify>,
    /// Cancellation token of the request currently running.
    current: Arc<Mutex<Option<CancellationToken>>>,
    dependencies: Arc<CaptureDependencies>,
}

impl CaptureManager {
    /// Create a capture manager and spawn its worker on `runtime_handle`.
    pub fn with_dependencies(
        runtime_handle: &tokio::runtime::Handle,
        dependencies: CaptureDependencies,
        settings: CaptureSettings,
    ) -> Self {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<CaptureRequest>();
        let status = Arc::new(Mutex::new(CaptureStatus::Idle));
        let last_result = Arc::new(Mutex::new(None));
        let result_ready = Arc::new(Notify::new());
        let current = Arc::new(Mutex::new(None::<CancellationToken>));
        let dependencies = Arc::new(dependencies);

        let status_clone = status.clone();
        let result_clone = last_result.clone();
        let ready_clone = result_ready.clone();
        let current_clone = current.clone();
        let deps_clone = dependencies.clone();
        let handle = runtime_handle.clone();

        // Spawn background task to handle capture requests
        runtime_handle.spawn(async move {
            while let Some(request) = request_rx.recv().await {
                log::debug!("Processing capture request: {:?}", request.mode);

                let cancel = CancellationToken::new();
                *current_clone.lock().await = Some(cancel.clone());

                let ctx = PipelineContext {
                    dependencies: deps_clone.clone(),
                    settings,
                    runtime_handle: handle.clone(),
                    status: status_clone.clone(),
                    cancel,
                };

                let outcome = match perform_capture(request, &ctx).await {
                    Ok(result) => {
                        log::info!(
                            "Capture successful: {}x{} ({:?})",
                            result.width,
                            result.height,
                            result.mode
                        );
                        deps_clone.notifier.notify(
                            Urgency::Info,
                            "Screenshot captured",
                            &format!("{}x{} image opened in the editor", result.width, result.height),
                        );
                        *status_clone.lock().await = CaptureStatus::Success;
                        CaptureOutcome::Success(result)
                    }
                    Err(CaptureError::Cancelled(reason)) => {
                        log::info!("Capture cancelled: {}", reason);
                        *status_clone.lock().await = CaptureStatus::Cancelled(reason.clone());
                        CaptureOutcome::Cancelled(reason)
                    }
                    Err(e) => {
                        let error_message = e.to_string();
                        log::error!("Capture failed: {}", error_message);
                        deps_clone
                            .notifier
                            .notify(Urgency::Error, "Screenshot failed", &error_message);
                        *status_clone.lock().await = CaptureStatus::Failed(error_message.clone());
                        CaptureOutcome::Failed(error_message)
                    }
                };

                *current_clone.lock().await = None;
                *result_clone.lock().await = Some(outcome);
                ready_clone.notify_one();
            }
        });

        Self {
            request_tx,
            status,
            last_result,
            result_ready,
            current,
            dependencies,
        }
    }

    /// Request a screenshot capture.
    ///
    /// This is non-blocking and returns immediately. The capture happens
    /// asynchronously in the background.
    pub fn request_capture(&self, request: CaptureRequest) -> Result<(), CaptureError> {
        self.request_tx
            .send(request)
            .map_err(|_| CaptureError::ManagerStopped)?;

        Ok(())
    }

    /// Route an incoming message: capture actions are queued, `openEditor`
    /// goes straight to the editor sink.
    pub fn dispatch(&self, message: ExtensionMessage) -> Result<(), CaptureError> {
        if let Some(request) = message.to_capture_request() {
            return self.request_capture(request);
        }
        match message {
            ExtensionMessage::OpenEditor { .. } => self.dependencies.editor.open_editor(&message),
            other => Err(CaptureError::TransportFailed(format!(
                "{} is answered by the capture transport",
                other.to_json()
            ))),
        }
    }

    /// Cancel the capture currently running, if any.
    ///
    /// The page's scroll position is restored before the outcome is reported.
    pub async fn cancel_current(&self) -> bool {
        match self.current.lock().await.as_ref() {
            Some(token) => {
                log::info!("Cancelling capture in progress");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Get the current capture status.
    pub async fn get_status(&self) -> CaptureStatus {
        self.status.lock().await.clone()
    }

    /// Get the result of the last capture and clear it.
    pub async fn take_result(&self) -> Option<CaptureOutcome> {
        self.last_result.lock().await.take()
    }

    /// Try to get the result without waiting (non-blocking).
    pub fn try_take_result(&self) -> Option<CaptureOutcome> {
        self.last_result.try_lock().ok().and_then(|mut r| r.take())
    }

    /// Wait until a capture finishes and take its outcome.
    pub async fn wait_for_outcome(&self) -> CaptureOutcome {
        loop {
            if let Some(outcome) = self.take_result().await {
                return outcome;
            }
            self.result_ready.notified().await;
        }
    }

    /// Reset status to idle.
    pub async fn reset(&self) {
        *self.status.lock().await = CaptureStatus::Idle;
    }
}

#[cfg(test)]
impl CaptureManager {
    pub(crate) fn with_closed_channel_for_test(dependencies: CaptureDependencies) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<CaptureRequest>();
        drop(rx);
        Self {
            request_tx: tx,
            status: Arc::new(Mutex::new(CaptureStatus::Idle)),
            last_result: Arc::new(Mutex::new(None)),
            result_ready: Arc::new(Notify::new()),
            current: Arc::new(Mutex::new(None)),
            dependencies: Arc::new(dependencies),
        }
    }
}
