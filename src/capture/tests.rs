use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use tokio_util::sync::CancellationToken;

use super::{
    compositor,
    dataurl::DataUrl,
    dependencies::{CaptureDependencies, EditorSink},
    manager::CaptureManager,
    message::{ExtensionMessage, StartMode},
    page::PageSurface,
    segments::SegmentCapturer,
    selection::FixedSelection,
    sources::StaticPage,
    transport::{CaptureResult, CaptureTransport, ChannelTransport},
    types::{CaptureError, CaptureMode, CaptureOutcome, CaptureRequest, CaptureSettings, CaptureStatus},
};
use crate::draw::raster;
use crate::notification::{Notifier, Urgency};
use crate::util::Rect;

/// Document whose every row has a distinct color.
fn document(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(y % 251) as u8, (y / 251) as u8, (x % 256) as u8, 255])
    })
}

fn handle() -> tokio::runtime::Handle {
    tokio::runtime::Handle::current()
}

/// Transport that forwards to another one but answers the given call with
/// `failure` instead.
struct FailingTransport {
    inner: Arc<dyn CaptureTransport>,
    fail_on: usize,
    failure: CaptureResult,
    calls: AtomicUsize,
}

impl FailingTransport {
    fn new(inner: Arc<dyn CaptureTransport>, fail_on: usize, failure: CaptureResult) -> Self {
        Self {
            inner,
            fail_on,
            failure,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CaptureTransport for FailingTransport {
    async fn request_capture(&self) -> CaptureResult {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            self.failure.clone()
        } else {
            self.inner.request_capture().await
        }
    }
}

/// Transport whose captures never come back.
#[derive(Default)]
struct StalledTransport {
    calls: AtomicUsize,
}

#[async_trait]
impl CaptureTransport for StalledTransport {
    async fn request_capture(&self) -> CaptureResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

#[derive(Clone, Default)]
struct MockEditor {
    opened: Arc<Mutex<Vec<String>>>,
    should_fail: bool,
}

impl EditorSink for MockEditor {
    fn open_editor(&self, message: &ExtensionMessage) -> Result<(), CaptureError> {
        if self.should_fail {
            return Err(CaptureError::EditorHandoff("editor closed".to_string()));
        }
        if let ExtensionMessage::OpenEditor { data_url } = message {
            self.opened.lock().unwrap().push(data_url.clone());
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
struct MockNotifier {
    sent: Arc<Mutex<Vec<(Urgency, String)>>>,
}

impl Notifier for MockNotifier {
    fn notify(&self, urgency: Urgency, summary: &str, _body: &str) {
        self.sent.lock().unwrap().push((urgency, summary.to_string()));
    }
}

fn dependencies(
    page: Arc<StaticPage>,
    transport: Arc<dyn CaptureTransport>,
    selection: Option<Rect>,
    editor: MockEditor,
    notifier: MockNotifier,
) -> CaptureDependencies {
    CaptureDependencies {
        transport,
        page,
        selection: Arc::new(FixedSelection(selection)),
        editor: Arc::new(editor),
        notifier: Arc::new(notifier),
    }
}

fn fast_settings() -> CaptureSettings {
    CaptureSettings {
        settle: Duration::ZERO,
        min_selection: 5,
    }
}

fn decode_url(data_url: &str) -> RgbaImage {
    let url: DataUrl = data_url.parse().unwrap();
    raster::decode(url.data()).unwrap()
}

async fn capture_page(page: Arc<StaticPage>) -> RgbaImage {
    let transport = Arc::new(ChannelTransport::spawn(&handle(), page.clone()));
    let capturer = SegmentCapturer::new(page, transport, Duration::ZERO);
    let merged = capturer
        .capture_full_page(&handle(), &CancellationToken::new())
        .await
        .unwrap();
    let image = decode_url(&merged.data_url);
    assert_eq!(image.dimensions(), (merged.width, merged.height));
    image
}

#[tokio::test]
async fn segments_tile_the_page_without_gaps_or_overlap() {
    for (css_height, viewport, dpr) in [
        (2500u32, 1000u32, 1.0f64),
        (3000, 1000, 1.0),
        (999, 1000, 1.0),
        (1234, 300, 2.0),
        (2500, 999, 1.5),
    ] {
        let device_height = (f64::from(css_height) * dpr).round() as u32;
        let page = Arc::new(StaticPage::new(document(8, device_height), viewport, dpr));
        let transport = Arc::new(ChannelTransport::spawn(&handle(), page.clone()));
        let capturer = SegmentCapturer::new(page.clone(), transport, Duration::ZERO);

        let plan = capturer
            .capture_segments(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(plan.segments.len() as u32, css_height.div_ceil(viewport));
        assert_eq!(plan.total_height, device_height);
        let mut next = 0;
        for segment in &plan.segments {
            assert_eq!(segment.offset_y, next, "{css_height}/{viewport}@{dpr}");
            next += segment.height();
        }
        assert_eq!(next, plan.total_height);
        assert!(compositor::composite(&plan.segments, plan.width, plan.total_height).is_ok());
    }
}

#[tokio::test]
async fn stitched_page_matches_document_when_last_scroll_clamps() {
    // 2500px page, 1000px viewport: the third scroll lands at 1500, not 2000.
    let doc = document(40, 2500);
    let merged = capture_page(Arc::new(StaticPage::new(doc.clone(), 1000, 1.0))).await;
    assert_eq!(merged, doc);
}

#[tokio::test]
async fn stitched_page_matches_document_at_high_dpi() {
    let doc = document(80, 5000);
    let merged = capture_page(Arc::new(StaticPage::new(doc.clone(), 1000, 2.0))).await;
    assert_eq!(merged, doc);

    let doc = document(60, 3750);
    let merged = capture_page(Arc::new(StaticPage::new(doc.clone(), 999, 1.5))).await;
    assert_eq!(merged, doc);
}

#[tokio::test]
async fn scroll_position_restored_after_success() {
    let page = Arc::new(StaticPage::new(document(10, 2500), 1000, 1.0));
    page.scroll_to(700);
    capture_page(page.clone()).await;
    assert_eq!(page.scroll_offset(), 700);
}

#[tokio::test]
async fn failure_aborts_remaining_segments_and_restores_scroll() {
    let page = Arc::new(StaticPage::new(document(10, 4000), 1000, 1.0));
    page.scroll_to(1200);
    let transport = Arc::new(FailingTransport::new(
        Arc::new(ChannelTransport::spawn(&handle(), page.clone())),
        2,
        CaptureResult::Error("capture quota exceeded".to_string()),
    ));
    let capturer = SegmentCapturer::new(page.clone(), transport.clone(), Duration::ZERO);

    let err = capturer
        .capture_segments(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(
        matches!(err, CaptureError::TransportFailed(ref msg) if msg.contains("quota")),
        "unexpected error: {err:?}"
    );
    assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    assert_eq!(page.scroll_offset(), 1200);
}

#[tokio::test]
async fn undecodable_segment_aborts_and_restores_scroll() {
    let page = Arc::new(StaticPage::new(document(10, 4000), 1000, 1.0));
    page.scroll_to(1200);
    let transport = Arc::new(FailingTransport::new(
        Arc::new(ChannelTransport::spawn(&handle(), page.clone())),
        2,
        CaptureResult::Image(b"not a png".to_vec()),
    ));
    let capturer = SegmentCapturer::new(page.clone(), transport.clone(), Duration::ZERO);

    let err = capturer
        .capture_segments(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CaptureError::Decode(_)), "unexpected error: {err:?}");
    assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    assert_eq!(page.scroll_offset(), 1200);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_stalled_segment_capture() {
    let page = Arc::new(StaticPage::new(document(10, 3000), 1000, 1.0));
    page.scroll_to(250);
    let transport = Arc::new(StalledTransport::default());
    let capturer = SegmentCapturer::new(page.clone(), transport.clone(), Duration::ZERO);

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });
    let err = capturer.capture_segments(&token).await.unwrap_err();

    assert!(
        matches!(err, CaptureError::Cancelled(ref reason) if reason.contains("capture")),
        "unexpected error: {err:?}"
    );
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    assert_eq!(page.scroll_offset(), 250);
}

#[tokio::test]
async fn cancellation_stops_capture_and_restores_scroll() {
    let page = Arc::new(StaticPage::new(document(10, 3000), 1000, 1.0));
    page.scroll_to(400);
    let transport = Arc::new(ChannelTransport::spawn(&handle(), page.clone()));
    let capturer = SegmentCapturer::new(page.clone(), transport, Duration::from_secs(30));

    let token = CancellationToken::new();
    token.cancel();
    let err = capturer.capture_segments(&token).await.unwrap_err();

    assert!(matches!(err, CaptureError::Cancelled(_)));
    assert_eq!(page.scroll_offset(), 400);
}

async fn run_request(
    deps: CaptureDependencies,
    request: CaptureRequest,
) -> (CaptureManager, CaptureOutcome) {
    let manager = CaptureManager::with_dependencies(&handle(), deps, fast_settings());
    manager.request_capture(request).unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(10), manager.wait_for_outcome())
        .await
        .expect("capture did not finish");
    (manager, outcome)
}

#[tokio::test]
async fn manager_full_page_capture_opens_editor() {
    let doc = document(20, 1800);
    let page = Arc::new(StaticPage::new(doc.clone(), 500, 1.0));
    let editor = MockEditor::default();
    let notifier = MockNotifier::default();
    let transport = Arc::new(ChannelTransport::spawn(&handle(), page.clone()));
    let deps = dependencies(page, transport, None, editor.clone(), notifier.clone());

    let (manager, outcome) =
        run_request(deps, CaptureRequest::new(CaptureMode::FullPage)).await;

    let CaptureOutcome::Success(result) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!((result.width, result.height), (20, 1800));
    let opened = editor.opened.lock().unwrap().clone();
    assert_eq!(opened, vec![result.data_url.clone()]);
    assert_eq!(decode_url(&opened[0]), doc);
    assert_eq!(manager.get_status().await, CaptureStatus::Success);
    assert_eq!(notifier.sent.lock().unwrap()[0].0, Urgency::Info);
}

#[tokio::test]
async fn manager_viewport_capture_uses_current_scroll() {
    let doc = document(16, 900);
    let page = Arc::new(StaticPage::new(doc.clone(), 300, 1.0));
    page.scroll_to(100);
    let transport = Arc::new(ChannelTransport::spawn(&handle(), page.clone()));
    let deps = dependencies(
        page,
        transport,
        None,
        MockEditor::default(),
        MockNotifier::default(),
    );

    let (_, outcome) = run_request(deps, CaptureRequest::new(CaptureMode::Viewport)).await;
    let CaptureOutcome::Success(result) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    let image = decode_url(&result.data_url);
    assert_eq!(image.dimensions(), (16, 300));
    assert_eq!(image.get_pixel(0, 0), doc.get_pixel(0, 100));
}

#[tokio::test]
async fn manager_selection_capture_crops_device_pixels() {
    let doc = document(200, 400);
    let page = Arc::new(StaticPage::new(doc.clone(), 100, 2.0));
    let transport = Arc::new(ChannelTransport::spawn(&handle(), page.clone()));
    let selection = Rect::new(10, 20, 30, 15);
    let deps = dependencies(
        page,
        transport,
        selection,
        MockEditor::default(),
        MockNotifier::default(),
    );

    let (_, outcome) = run_request(deps, CaptureRequest::new(CaptureMode::Selection)).await;
    let CaptureOutcome::Success(result) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    let image = decode_url(&result.data_url);
    assert_eq!(image.dimensions(), (60, 30));
    assert_eq!(image.get_pixel(0, 0), doc.get_pixel(20, 40));
}

#[tokio::test]
async fn manager_reports_abandoned_selection_as_cancelled() {
    let page = Arc::new(StaticPage::new(document(50, 50), 50, 1.0));
    let transport = Arc::new(ChannelTransport::spawn(&handle(), page.clone()));
    let editor = MockEditor::default();
    let deps = dependencies(
        page,
        transport,
        Rect::new(0, 0, 3, 3),
        editor.clone(),
        MockNotifier::default(),
    );

    let (manager, outcome) = run_request(deps, CaptureRequest::new(CaptureMode::Selection)).await;
    assert!(matches!(outcome, CaptureOutcome::Cancelled(_)));
    assert!(matches!(manager.get_status().await, CaptureStatus::Cancelled(_)));
    assert!(editor.opened.lock().unwrap().is_empty());
}

#[tokio::test]
async fn manager_element_capture() {
    let doc = document(100, 600);
    let page = Arc::new(
        StaticPage::new(doc.clone(), 200, 1.0).with_element("#card", Rect::new(5, 250, 40, 30).unwrap()),
    );
    page.scroll_to(200);
    let transport = Arc::new(ChannelTransport::spawn(&handle(), page.clone()));
    let deps = dependencies(
        page,
        transport,
        None,
        MockEditor::default(),
        MockNotifier::default(),
    );

    let request = ExtensionMessage::ElementCapture {
        element_selector: "#card".to_string(),
    }
    .to_capture_request()
    .unwrap();
    let (_, outcome) = run_request(deps, request).await;
    let CaptureOutcome::Success(result) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    let image = decode_url(&result.data_url);
    assert_eq!(image.dimensions(), (40, 30));
    assert_eq!(image.get_pixel(0, 0), doc.get_pixel(5, 250));
}

#[tokio::test]
async fn manager_notifies_on_failure() {
    let page = Arc::new(StaticPage::new(document(10, 100), 100, 1.0));
    let transport = Arc::new(ChannelTransport::spawn(&handle(), page.clone()));
    let notifier = MockNotifier::default();
    let deps = dependencies(
        page,
        transport,
        None,
        MockEditor::default(),
        notifier.clone(),
    );

    let request = CaptureRequest::new(CaptureMode::Element {
        selector: ".missing".to_string(),
    });
    let (manager, outcome) = run_request(deps, request).await;
    match outcome {
        CaptureOutcome::Failed(msg) => assert!(msg.contains(".missing"), "{msg}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(matches!(manager.get_status().await, CaptureStatus::Failed(_)));
    assert_eq!(
        notifier.sent.lock().unwrap().as_slice(),
        &[(Urgency::Error, "Screenshot failed".to_string())]
    );
}

#[tokio::test]
async fn manager_reports_editor_handoff_failure() {
    let page = Arc::new(StaticPage::new(document(10, 100), 100, 1.0));
    let transport = Arc::new(ChannelTransport::spawn(&handle(), page.clone()));
    let editor = MockEditor {
        should_fail: true,
        ..MockEditor::default()
    };
    let deps = dependencies(page, transport, None, editor, MockNotifier::default());

    let (_, outcome) = run_request(deps, CaptureRequest::new(CaptureMode::Viewport)).await;
    assert!(matches!(outcome, CaptureOutcome::Failed(ref msg) if msg.contains("editor closed")));
}

#[tokio::test]
async fn manager_cancel_during_countdown() {
    let page = Arc::new(StaticPage::new(document(10, 100), 100, 1.0));
    let transport = Arc::new(ChannelTransport::spawn(&handle(), page.clone()));
    let editor = MockEditor::default();
    let deps = dependencies(page, transport, None, editor.clone(), MockNotifier::default());
    let manager = CaptureManager::with_dependencies(&handle(), deps, fast_settings());

    manager
        .request_capture(
            CaptureRequest::new(CaptureMode::Viewport).with_delay(Duration::from_secs(60)),
        )
        .unwrap();
    for _ in 0..100 {
        if manager.get_status().await == CaptureStatus::CountingDown {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(manager.cancel_current().await);

    let outcome = tokio::time::timeout(Duration::from_secs(5), manager.wait_for_outcome())
        .await
        .unwrap();
    assert!(matches!(outcome, CaptureOutcome::Cancelled(_)));
    assert!(editor.opened.lock().unwrap().is_empty());
}

#[tokio::test]
async fn dispatch_routes_messages() {
    let page = Arc::new(StaticPage::new(document(10, 100), 100, 1.0));
    let transport = Arc::new(ChannelTransport::spawn(&handle(), page.clone()));
    let editor = MockEditor::default();
    let deps = dependencies(page, transport, None, editor.clone(), MockNotifier::default());
    let manager = CaptureManager::with_dependencies(&handle(), deps, fast_settings());

    manager
        .dispatch(ExtensionMessage::OpenEditor {
            data_url: "data:image/png;base64,AA==".to_string(),
        })
        .unwrap();
    assert_eq!(editor.opened.lock().unwrap().len(), 1);

    assert!(manager.dispatch(ExtensionMessage::CaptureTab).is_err());

    manager
        .dispatch(ExtensionMessage::StartCapture {
            mode: StartMode::Viewport,
            delay: None,
        })
        .unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(10), manager.wait_for_outcome())
        .await
        .unwrap();
    assert!(matches!(outcome, CaptureOutcome::Success(_)));
    assert_eq!(editor.opened.lock().unwrap().len(), 2);
}

#[test]
fn request_capture_returns_error_when_channel_closed() {
    let page = Arc::new(StaticPage::new(document(4, 4), 4, 1.0));
    let deps = CaptureDependencies {
        transport: Arc::new(NeverTransport),
        page,
        selection: Arc::new(FixedSelection(None)),
        editor: Arc::new(MockEditor::default()),
        notifier: Arc::new(MockNotifier::default()),
    };
    let manager = CaptureManager::with_closed_channel_for_test(deps);
    let err = manager
        .request_capture(CaptureRequest::new(CaptureMode::Viewport))
        .expect_err("should fail when channel closed");
    assert!(
        matches!(err, CaptureError::ManagerStopped),
        "unexpected error variant: {err:?}"
    );
}

struct NeverTransport;

#[async_trait]
impl CaptureTransport for NeverTransport {
    async fn request_capture(&self) -> CaptureResult {
        CaptureResult::Error("not connected".to_string())
    }
}
