use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::RgbaImage;
use tokio::time::Instant;

use survey_share::capability::{Availability, PlatformCapabilities};
use survey_share::clipboard::ClipboardAdapter;
use survey_share::config::ShareConfig;
use survey_share::error::ShareError;
use survey_share::orchestrator::{
    ArtifactRenderState, Connectivity, DeviceSignals, DistributionOrchestrator, PlatformServices,
    RetryDecision, RuntimeEnvironment, ShareRequest,
};
use survey_share::platform::{AsyncClipboard, FileSaver, Launcher, SavedFile, SelectionHost, StagingHandle};
use survey_share::renderer::{PaintError, SharedSurface, SurfaceTarget};
use survey_share::resolver::LinkKind;

const ID: &str = "85ec5b20-5af6-4479-8bd8-34ae409e2d64";
const OTHER_ID: &str = "0f1e2d3c-4b5a-4978-8695-a4b3c2d1e0f9";
const ORIGIN: &str = "https://app.example.com";

/// 可编排失败次数并记录绘制时刻的绘制目标。
#[derive(Default)]
struct ScriptedSurface {
    failures_left: u32,
    fail_always: bool,
    paints: Vec<Instant>,
    pixels: Option<RgbaImage>,
}

impl SurfaceTarget for ScriptedSurface {
    fn is_attached(&self) -> bool {
        true
    }

    fn paint(&mut self, image: &RgbaImage) -> Result<(), PaintError> {
        self.paints.push(Instant::now());
        if self.fail_always || self.failures_left > 0 {
            self.failures_left = self.failures_left.saturating_sub(1);
            return Err(PaintError::Failed("context lost".to_string()));
        }
        self.pixels = Some(image.clone());
        Ok(())
    }

    fn clear(&mut self) {
        self.pixels = None;
    }

    fn snapshot(&self) -> Option<&RgbaImage> {
        self.pixels.as_ref()
    }
}

#[derive(Default)]
struct MemorySaver {
    saved: Mutex<Vec<String>>,
}

#[async_trait]
impl FileSaver for MemorySaver {
    async fn save(&self, file_name: &str, _bytes: &[u8]) -> Result<SavedFile, ShareError> {
        self.saved.lock().expect("lock").push(file_name.to_string());
        Ok(SavedFile {
            file_name: file_name.to_string(),
            location: None,
        })
    }
}

#[derive(Default)]
struct RecordingLauncher {
    opened: Mutex<Vec<String>>,
}

#[async_trait]
impl Launcher for RecordingLauncher {
    async fn open(&self, url: &str) -> Result<(), ShareError> {
        self.opened.lock().expect("lock").push(url.to_string());
        Ok(())
    }
}

struct DeniedClipboard;

#[async_trait]
impl AsyncClipboard for DeniedClipboard {
    async fn write_text(&self, _text: &str) -> Result<(), ShareError> {
        Err(ShareError::ClipboardUnavailable("permission denied".to_string()))
    }
}

#[derive(Default)]
struct MemorySelectionHost {
    next_id: AtomicU64,
    live: Mutex<HashSet<u64>>,
    copied: Mutex<Vec<String>>,
    texts: Mutex<Vec<(u64, String)>>,
}

impl SelectionHost for MemorySelectionHost {
    fn create_staging(&self, text: &str) -> Result<StagingHandle, ShareError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.live.lock().expect("lock").insert(id);
        self.texts.lock().expect("lock").push((id, text.to_string()));
        Ok(StagingHandle(id))
    }

    fn select_all(&self, _handle: StagingHandle) -> Result<(), ShareError> {
        Ok(())
    }

    fn exec_copy(&self) -> bool {
        if let Some((_, text)) = self.texts.lock().expect("lock").last() {
            self.copied.lock().expect("lock").push(text.clone());
        }
        true
    }

    fn remove_staging(&self, handle: StagingHandle) {
        self.live.lock().expect("lock").remove(&handle.0);
    }

    fn staged_count(&self) -> usize {
        self.live.lock().expect("lock").len()
    }
}

struct Harness {
    orchestrator: DistributionOrchestrator,
    surface: Arc<Mutex<ScriptedSurface>>,
    saver: Arc<MemorySaver>,
    launcher: Arc<RecordingLauncher>,
    host: Arc<MemorySelectionHost>,
}

fn harness(identifier: &str, surface: ScriptedSurface) -> Harness {
    let surface = Arc::new(Mutex::new(surface));
    let shared: SharedSurface = surface.clone();
    let saver = Arc::new(MemorySaver::default());
    let launcher = Arc::new(RecordingLauncher::default());
    let host = Arc::new(MemorySelectionHost::default());

    let capabilities = PlatformCapabilities {
        async_clipboard: Availability::Available,
        selection_copy: Availability::Available,
        native_share: Availability::Unavailable,
        file_save: Availability::Available,
    };
    let services = PlatformServices {
        clipboard: ClipboardAdapter::from_capabilities(
            &capabilities,
            Some(Arc::new(DeniedClipboard)),
            Some(host.clone()),
        ),
        capabilities,
        saver: saver.clone(),
        launcher: launcher.clone(),
    };

    let orchestrator = DistributionOrchestrator::new(
        ShareConfig::default(),
        services,
        shared,
        ShareRequest::new(identifier, "Q4 Feedback"),
        RuntimeEnvironment::new(ORIGIN),
    )
    .expect("default config is valid");

    Harness {
        orchestrator,
        surface,
        saver,
        launcher,
        host,
    }
}

fn paint_count(surface: &Arc<Mutex<ScriptedSurface>>) -> usize {
    surface.lock().expect("lock").paints.len()
}

#[tokio::test]
async fn end_to_end_scenario_with_offline_device() {
    let mut h = harness(ID, ScriptedSurface::default());

    let links = h.orchestrator.links().expect("valid identifier");
    assert_eq!(links.canonical, format!("{ORIGIN}/survey/{ID}"));

    h.orchestrator.set_connectivity(Connectivity::Offline);
    h.orchestrator.mount();
    assert_eq!(h.orchestrator.settled().await, ArtifactRenderState::Ready);
    assert_eq!(h.orchestrator.snapshot().attempts, 1);

    let download = h.orchestrator.download(Some("Q4 Feedback")).await;
    assert!(download.success, "download failed: {:?}", download.error);
    assert_eq!(download.detail, "q4_feedback.png");
    assert_eq!(h.saver.saved.lock().expect("lock").as_slice(), ["q4_feedback.png"]);

    assert!(h.orchestrator.notices().iter().any(|n| n.code == "OFFLINE"));
}

#[tokio::test(start_paused = true)]
async fn automatic_retries_follow_exact_backoff() {
    let mut h = harness(
        ID,
        ScriptedSurface {
            failures_left: 2,
            ..Default::default()
        },
    );

    h.orchestrator.mount();
    assert_eq!(h.orchestrator.settled().await, ArtifactRenderState::Ready);

    let paints = h.surface.lock().expect("lock").paints.clone();
    assert_eq!(paints.len(), 3);
    assert_eq!(paints[1] - paints[0], Duration::from_millis(1_000));
    assert_eq!(paints[2] - paints[1], Duration::from_millis(2_000));
    assert_eq!(h.orchestrator.snapshot().attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn exhaustion_is_terminal_until_user_retry_resets_budget() {
    let mut h = harness(
        ID,
        ScriptedSurface {
            fail_always: true,
            ..Default::default()
        },
    );

    h.orchestrator.mount();
    let state = h.orchestrator.settled().await;
    assert!(matches!(
        state,
        ArtifactRenderState::Failed(ShareError::RenderExhausted { attempts: 3, .. })
    ));
    assert_eq!(paint_count(&h.surface), 3);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(paint_count(&h.surface), 3);

    let notices = h.orchestrator.notices();
    assert!(notices.iter().any(|n| n.code == "E_RENDER_EXHAUSTED"));
    assert!(notices.iter().any(|n| n.code == "MANUAL_FALLBACK" && n.message.contains(ID)));
    assert!(!h.orchestrator.download(None).await.success);

    h.surface.lock().expect("lock").fail_always = false;
    assert_eq!(h.orchestrator.retry(), RetryDecision::Started);
    let snapshot = h.orchestrator.snapshot();
    assert_eq!(snapshot.state, ArtifactRenderState::Generating);
    assert_eq!(snapshot.attempts, 0);

    assert_eq!(h.orchestrator.settled().await, ArtifactRenderState::Ready);
    assert_eq!(h.orchestrator.snapshot().attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn unmount_cancels_pending_retry() {
    let mut h = harness(
        ID,
        ScriptedSurface {
            fail_always: true,
            ..Default::default()
        },
    );

    h.orchestrator.mount();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(paint_count(&h.surface), 1);

    h.orchestrator.unmount();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(paint_count(&h.surface), 1);
    assert_eq!(h.orchestrator.state(), ArtifactRenderState::Idle);
}

#[tokio::test(start_paused = true)]
async fn dropping_orchestrator_cancels_pending_retry() {
    let mut h = harness(
        ID,
        ScriptedSurface {
            fail_always: true,
            ..Default::default()
        },
    );

    h.orchestrator.mount();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let surface = h.surface.clone();
    drop(h);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(paint_count(&surface), 1);
}

#[tokio::test(start_paused = true)]
async fn copy_falls_back_to_selection_and_indicator_expires() {
    let mut h = harness(ID, ScriptedSurface::default());

    let outcome = h.orchestrator.copy_link(LinkKind::Short).await;
    assert!(outcome.success);
    assert!(outcome.detail.contains("selection-copy"));
    assert_eq!(
        h.host.copied.lock().expect("lock").as_slice(),
        [format!("{ORIGIN}/s/{ID}")]
    );
    assert_eq!(h.host.staged_count(), 0);

    assert!(h.orchestrator.copied_recently());
    tokio::time::advance(Duration::from_millis(2_001)).await;
    assert!(!h.orchestrator.copied_recently());
}

#[tokio::test]
async fn invalid_identifier_refuses_every_operation() {
    for bad in ["", "abc", "85ec5b20-5af6-4479-8bd8-34ae409e2d6", "85ec5b20_5af6_4479_8bd8_34ae409e2d64"] {
        let mut h = harness(bad, ScriptedSurface::default());
        h.orchestrator.mount();

        assert!(matches!(
            h.orchestrator.settled().await,
            ArtifactRenderState::Failed(ShareError::InvalidInput(_))
        ));
        assert_eq!(h.orchestrator.retry(), RetryDecision::InvalidIdentifier);
        assert!(!h.orchestrator.copy_link(LinkKind::Canonical).await.success);
        assert!(!h.orchestrator.download(None).await.success);
        assert!(!h.orchestrator.open(LinkKind::Canonical).await.success);

        assert_eq!(paint_count(&h.surface), 0);
        assert!(h.saver.saved.lock().expect("lock").is_empty());
        assert!(h.launcher.opened.lock().expect("lock").is_empty());
        assert!(h.host.copied.lock().expect("lock").is_empty());
    }
}

#[tokio::test]
async fn origin_change_regenerates_with_new_origin_only() {
    let mut h = harness(ID, ScriptedSurface::default());
    h.orchestrator.mount();
    h.orchestrator.settled().await;
    let before = h.orchestrator.links().expect("links").canonical;
    let first_sequence = h.orchestrator.snapshot().sequence;

    h.orchestrator.set_origin("https://preview.example.net");
    assert_eq!(h.orchestrator.settled().await, ArtifactRenderState::Ready);
    let after = h.orchestrator.links().expect("links").canonical;

    assert!(h.orchestrator.snapshot().sequence > first_sequence);
    assert_eq!(
        before.trim_start_matches(ORIGIN),
        after.trim_start_matches("https://preview.example.net")
    );
    assert_eq!(paint_count(&h.surface), 2);
}

#[tokio::test]
async fn default_download_name_is_sanitized_title_and_identifier() {
    let mut h = harness(ID, ScriptedSurface::default());
    h.orchestrator.mount();
    h.orchestrator.settled().await;

    let outcome = h.orchestrator.download(None).await;
    assert!(outcome.success);
    assert_eq!(outcome.detail, format!("q4_feedback_{ID}_qr.png"));
}

#[tokio::test(start_paused = true)]
async fn identifier_change_resets_exhausted_budget() {
    let mut h = harness(
        ID,
        ScriptedSurface {
            failures_left: 3,
            ..Default::default()
        },
    );

    h.orchestrator.mount();
    assert!(matches!(
        h.orchestrator.settled().await,
        ArtifactRenderState::Failed(ShareError::RenderExhausted { attempts: 3, .. })
    ));

    h.orchestrator.set_identifier(OTHER_ID);
    let snapshot = h.orchestrator.snapshot();
    assert_eq!(snapshot.state, ArtifactRenderState::Generating);
    assert_eq!(snapshot.attempts, 0);

    assert_eq!(h.orchestrator.settled().await, ArtifactRenderState::Ready);
    assert_eq!(h.orchestrator.snapshot().attempts, 1);
    assert_eq!(paint_count(&h.surface), 4);
    assert!(h.orchestrator.links().expect("links").canonical.ends_with(OTHER_ID));
}

#[tokio::test]
async fn switching_to_invalid_identifier_clears_the_artifact() {
    let mut h = harness(ID, ScriptedSurface::default());
    h.orchestrator.mount();
    assert_eq!(h.orchestrator.settled().await, ArtifactRenderState::Ready);
    assert!(h.surface.lock().expect("lock").pixels.is_some());

    h.orchestrator.set_identifier("bad");

    assert!(matches!(
        h.orchestrator.state(),
        ArtifactRenderState::Failed(ShareError::InvalidInput(_))
    ));
    assert!(h.surface.lock().expect("lock").pixels.is_none());
    assert_eq!(paint_count(&h.surface), 1);
    assert!(!h.orchestrator.download(None).await.success);
}

#[tokio::test(start_paused = true)]
async fn device_change_after_failure_does_not_regenerate() {
    let mut h = harness(
        ID,
        ScriptedSurface {
            fail_always: true,
            ..Default::default()
        },
    );

    h.orchestrator.mount();
    assert!(matches!(h.orchestrator.settled().await, ArtifactRenderState::Failed(_)));
    let sequence = h.orchestrator.snapshot().sequence;

    h.orchestrator.set_device(DeviceSignals::new("Mozilla/5.0 (iPhone)", 390, 844));
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(h.orchestrator.artifact_size(), 280);
    assert!(matches!(h.orchestrator.state(), ArtifactRenderState::Failed(_)));
    assert_eq!(h.orchestrator.snapshot().sequence, sequence);
    assert_eq!(paint_count(&h.surface), 3);
}

#[tokio::test(start_paused = true)]
async fn retry_after_unmount_paints_nothing() {
    let mut h = harness(
        ID,
        ScriptedSurface {
            fail_always: true,
            ..Default::default()
        },
    );

    h.orchestrator.mount();
    h.orchestrator.settled().await;
    h.orchestrator.unmount();

    assert_eq!(h.orchestrator.retry(), RetryDecision::NotMounted);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(paint_count(&h.surface), 3);
    assert_eq!(h.orchestrator.state(), ArtifactRenderState::Idle);
}
