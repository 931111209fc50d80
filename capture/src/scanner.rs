use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};

use crate::camera::{Camera, CaptureError, FrameStream, PermissionState};
use crate::decoder::BarcodeDecoder;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);
const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerRoute {
    StartPolling,
    ShowPermissionModal,
    ShowUnsupported,
}

/// Picks what the scanner screen does for a permission state. `Prompt` starts
/// polling because acquiring the stream is what asks the user.
pub fn route(permission: PermissionState) -> ScannerRoute {
    match permission {
        PermissionState::Granted | PermissionState::Prompt => ScannerRoute::StartPolling,
        PermissionState::Denied => ScannerRoute::ShowPermissionModal,
        PermissionState::Unsupported => ScannerRoute::ShowUnsupported,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Found(String),
    Cancelled,
    Failed(String),
}

pub enum ScannerStart {
    Polling(ScanSession),
    PermissionModal,
    Unsupported,
    NoCamera,
    Failed(String),
}

pub struct Scanner {
    camera: Arc<dyn Camera>,
    decoder: Arc<dyn BarcodeDecoder>,
    interval: Duration,
}

impl Scanner {
    pub fn new(camera: Arc<dyn Camera>, decoder: Arc<dyn BarcodeDecoder>) -> Self {
        Self {
            camera,
            decoder,
            interval: DEFAULT_INTERVAL,
        }
    }

    /// Sets the frame period. A zero period is raised to one millisecond.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_INTERVAL);
        self
    }

    pub async fn open(&self) -> ScannerStart {
        let permission = self.camera.permission().await;
        debug!("Camera permission: {}", permission.as_ref());
        match route(permission) {
            ScannerRoute::StartPolling => {}
            ScannerRoute::ShowPermissionModal => return ScannerStart::PermissionModal,
            ScannerRoute::ShowUnsupported => return ScannerStart::Unsupported,
        }

        let stream = match self.camera.acquire().await {
            Ok(stream) => stream,
            Err(CaptureError::PermissionDenied) => {
                info!("Camera access refused at prompt");
                return ScannerStart::PermissionModal;
            }
            Err(CaptureError::NoCamera) => return ScannerStart::NoCamera,
            Err(CaptureError::Device(message)) => {
                warn!("Failed to open camera: {}", message);
                return ScannerStart::Failed(message);
            }
        };
        ScannerStart::Polling(ScanSession::spawn(
            stream,
            self.decoder.clone(),
            self.interval,
        ))
    }
}

/// A running capture loop. The loop owns the camera stream; dropping the
/// session cancels it.
pub struct ScanSession {
    cancel: watch::Sender<bool>,
    outcome: Option<oneshot::Receiver<ScanOutcome>>,
}

impl ScanSession {
    fn spawn(
        stream: Box<dyn FrameStream>,
        decoder: Arc<dyn BarcodeDecoder>,
        period: Duration,
    ) -> Self {
        let (cancel, cancelled) = watch::channel(false);
        let (outcome_tx, outcome_rx) = oneshot::channel();
        tokio::spawn(capture_loop(stream, decoder, period, cancelled, outcome_tx));
        Self {
            cancel,
            outcome: Some(outcome_rx),
        }
    }

    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Waits for the loop to finish. Yields `None` once the outcome has
    /// already been taken.
    pub async fn outcome(&mut self) -> Option<ScanOutcome> {
        let receiver = self.outcome.take()?;
        Some(receiver.await.unwrap_or_else(|_| ended_early()))
    }

    /// Non-blocking variant of [`ScanSession::outcome`] for tick-driven callers.
    pub fn try_outcome(&mut self) -> Option<ScanOutcome> {
        let receiver = self.outcome.as_mut()?;
        let outcome = match receiver.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => ended_early(),
        };
        self.outcome = None;
        Some(outcome)
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.cancel.send_replace(true);
    }
}

fn ended_early() -> ScanOutcome {
    ScanOutcome::Failed("Scan task ended unexpectedly".to_string())
}

async fn capture_loop(
    mut stream: Box<dyn FrameStream>,
    decoder: Arc<dyn BarcodeDecoder>,
    period: Duration,
    mut cancelled: watch::Receiver<bool>,
    outcome_tx: oneshot::Sender<ScanOutcome>,
) {
    let outcome = poll_frames(stream.as_mut(), decoder, period, &mut cancelled).await;
    stream.release();
    info!("Scan finished: {:?}", outcome);
    // the session may already be gone
    let _ = outcome_tx.send(outcome);
}

async fn poll_frames(
    stream: &mut dyn FrameStream,
    decoder: Arc<dyn BarcodeDecoder>,
    period: Duration,
    cancelled: &mut watch::Receiver<bool>,
) -> ScanOutcome {
    let mut ticker = interval(period);
    // a decode outlasting the period skips ticks instead of queueing them
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        if *cancelled.borrow_and_update() {
            return ScanOutcome::Cancelled;
        }
        tokio::select! {
            biased;
            changed = cancelled.changed() => {
                if changed.is_err() {
                    return ScanOutcome::Cancelled;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        let frame = match stream.snapshot().await {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(e) => {
                warn!("Frame capture failed: {}", e);
                return ScanOutcome::Failed(e.to_string());
            }
        };
        let decoder = decoder.clone();
        let decoded = match tokio::task::spawn_blocking(move || decoder.decode(&frame)).await {
            Ok(decoded) => decoded,
            Err(e) => return ScanOutcome::Failed(e.to_string()),
        };
        if *cancelled.borrow() {
            return ScanOutcome::Cancelled;
        }
        if let Some(text) = decoded {
            info!("Decoded barcode {}", text);
            return ScanOutcome::Found(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::DynamicImage;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TICK: Duration = Duration::from_millis(10);

    #[derive(Default)]
    struct Counters {
        acquired: AtomicUsize,
        active: AtomicUsize,
        snapshots: AtomicUsize,
    }

    impl Counters {
        fn active(&self) -> usize {
            self.active.load(Ordering::SeqCst)
        }

        fn snapshots(&self) -> usize {
            self.snapshots.load(Ordering::SeqCst)
        }
    }

    struct MockCamera {
        permission: PermissionState,
        acquire_error: Option<CaptureError>,
        fail_snapshots: bool,
        counters: Arc<Counters>,
    }

    impl MockCamera {
        fn new(permission: PermissionState) -> Self {
            Self {
                permission,
                acquire_error: None,
                fail_snapshots: false,
                counters: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl Camera for MockCamera {
        async fn permission(&self) -> PermissionState {
            self.permission
        }

        async fn acquire(&self) -> Result<Box<dyn FrameStream>, CaptureError> {
            if let Some(e) = &self.acquire_error {
                return Err(e.clone());
            }
            self.counters.acquired.fetch_add(1, Ordering::SeqCst);
            self.counters.active.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockStream {
                counters: self.counters.clone(),
                fail: self.fail_snapshots,
                released: false,
            }))
        }
    }

    struct MockStream {
        counters: Arc<Counters>,
        fail: bool,
        released: bool,
    }

    #[async_trait]
    impl FrameStream for MockStream {
        async fn snapshot(&mut self) -> Result<Option<DynamicImage>, CaptureError> {
            self.counters.snapshots.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CaptureError::Device("unplugged".to_string()));
            }
            Ok(Some(DynamicImage::new_luma8(1, 1)))
        }

        fn release(&mut self) {
            if !self.released {
                self.released = true;
                self.counters.active.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    impl Drop for MockStream {
        fn drop(&mut self) {
            self.release();
        }
    }

    /// Misses until `hit_after` frames have been seen, then reads `text`.
    struct MockDecoder {
        hit_after: Option<usize>,
        calls: AtomicUsize,
    }

    impl MockDecoder {
        fn hits_after(frames: usize) -> Arc<Self> {
            Arc::new(Self {
                hit_after: Some(frames),
                calls: AtomicUsize::new(0),
            })
        }

        fn never() -> Arc<Self> {
            Arc::new(Self {
                hit_after: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl BarcodeDecoder for MockDecoder {
        fn decode(&self, _frame: &DynamicImage) -> Option<String> {
            let seen = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.hit_after {
                Some(after) if seen >= after => Some("012345678905".to_string()),
                _ => None,
            }
        }
    }

    async fn start(camera: MockCamera, decoder: Arc<MockDecoder>) -> ScannerStart {
        Scanner::new(Arc::new(camera), decoder)
            .with_interval(TICK)
            .open()
            .await
    }

    async fn polling(camera: MockCamera, decoder: Arc<MockDecoder>) -> ScanSession {
        match start(camera, decoder).await {
            ScannerStart::Polling(session) => session,
            _ => panic!("scanner did not start polling"),
        }
    }

    #[rstest]
    #[case(PermissionState::Granted, ScannerRoute::StartPolling)]
    #[case(PermissionState::Prompt, ScannerRoute::StartPolling)]
    #[case(PermissionState::Denied, ScannerRoute::ShowPermissionModal)]
    #[case(PermissionState::Unsupported, ScannerRoute::ShowUnsupported)]
    fn routes_on_permission(#[case] permission: PermissionState, #[case] expected: ScannerRoute) {
        assert_eq!(route(permission), expected);
    }

    #[tokio::test]
    async fn stops_capturing_after_a_decode() {
        let camera = MockCamera::new(PermissionState::Granted);
        let counters = camera.counters.clone();
        let mut session = polling(camera, MockDecoder::hits_after(2)).await;

        let outcome = session.outcome().await;
        assert_eq!(outcome, Some(ScanOutcome::Found("012345678905".to_string())));
        assert_eq!(counters.active(), 0);
        assert_eq!(counters.snapshots(), 3);

        tokio::time::sleep(TICK * 5).await;
        assert_eq!(counters.snapshots(), 3);
    }

    #[tokio::test]
    async fn zero_interval_still_polls() {
        let camera = MockCamera::new(PermissionState::Granted);
        let scanner = Scanner::new(Arc::new(camera), MockDecoder::hits_after(1))
            .with_interval(Duration::ZERO);
        let ScannerStart::Polling(mut session) = scanner.open().await else {
            panic!("scanner did not start polling");
        };

        assert_eq!(
            session.outcome().await,
            Some(ScanOutcome::Found("012345678905".to_string()))
        );
    }

    #[tokio::test]
    async fn same_code_on_consecutive_frames_is_emitted_once() {
        let camera = MockCamera::new(PermissionState::Granted);
        let counters = camera.counters.clone();
        let mut session = polling(camera, MockDecoder::hits_after(0)).await;

        tokio::time::sleep(TICK * 5).await;
        assert_eq!(
            session.try_outcome(),
            Some(ScanOutcome::Found("012345678905".to_string()))
        );
        assert_eq!(session.try_outcome(), None);
        assert_eq!(session.outcome().await, None);
        assert_eq!(counters.snapshots(), 1);
    }

    #[tokio::test]
    async fn cancel_releases_the_stream() {
        let camera = MockCamera::new(PermissionState::Granted);
        let counters = camera.counters.clone();
        let mut session = polling(camera, MockDecoder::never()).await;

        tokio::time::sleep(TICK * 3).await;
        assert_eq!(session.try_outcome(), None);
        session.cancel();

        assert_eq!(session.outcome().await, Some(ScanOutcome::Cancelled));
        assert_eq!(counters.active(), 0);
        let captured = counters.snapshots();
        tokio::time::sleep(TICK * 5).await;
        assert_eq!(counters.snapshots(), captured);
    }

    #[tokio::test]
    async fn dropping_the_session_cancels_it() {
        let camera = MockCamera::new(PermissionState::Granted);
        let counters = camera.counters.clone();
        let session = polling(camera, MockDecoder::never()).await;

        drop(session);
        tokio::time::sleep(TICK * 5).await;
        assert_eq!(counters.active(), 0);
    }

    #[tokio::test]
    async fn denied_permission_never_opens_the_camera() {
        let camera = MockCamera::new(PermissionState::Denied);
        let counters = camera.counters.clone();

        let started = start(camera, MockDecoder::hits_after(0)).await;
        assert!(matches!(started, ScannerStart::PermissionModal));
        assert_eq!(counters.acquired.load(Ordering::SeqCst), 0);
        assert_eq!(counters.active(), 0);
    }

    #[rstest]
    #[case(CaptureError::PermissionDenied)]
    #[case(CaptureError::NoCamera)]
    #[case(CaptureError::Device("busy".to_string()))]
    #[tokio::test]
    async fn failed_acquisition_is_routed(#[case] error: CaptureError) {
        let mut camera = MockCamera::new(PermissionState::Prompt);
        camera.acquire_error = Some(error.clone());

        let started = start(camera, MockDecoder::hits_after(0)).await;
        match error {
            CaptureError::PermissionDenied => {
                assert!(matches!(started, ScannerStart::PermissionModal))
            }
            CaptureError::NoCamera => assert!(matches!(started, ScannerStart::NoCamera)),
            CaptureError::Device(message) => {
                assert!(matches!(started, ScannerStart::Failed(m) if m == message))
            }
        }
    }

    #[tokio::test]
    async fn unsupported_camera_is_reported() {
        let started = start(
            MockCamera::new(PermissionState::Unsupported),
            MockDecoder::never(),
        )
        .await;
        assert!(matches!(started, ScannerStart::Unsupported));
    }

    #[tokio::test]
    async fn device_error_releases_the_stream() {
        let mut camera = MockCamera::new(PermissionState::Granted);
        camera.fail_snapshots = true;
        let counters = camera.counters.clone();
        let mut session = polling(camera, MockDecoder::never()).await;

        assert!(matches!(
            session.outcome().await,
            Some(ScanOutcome::Failed(_))
        ));
        assert_eq!(counters.active(), 0);
    }
}
