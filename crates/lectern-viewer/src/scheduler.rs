//! Render scheduling with coalescing.
//!
//! At most one render runs at a time. While it runs, new targets overwrite a
//! single pending slot, so a burst of page changes renders the first and
//! the last and skips everything in between.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lectern_common::StorageError;
use lectern_session::{DocumentId, PageIndex};
use tokio::sync::watch;

use crate::documents::DocumentSource;
use crate::render::Renderer;

/// What should be on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTarget {
    pub document: Option<DocumentId>,
    pub page: PageIndex,
    /// Fetch the document again even if it is already loaded.
    pub reload: bool,
}

impl RenderTarget {
    pub fn page(document: Option<DocumentId>, page: PageIndex) -> Self {
        Self {
            document,
            page,
            reload: false,
        }
    }

    pub fn reload(document: Option<DocumentId>, page: PageIndex) -> Self {
        Self {
            document,
            page,
            reload: true,
        }
    }
}

/// What is currently on screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DisplayState {
    #[default]
    Idle,
    Showing {
        document: DocumentId,
        page: PageIndex,
        page_count: u32,
    },
    /// No document selected, or it could not be loaded.
    Unavailable,
}

impl DisplayState {
    pub fn page_count(&self) -> Option<u32> {
        match self {
            DisplayState::Showing { page_count, .. } => Some(*page_count),
            _ => None,
        }
    }
}

#[derive(Default)]
struct Slot {
    in_flight: bool,
    pending: Option<RenderTarget>,
}

/// Held by the task that owns `in_flight`. If that task dies without
/// finishing (a renderer panic), the slot is released so later requests
/// start a fresh render instead of queueing forever.
struct InFlight<'a> {
    slot: &'a Mutex<Slot>,
    finished: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut slot = lock(self.slot);
        slot.in_flight = false;
        if let Some(dropped) = slot.pending.take() {
            tracing::debug!(page = dropped.page.get(), "Discarding pending render");
        }
        tracing::error!("Render task aborted; scheduler released");
    }
}

struct Inner {
    slot: Mutex<Slot>,
    /// Only the task holding `in_flight` touches this.
    loaded: Mutex<Option<(DocumentId, u32)>>,
    source: Arc<dyn DocumentSource>,
    renderer: Arc<dyn Renderer>,
    display: watch::Sender<DisplayState>,
}

/// Serializes renders and coalesces requests made while one is running.
#[derive(Clone)]
pub struct RenderScheduler {
    inner: Arc<Inner>,
}

impl RenderScheduler {
    pub fn new(source: Arc<dyn DocumentSource>, renderer: Arc<dyn Renderer>) -> Self {
        let (display, _) = watch::channel(DisplayState::Idle);
        Self {
            inner: Arc::new(Inner {
                slot: Mutex::new(Slot::default()),
                loaded: Mutex::new(None),
                source,
                renderer,
                display,
            }),
        }
    }

    /// Ask for `target` to be shown. Never blocks.
    ///
    /// Starts a render if none is running; otherwise replaces whatever was
    /// pending. Must be called from within a Tokio runtime.
    pub fn request(&self, target: RenderTarget) {
        let mut slot = lock(&self.inner.slot);
        if slot.in_flight {
            let target = match slot.pending.take() {
                // A superseded reload of the same document still has to happen.
                Some(prev) if prev.reload && prev.document == target.document => RenderTarget {
                    reload: true,
                    ..target
                },
                Some(prev) => {
                    tracing::trace!(page = prev.page.get(), "Superseded pending render");
                    target
                }
                None => target,
            };
            slot.pending = Some(target);
            return;
        }
        slot.in_flight = true;
        drop(slot);

        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.drive(target).await });
    }

    /// Watch what is on screen.
    pub fn display(&self) -> watch::Receiver<DisplayState> {
        self.inner.display.subscribe()
    }

    /// Page count of the document on screen, once it has loaded.
    pub fn page_count(&self) -> Option<u32> {
        self.inner.display.borrow().page_count()
    }

    pub fn is_rendering(&self) -> bool {
        lock(&self.inner.slot).in_flight
    }

    async fn drive(&self, first: RenderTarget) {
        let mut guard = InFlight {
            slot: &self.inner.slot,
            finished: false,
        };
        let mut target = first;
        loop {
            self.render_once(&target).await;

            let mut slot = lock(&self.inner.slot);
            match slot.pending.take() {
                Some(next) => target = next,
                None => {
                    slot.in_flight = false;
                    guard.finished = true;
                    return;
                }
            }
        }
    }

    async fn render_once(&self, target: &RenderTarget) {
        let Some(document) = &target.document else {
            self.unavailable().await;
            return;
        };

        let Some(page_count) = self.ensure_loaded(document, target.reload).await else {
            self.unavailable().await;
            return;
        };

        // Pages past the end show the last page.
        let last = PageIndex::new(page_count).unwrap_or(PageIndex::FIRST);
        let page = target.page.min(last);
        if page != target.page {
            tracing::debug!(
                document = %document,
                requested = target.page.get(),
                page_count,
                "Requested page past the end"
            );
        }

        match self.inner.renderer.render(document, page).await {
            Ok(()) => {
                self.inner.display.send_replace(DisplayState::Showing {
                    document: document.clone(),
                    page,
                    page_count,
                });
            }
            Err(e) => {
                tracing::warn!(document = %document, page = page.get(), error = %e, "Render failed");
            }
        }
    }

    /// Make `document` the open one. Returns its page count, or `None` if it
    /// cannot be shown.
    async fn ensure_loaded(&self, document: &DocumentId, reload: bool) -> Option<u32> {
        if !reload {
            if let Some((open, pages)) = lock(&self.inner.loaded).as_ref() {
                if open == document {
                    return Some(*pages);
                }
            }
        }
        *lock(&self.inner.loaded) = None;

        let bytes = match self.inner.source.fetch(document).await {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound(reason)) => {
                tracing::info!(document = %document, reason = %reason, "Document not available");
                return None;
            }
            Err(e) => {
                tracing::warn!(document = %document, error = %e, "Failed to fetch document");
                return None;
            }
        };

        match self.inner.renderer.open(document, bytes).await {
            Ok(pages) => {
                *lock(&self.inner.loaded) = Some((document.clone(), pages));
                Some(pages)
            }
            Err(e) => {
                tracing::warn!(document = %document, error = %e, "Failed to open document");
                None
            }
        }
    }

    async fn unavailable(&self) {
        *lock(&self.inner.loaded) = None;
        self.inner.renderer.blank().await;
        self.inner.display.send_replace(DisplayState::Unavailable);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use super::*;
    use crate::render::RenderError;

    struct MapSource {
        documents: HashMap<DocumentId, Vec<u8>>,
        fetches: AtomicUsize,
    }

    impl MapSource {
        fn with(ids: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                documents: ids
                    .iter()
                    .map(|id| (DocumentId::from(*id), b"%PDF-1.4".to_vec()))
                    .collect(),
                fetches: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl DocumentSource for MapSource {
        async fn fetch(&self, document: &DocumentId) -> Result<Vec<u8>, StorageError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.documents
                .get(document)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(document.to_string()))
        }
    }

    /// Reports each render as it starts and finishes it only when the test
    /// sends a permit.
    struct GatedRenderer {
        started: mpsc::UnboundedSender<(DocumentId, u32)>,
        permits: tokio::sync::Mutex<mpsc::UnboundedReceiver<()>>,
        active: AtomicUsize,
        max_active: AtomicUsize,
        blanks: AtomicUsize,
    }

    #[async_trait]
    impl Renderer for GatedRenderer {
        async fn open(&self, _document: &DocumentId, _bytes: Vec<u8>) -> Result<u32, RenderError> {
            Ok(20)
        }

        async fn render(&self, document: &DocumentId, page: PageIndex) -> Result<(), RenderError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            let _ = self.started.send((document.clone(), page.get()));
            self.permits.lock().await.recv().await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }

        async fn blank(&self) {
            self.blanks.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        scheduler: RenderScheduler,
        renderer: Arc<GatedRenderer>,
        source: Arc<MapSource>,
        started: mpsc::UnboundedReceiver<(DocumentId, u32)>,
        permits: mpsc::UnboundedSender<()>,
    }

    fn harness(documents: &[&str]) -> Harness {
        let (started_tx, started) = mpsc::unbounded_channel();
        let (permits, permits_rx) = mpsc::unbounded_channel();
        let renderer = Arc::new(GatedRenderer {
            started: started_tx,
            permits: tokio::sync::Mutex::new(permits_rx),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            blanks: AtomicUsize::new(0),
        });
        let source = MapSource::with(documents);
        let scheduler = RenderScheduler::new(source.clone(), renderer.clone());
        Harness {
            scheduler,
            renderer,
            source,
            started,
            permits,
        }
    }

    fn target(document: &str, page: u32) -> RenderTarget {
        RenderTarget::page(Some(document.into()), PageIndex::new(page).unwrap())
    }

    async fn started(h: &mut Harness) -> u32 {
        let (_, page) = tokio::time::timeout(Duration::from_secs(5), h.started.recv())
            .await
            .expect("no render started")
            .unwrap();
        page
    }

    async fn wait_display(h: &Harness, want: DisplayState) {
        let mut display = h.scheduler.display();
        tokio::time::timeout(Duration::from_secs(5), display.wait_for(|s| *s == want))
            .await
            .expect("display never settled")
            .unwrap();
    }

    async fn wait_idle(h: &Harness) {
        while h.scheduler.is_rendering() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn burst_renders_first_and_last_only() {
        let mut h = harness(&["D1"]);

        h.scheduler.request(target("D1", 5));
        assert_eq!(started(&mut h).await, 5);

        h.scheduler.request(target("D1", 6));
        h.scheduler.request(target("D1", 7));
        h.permits.send(()).unwrap();

        assert_eq!(started(&mut h).await, 7);
        h.permits.send(()).unwrap();

        wait_display(
            &h,
            DisplayState::Showing {
                document: "D1".into(),
                page: PageIndex::new(7).unwrap(),
                page_count: 20,
            },
        )
        .await;
        wait_idle(&h).await;

        assert!(h.started.try_recv().is_err(), "page 6 should never render");
        assert_eq!(h.renderer.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn loads_each_document_once() {
        let mut h = harness(&["D1"]);

        for page in 1..=3 {
            h.scheduler.request(target("D1", page));
            assert_eq!(started(&mut h).await, page);
            h.permits.send(()).unwrap();
            wait_idle(&h).await;
        }
        assert_eq!(h.source.fetches.load(Ordering::SeqCst), 1);

        h.scheduler
            .request(RenderTarget::reload(Some("D1".into()), PageIndex::FIRST));
        started(&mut h).await;
        h.permits.send(()).unwrap();
        wait_idle(&h).await;
        assert_eq!(h.source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn pending_reload_survives_page_overwrite() {
        let mut h = harness(&["D1"]);

        h.scheduler.request(target("D1", 1));
        started(&mut h).await;

        h.scheduler
            .request(RenderTarget::reload(Some("D1".into()), PageIndex::FIRST));
        h.scheduler.request(target("D1", 2));
        h.permits.send(()).unwrap();

        assert_eq!(started(&mut h).await, 2);
        h.permits.send(()).unwrap();
        wait_idle(&h).await;
        assert_eq!(h.source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_document_shows_unavailable() {
        let mut h = harness(&["D1"]);

        h.scheduler.request(target("deleted.pdf", 1));
        wait_display(&h, DisplayState::Unavailable).await;
        wait_idle(&h).await;
        assert_eq!(h.renderer.blanks.load(Ordering::SeqCst), 1);

        // The next valid selection recovers.
        h.scheduler.request(target("D1", 1));
        assert_eq!(started(&mut h).await, 1);
        h.permits.send(()).unwrap();
        wait_display(
            &h,
            DisplayState::Showing {
                document: "D1".into(),
                page: PageIndex::FIRST,
                page_count: 20,
            },
        )
        .await;
    }

    #[tokio::test]
    async fn no_document_shows_unavailable() {
        let h = harness(&[]);

        h.scheduler
            .request(RenderTarget::reload(None, PageIndex::FIRST));
        wait_display(&h, DisplayState::Unavailable).await;
        assert_eq!(h.scheduler.page_count(), None);
    }

    #[tokio::test]
    async fn page_past_the_end_shows_last_page() {
        let mut h = harness(&["D1"]);

        h.scheduler.request(target("D1", 99));
        assert_eq!(started(&mut h).await, 20);
        h.permits.send(()).unwrap();

        wait_display(
            &h,
            DisplayState::Showing {
                document: "D1".into(),
                page: PageIndex::new(20).unwrap(),
                page_count: 20,
            },
        )
        .await;
    }

    /// Panics on page 1, renders anything else.
    struct PanicsOnFirstPage;

    #[async_trait]
    impl Renderer for PanicsOnFirstPage {
        async fn open(&self, _document: &DocumentId, _bytes: Vec<u8>) -> Result<u32, RenderError> {
            Ok(5)
        }

        async fn render(&self, _document: &DocumentId, page: PageIndex) -> Result<(), RenderError> {
            if page == PageIndex::FIRST {
                panic!("renderer crashed");
            }
            Ok(())
        }

        async fn blank(&self) {}
    }

    #[tokio::test]
    async fn recovers_after_renderer_panic() {
        let scheduler = RenderScheduler::new(MapSource::with(&["D1"]), Arc::new(PanicsOnFirstPage));

        scheduler.request(target("D1", 1));
        tokio::time::timeout(Duration::from_secs(5), async {
            while scheduler.is_rendering() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("scheduler stayed busy after the renderer panicked");

        scheduler.request(target("D1", 2));
        let mut display = scheduler.display();
        tokio::time::timeout(
            Duration::from_secs(5),
            display.wait_for(|s| {
                *s == DisplayState::Showing {
                    document: "D1".into(),
                    page: PageIndex::new(2).unwrap(),
                    page_count: 5,
                }
            }),
        )
        .await
        .expect("no render after the panic")
        .unwrap();
    }
}
