//! Scripted in-memory implementation of the automation traits.
//!
//! Tests describe a tiny site as documents keyed by URL, each holding
//! elements keyed by the selector the production code asks for. Waits
//! resolve (or time out) immediately, so component tests stay fast.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::automation::{Backend, Element, Page, Session};
use crate::error::{ScrapeError, ScrapeResult};

#[derive(Default)]
struct NodeInner {
    attrs: HashMap<String, String>,
    text: String,
    children: HashMap<String, Vec<FakeNode>>,
    clicks: AtomicUsize,
    list: Option<Mutex<ListState>>,
}

/// Infinite-scroll state: each scroll reveals one more batch of rows.
struct ListState {
    batches: Vec<Vec<FakeNode>>,
    revealed: usize,
}

/// One scripted DOM element.
#[derive(Clone, Default)]
pub struct FakeNode(Arc<NodeInner>);

impl FakeNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attr(self, name: &str, value: &str) -> Self {
        let mut inner = self.unshared();
        inner.attrs.insert(name.to_string(), value.to_string());
        Self(Arc::new(inner))
    }

    pub fn with_text(self, text: &str) -> Self {
        let mut inner = self.unshared();
        inner.text = text.to_string();
        Self(Arc::new(inner))
    }

    pub fn with_child(self, selector: &str, child: FakeNode) -> Self {
        let mut inner = self.unshared();
        inner.children.entry(selector.to_string()).or_default().push(child);
        Self(Arc::new(inner))
    }

    /// Turn this node into a scrollable list; the first batch is visible
    /// initially and each scroll reveals the next one.
    pub fn with_batches(self, batches: Vec<Vec<FakeNode>>) -> Self {
        let mut inner = self.unshared();
        inner.list = Some(Mutex::new(ListState {
            batches,
            revealed: 1,
        }));
        Self(Arc::new(inner))
    }

    /// Builders run before the node is handed to a doc; once a node has
    /// been cloned, mutating it would silently fork its state.
    fn unshared(self) -> NodeInner {
        match Arc::try_unwrap(self.0) {
            Ok(inner) => inner,
            Err(_) => panic!("node builders cannot run on a cloned node"),
        }
    }

    pub fn click_count(&self) -> usize {
        self.0.clicks.load(Ordering::SeqCst)
    }

    fn visible_rows(&self) -> Option<Vec<FakeNode>> {
        self.0.list.as_ref().map(|l| {
            let state = l.lock().unwrap();
            state
                .batches
                .iter()
                .take(state.revealed)
                .flatten()
                .cloned()
                .collect()
        })
    }
}

#[async_trait]
impl Element for FakeNode {
    async fn attribute(&self, name: &str) -> ScrapeResult<Option<String>> {
        Ok(self.0.attrs.get(name).cloned())
    }

    async fn inner_text(&self) -> ScrapeResult<String> {
        Ok(self.0.text.clone())
    }

    async fn click(&self) -> ScrapeResult<()> {
        self.0.clicks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn query(&self, selector: &str) -> ScrapeResult<Option<FakeNode>> {
        Ok(self
            .0
            .children
            .get(selector)
            .and_then(|v| v.first())
            .cloned())
    }

    async fn query_all(&self, selector: &str) -> ScrapeResult<Vec<FakeNode>> {
        if let Some(rows) = self.visible_rows() {
            return Ok(rows);
        }
        Ok(self.0.children.get(selector).cloned().unwrap_or_default())
    }

    async fn scroll_to_bottom(&self) -> ScrapeResult<()> {
        if let Some(ref l) = self.0.list {
            let mut state = l.lock().unwrap();
            if state.revealed < state.batches.len() {
                state.revealed += 1;
            }
        }
        Ok(())
    }
}

/// One scripted page: selector -> elements, plus raw page source.
#[derive(Clone, Default)]
pub struct FakeDoc {
    selectors: HashMap<String, Vec<FakeNode>>,
    html: String,
}

impl FakeDoc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_html(mut self, html: &str) -> Self {
        self.html = html.to_string();
        self
    }

    pub fn with_node(mut self, selector: &str, node: FakeNode) -> Self {
        self.selectors
            .entry(selector.to_string())
            .or_default()
            .push(node);
        self
    }
}

/// The scripted site: documents keyed by URL.
#[derive(Default)]
pub struct FakeSite {
    docs: Mutex<HashMap<String, FakeDoc>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: &str, doc: FakeDoc) {
        self.docs.lock().unwrap().insert(url.to_string(), doc);
    }

    fn doc(&self, url: &str) -> Option<FakeDoc> {
        self.docs.lock().unwrap().get(url).cloned()
    }
}

/// Backend over a [`FakeSite`], counting sessions, pages, and sweeps.
pub struct FakeBackend {
    site: Arc<FakeSite>,
    sessions_opened: Arc<AtomicUsize>,
    sessions_closed: Arc<AtomicUsize>,
    pages_opened: Arc<AtomicUsize>,
    pages_closed: Arc<AtomicUsize>,
    sweeps: Arc<AtomicUsize>,
    fail_sessions: bool,
}

impl FakeBackend {
    pub fn new(site: Arc<FakeSite>) -> Self {
        Self {
            site,
            sessions_opened: Arc::new(AtomicUsize::new(0)),
            sessions_closed: Arc::new(AtomicUsize::new(0)),
            pages_opened: Arc::new(AtomicUsize::new(0)),
            pages_closed: Arc::new(AtomicUsize::new(0)),
            sweeps: Arc::new(AtomicUsize::new(0)),
            fail_sessions: false,
        }
    }

    /// Every `open_session` call fails with a session fault.
    pub fn failing(site: Arc<FakeSite>) -> Self {
        let mut backend = Self::new(site);
        backend.fail_sessions = true;
        backend
    }

    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.sessions_closed.load(Ordering::SeqCst)
    }

    pub fn pages_opened(&self) -> usize {
        self.pages_opened.load(Ordering::SeqCst)
    }

    pub fn pages_closed(&self) -> usize {
        self.pages_closed.load(Ordering::SeqCst)
    }

    pub fn sweep_count(&self) -> usize {
        self.sweeps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for FakeBackend {
    type Session = FakeSession;

    async fn open_session(&self) -> ScrapeResult<FakeSession> {
        if self.fail_sessions {
            return Err(ScrapeError::Session("scripted session failure".into()));
        }
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSession {
            site: self.site.clone(),
            sessions_closed: self.sessions_closed.clone(),
            pages_opened: self.pages_opened.clone(),
            pages_closed: self.pages_closed.clone(),
            sweeps: self.sweeps.clone(),
        })
    }
}

pub struct FakeSession {
    site: Arc<FakeSite>,
    sessions_closed: Arc<AtomicUsize>,
    pages_opened: Arc<AtomicUsize>,
    pages_closed: Arc<AtomicUsize>,
    sweeps: Arc<AtomicUsize>,
}

#[async_trait]
impl Session for FakeSession {
    type Page = FakePage;

    async fn new_page(&self) -> ScrapeResult<FakePage> {
        self.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakePage {
            site: self.site.clone(),
            current: Mutex::new(String::new()),
            closed: self.pages_closed.clone(),
        })
    }

    async fn close_stray_pages(&self, _allowed_hosts: &[String]) -> ScrapeResult<usize> {
        self.sweeps.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }

    async fn close(self) -> ScrapeResult<()> {
        self.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakePage {
    site: Arc<FakeSite>,
    current: Mutex<String>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl Page for FakePage {
    type Elem = FakeNode;

    async fn goto(&self, url: &str) -> ScrapeResult<()> {
        *self.current.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> ScrapeResult<FakeNode> {
        let current = self.current.lock().unwrap().clone();
        self.site
            .doc(&current)
            .and_then(|doc| doc.selectors.get(selector).and_then(|v| v.first()).cloned())
            .ok_or_else(|| ScrapeError::Timeout {
                selector: selector.to_string(),
                waited: timeout,
            })
    }

    async fn query_all(&self, selector: &str) -> ScrapeResult<Vec<FakeNode>> {
        let current = self.current.lock().unwrap().clone();
        Ok(self
            .site
            .doc(&current)
            .and_then(|doc| doc.selectors.get(selector).cloned())
            .unwrap_or_default())
    }

    async fn content(&self) -> ScrapeResult<String> {
        let current = self.current.lock().unwrap().clone();
        Ok(self.site.doc(&current).map(|d| d.html).unwrap_or_default())
    }

    async fn close(self) -> ScrapeResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A listing row shaped like the target site's episode entries.
pub fn episode_row(title: &str, href: &str) -> FakeNode {
    FakeNode::new().with_child(
        "a",
        FakeNode::new()
            .with_attr("href", href)
            .with_child("p", FakeNode::new().with_text(title)),
    )
}

mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "cloned node")]
    fn node_builders_reject_cloned_nodes() {
        let node = FakeNode::new().with_text("first");
        let _copy = node.clone();
        let _ = node.with_text("second");
    }

    #[tokio::test]
    async fn builder_state_survives_chained_calls() {
        let node = FakeNode::new()
            .with_attr("href", "/x")
            .with_text("row")
            .with_child("p", FakeNode::new());
        assert_eq!(node.attribute("href").await.unwrap().as_deref(), Some("/x"));
        assert_eq!(node.inner_text().await.unwrap(), "row");
        assert!(node.query("p").await.unwrap().is_some());
    }
}
