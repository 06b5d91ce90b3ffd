//! Single-threaded owner of the live document.
//!
//! The parsed tree cannot leave the thread that owns it, so the host runs a
//! job loop on its own thread and `PageHandle` ships closures to it,
//! mirroring how a page's script context is the only place the real DOM can
//! be touched.

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::errors::DomError;
use crate::page::PageDom;
use crate::NodeId;

type PageJob = Box<dyn FnOnce(&mut PageDom) + Send>;

const JOB_QUEUE_DEPTH: usize = 32;

pub struct PageHost;

impl PageHost {
    /// Parse `source` on a fresh owner thread and return the handle other
    /// contexts use to reach the document. The thread exits once every
    /// handle clone is dropped.
    pub fn launch(source: impl Into<String>) -> Result<PageHandle, DomError> {
        let source = source.into();
        let (tx, mut rx) = mpsc::channel::<PageJob>(JOB_QUEUE_DEPTH);
        std::thread::Builder::new()
            .name("pagehush-dom".into())
            .spawn(move || {
                let mut page = PageDom::parse_document(&source);
                while let Some(job) = rx.blocking_recv() {
                    job(&mut page);
                }
                debug!("page host thread exiting");
            })
            .map_err(|err| DomError::HostSpawn(err.to_string()))?;
        Ok(PageHandle { tx })
    }
}

/// Cloneable async handle to the document owned by a `PageHost`.
#[derive(Clone)]
pub struct PageHandle {
    tx: mpsc::Sender<PageJob>,
}

impl PageHandle {
    /// Run `f` on the owner thread against the live document.
    pub async fn with<R, F>(&self, f: F) -> Result<R, DomError>
    where
        F: FnOnce(&mut PageDom) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: PageJob = Box::new(move |page| {
            let _ = reply_tx.send(f(page));
        });
        self.tx.send(job).await.map_err(|_| DomError::PageGone)?;
        reply_rx.await.map_err(|_| DomError::PageGone)
    }

    pub async fn match_count(&self, css: &str) -> Result<usize, DomError> {
        let css = css.to_owned();
        self.with(move |page| page.match_count(&css)).await
    }

    pub async fn first_match(&self, css: &str) -> Result<Option<NodeId>, DomError> {
        let css = css.to_owned();
        self.with(move |page| page.first_match(&css)).await
    }

    /// Apply style properties to every match; unparsable selectors surface
    /// as `DomError::InvalidSelector`.
    pub async fn apply_styles(
        &self,
        css: &str,
        props: Vec<(String, String)>,
    ) -> Result<usize, DomError> {
        let css = css.to_owned();
        self.with(move |page| page.apply_styles(&css, &props))
            .await?
    }

    pub async fn mount_fragment_at(
        &self,
        parent_css: &str,
        source: &str,
    ) -> Result<Vec<NodeId>, DomError> {
        let parent_css = parent_css.to_owned();
        let source = source.to_owned();
        self.with(move |page| page.mount_fragment_at(&parent_css, &source))
            .await?
    }

    /// Style property of the first element matching `css`, mostly useful to
    /// observe the overlay from tests and the CLI.
    pub async fn style_of(&self, css: &str, property: &str) -> Result<Option<String>, DomError> {
        let css = css.to_owned();
        let property = property.to_owned();
        self.with(move |page| {
            page.first_match(&css)
                .and_then(|node| page.style(node, &property))
        })
        .await
    }
}
