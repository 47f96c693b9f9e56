//! Explicit session state for one analyzed contract.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::artifacts::{build_chart, build_pdf, ArtifactScope, ChartRenderer, PdfRenderer};
use crate::clauses::{ClauseStore, EmptyInput};
use crate::distribution::{
    compose_body, validate_recipient, Delivery, DistributionError, DistributionService,
    InlineImage, MailTransport, ReportEmail,
};
use crate::report::ReportView;
use crate::rewrite::{select_rewrites, RewriteSelection};

/// Whether the AI-rewrite table is shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewriteView {
    #[default]
    Collapsed,
    Expanded,
}

/// Renderers used to produce the artifacts of a distribution attempt.
pub struct Renderers<'a> {
    pub pdf: &'a dyn PdfRenderer,
    pub chart: &'a dyn ChartRenderer,
}

/// Store snapshot plus UI state, created when an analysis starts.
///
/// A new analysis replaces the snapshot wholesale; records are never merged.
#[derive(Debug, Clone, Default)]
pub struct Session {
    store: ClauseStore,
    rewrite_view: RewriteView,
}

impl Session {
    pub fn new(store: ClauseStore) -> Self {
        debug!(clauses = store.len(), fingerprint = store.fingerprint(), "session started");
        Self {
            store,
            rewrite_view: RewriteView::Collapsed,
        }
    }

    pub fn store(&self) -> &ClauseStore {
        &self.store
    }

    pub fn rewrite_view(&self) -> RewriteView {
        self.rewrite_view
    }

    /// Install the results of a new analysis and collapse the rewrite view.
    pub fn replace_store(&mut self, store: ClauseStore) {
        debug!(
            previous = self.store.fingerprint(),
            next = store.fingerprint(),
            "replacing clause store"
        );
        self.store = store;
        self.rewrite_view = RewriteView::Collapsed;
    }

    /// Expand the rewrite view. Returns `false` when it was already expanded.
    pub fn expand_rewrites(&mut self) -> bool {
        let changed = self.rewrite_view == RewriteView::Collapsed;
        self.rewrite_view = RewriteView::Expanded;
        changed
    }

    pub fn report_view(&self) -> Result<ReportView, EmptyInput> {
        ReportView::build(&self.store, self.rewrite_view)
    }

    pub fn rewrites(&self) -> RewriteSelection {
        select_rewrites(&self.store)
    }

    /// Run one distribution attempt end to end.
    ///
    /// The recipient is validated before any artifact is produced. A failed PDF
    /// is dropped from the email; a failed chart aborts the send. Artifacts are
    /// released once the attempt resolves.
    #[instrument(name = "distribute_report", skip_all, fields(clauses = self.store.len()))]
    pub async fn distribute<T: MailTransport>(
        &self,
        recipient: &str,
        subject: &str,
        renderers: &Renderers<'_>,
        service: &DistributionService<T>,
    ) -> Delivery {
        if let Err(err) = validate_recipient(recipient) {
            return Delivery::failed(&err);
        }
        let body = match compose_body(&self.store.distribution()) {
            Ok(body) => body,
            Err(err) => return Delivery::failed(&DistributionError::from(err)),
        };
        let scope = match ArtifactScope::new() {
            Ok(scope) => scope,
            Err(err) => return Delivery::failed(&DistributionError::from(err)),
        };

        let attachment = match build_pdf(renderers.pdf, &self.rewrites(), &scope) {
            Ok(path) => path,
            Err(err) => {
                warn!(error = %err, "PDF unavailable; sending without attachment");
                None
            }
        };
        let chart_path = match build_chart(renderers.chart, &self.store, &scope) {
            Ok(path) => path,
            Err(err) => {
                scope.close();
                return Delivery::failed(&DistributionError::from(err));
            }
        };

        let request = ReportEmail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body,
            attachment,
            chart: Some(InlineImage {
                path: chart_path,
                content_type: renderers.chart.content_type(),
            }),
        };
        let delivery = service.send(&request).await;
        scope.close();
        info!(success = delivery.success, "distribution attempt finished");
        delivery
    }
}
