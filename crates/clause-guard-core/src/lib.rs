pub mod aggregate;
pub mod artifacts;
pub mod clauses;
pub mod distribution;
pub mod report;
pub mod rewrite;
pub mod session;
pub mod verdict;

pub use aggregate::{aggregate, AggregatedSummary};
pub use artifacts::{
    ArtifactError, ArtifactScope, ChartRenderer, ChartSpec, PdfRenderer, PngChartRenderer,
    PrintPdfRenderer, SvgChartRenderer,
};
pub use clauses::{
    file_source::FileClauseSource, ClauseRecord, ClauseSource, ClauseStore,
    ClauseValidationError, EmptyInput, RiskDistribution, RiskLevel,
};
pub use distribution::{
    CredentialSource, Delivery, DistributionError, DistributionService, MailSettings,
    MailTransport, SmtpDefaults, SmtpMailTransport, DEFAULT_SUBJECT,
};
pub use report::{render_report, OutputFormat, ReportView};
pub use rewrite::{select_rewrites, truncate_comment, ResultRow, RewriteRow, RewriteSelection};
pub use session::{Renderers, RewriteView, Session};
pub use verdict::{decide, Severity, Verdict};
