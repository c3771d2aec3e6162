use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use crate::BatchHandle;

/// Errors reported synchronously by [`ResourceLoader::submit`](crate::ResourceLoader::submit).
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SubmitError {
    #[error("cannot find batch with handle {0:?}")]
    UnknownBatch(BatchHandle),
    #[error("missing handler for type: {0}")]
    NoHandlerForType(&'static str),
}

/// A failed load, shared by every batch that referenced the request.
#[derive(Clone)]
pub struct LoadError(Arc<eyre::Report>);

impl LoadError {
    pub fn report(&self) -> &eyre::Report {
        &self.0
    }
}

impl From<eyre::Report> for LoadError {
    fn from(report: eyre::Report) -> LoadError {
        LoadError(Arc::new(report))
    }
}

impl Debug for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&*self.0, f)
    }
}

impl Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_errors_convert_into_reports() {
        let report = eyre::Report::from(SubmitError::UnknownBatch(BatchHandle(7)));
        assert_eq!(report.to_string(), "cannot find batch with handle Batch(7)");

        let error = SubmitError::NoHandlerForType("app::Mesh");
        assert_eq!(error.to_string(), "missing handler for type: app::Mesh");
    }
}
