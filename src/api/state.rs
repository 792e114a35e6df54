use std::sync::Arc;

use crate::storage::ReportSink;
use crate::triage::TriagePipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TriagePipeline>,
    pub store: Arc<dyn ReportSink>,
}

impl AppState {
    pub fn new(pipeline: TriagePipeline) -> Self {
        let store = pipeline.sink();
        Self {
            pipeline: Arc::new(pipeline),
            store,
        }
    }
}
