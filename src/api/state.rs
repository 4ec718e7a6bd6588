use crate::detect::journal::AnomalyJournal;
use crate::detect::AnomalyEngine;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AnomalyEngine>,
    /// `None` when journaling is disabled in config.
    pub journal: Option<AnomalyJournal>,
}
