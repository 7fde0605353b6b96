use std::sync::Arc;
use tickethub_core::repository::EventRepository;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn EventRepository>,
}
