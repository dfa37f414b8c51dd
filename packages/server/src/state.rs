use std::sync::Arc;

use common::judge::JudgeClient;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub judge: Arc<dyn JudgeClient>,
}
