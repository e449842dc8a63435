use std::sync::Arc;

use crate::db::{DbPool, OrmConn};
use crate::storage::DiskStorage;
use crate::upload::UploadLimiter;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub storage: DiskStorage,
    pub upload_limiter: Arc<UploadLimiter>,
}
