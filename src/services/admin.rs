use std::sync::Arc;

use crate::app_error::AppError;
use crate::models::DashboardStats;
use crate::store::Store;

/// Read-only views for the store dashboard. Callers check the admin flag.
#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn Store>,
}

impl AdminService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn stats(&self) -> Result<DashboardStats, AppError> {
        Ok(self.store.dashboard_stats().await?)
    }
}
