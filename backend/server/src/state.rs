use std::sync::Arc;

use crate::{
    config::Config,
    error::AppError,
    supabase::{Backend, Supabase},
};

pub struct State {
    pub config: Config,
    pub backend: Arc<dyn Backend>,
}

impl State {
    pub fn new(config: Config) -> Result<Arc<Self>, AppError> {
        let backend = Supabase::new(&config)?;

        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    pub fn with_backend(config: Config, backend: Arc<dyn Backend>) -> Arc<Self> {
        Arc::new(Self { config, backend })
    }
}
