use serde::{Deserialize, Serialize};

/// Worker pool size for Map and Expand stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Workers {
    /// One worker per available CPU
    #[default]
    Auto,
    Fixed(usize),
}

impl Workers {
    pub fn resolve(&self) -> usize {
        match self {
            Workers::Auto => num_cpus::get().max(1),
            Workers::Fixed(n) => *n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutorConfig {
    pub workers: Workers,
    /// Extra attempts for a failing Map/Expand invocation before aborting
    pub max_retries: u32,
    /// Emit worker-pool output groups in input order instead of completion order
    pub preserve_order: bool,
}

impl ExecutorConfig {
    pub fn with_workers(mut self, workers: Workers) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_preserve_order(mut self, preserve_order: bool) -> Self {
        self.preserve_order = preserve_order;
        self
    }
}
