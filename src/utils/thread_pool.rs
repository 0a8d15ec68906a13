use once_cell::sync::OnceCell;
use rayon::ThreadPoolBuilder;
use std::sync::Arc;

static THREAD_POOL: OnceCell<Arc<rayon::ThreadPool>> = OnceCell::new();

/// Initialize the global analysis pool with the specified number of threads
///
/// # Errors
///
/// Returns an error if the pool cannot be built or was already initialized
pub fn init_thread_pool(num_threads: usize) -> anyhow::Result<()> {
    let pool = build_pool(num_threads)?;

    THREAD_POOL
        .set(Arc::new(pool))
        .map_err(|_| anyhow::anyhow!("Thread pool already initialized"))?;

    Ok(())
}

/// Get the global analysis pool, initializing with default settings if needed
///
/// # Errors
///
/// Returns an error if the pool cannot be created
pub fn get_thread_pool() -> anyhow::Result<Arc<rayon::ThreadPool>> {
    THREAD_POOL
        .get_or_try_init(|| build_pool(default_threads()).map(Arc::new))
        .cloned()
}

/// Configure the pool from config; zero keeps the default size
///
/// # Errors
///
/// Returns an error if the pool has already been initialized
pub fn configure_from_config(config: &crate::config::Config) -> anyhow::Result<()> {
    if config.performance.parallel_threads > 0 {
        init_thread_pool(config.performance.parallel_threads)?;
    }
    Ok(())
}

fn build_pool(num_threads: usize) -> anyhow::Result<rayon::ThreadPool> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("snapdiff-analyzer-{i}"))
        .build()?;
    Ok(pool)
}

/// Default pool size: available cores, capped at 8
#[must_use]
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
        .min(8)
}
