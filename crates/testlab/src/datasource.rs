use loopback_repository::DataSource;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};

/// Counter for generating unique test datasource names
static TEST_DATASOURCE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// A memory datasource named `{prefix}_{counter}`.
pub fn given_test_datasource(prefix: &str) -> DataSource {
    let counter = TEST_DATASOURCE_COUNTER.fetch_add(1, Ordering::SeqCst);
    DataSource::memory(format!("{}_{}", prefix, counter))
}

/// Run `f` with a fresh memory datasource. Nothing is shared between calls,
/// so tests using it can run in parallel.
pub async fn with_test_datasource<F, Fut, T>(prefix: &str, f: F) -> anyhow::Result<T>
where
    F: FnOnce(DataSource) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    f(given_test_datasource(prefix)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn datasource_names_are_unique() -> anyhow::Result<()> {
        let first = given_test_datasource("unique");
        let second = given_test_datasource("unique");
        assert!(first.name().starts_with("unique_"));
        assert_ne!(first.name(), second.name());

        let name =
            with_test_datasource("scoped", |db| async move { Ok(db.name().to_string()) }).await?;
        assert!(name.starts_with("scoped_"));
        Ok(())
    }
}
