//! Deferred access to repositories.
//!
//! Related repositories reference each other, so none of them can be fully
//! built first. A [`RepositorySlot`] is created up front, handed out as a
//! [`Getter`] while the graph is wired, and filled once its repository
//! exists. Getters resolve on every call, never at construction.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};

use crate::{RepositoryError, Result};

type GetFn<R> = dyn Fn() -> BoxFuture<'static, Result<Arc<R>>> + Send + Sync;

/// Asynchronous handle resolving to a shared `R`.
pub struct Getter<R: ?Sized> {
    get: Arc<GetFn<R>>,
}

impl<R: ?Sized> Clone for Getter<R> {
    fn clone(&self) -> Self {
        Self {
            get: self.get.clone(),
        }
    }
}

impl<R: ?Sized> fmt::Debug for Getter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Getter(..)")
    }
}

impl<R> Getter<R>
where
    R: ?Sized + Send + Sync + 'static,
{
    pub fn new<F, Fut>(get: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<R>>> + Send + 'static,
    {
        Self {
            get: Arc::new(move || get().boxed()),
        }
    }

    /// A getter that always yields `value`.
    pub fn from_value(value: Arc<R>) -> Self {
        Self::new(move || {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    pub async fn get(&self) -> Result<Arc<R>> {
        (self.get)().await
    }

    /// Project the resolved value, e.g. from a concrete repository to
    /// `dyn EntityCrudRepository<T>`.
    pub fn map<U, F>(self, project: F) -> Getter<U>
    where
        U: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<R>) -> Arc<U> + Send + Sync + 'static,
    {
        let project = Arc::new(project);
        Getter::new(move || {
            let inner = self.clone();
            let project = project.clone();
            async move { inner.get().await.map(|value| project(value)) }
        })
    }
}

struct SlotInner<R: ?Sized> {
    name: String,
    cell: OnceLock<Arc<R>>,
}

/// A set-once cell holding a repository, read through [`Getter`]s.
pub struct RepositorySlot<R: ?Sized> {
    inner: Arc<SlotInner<R>>,
}

impl<R: ?Sized> Clone for RepositorySlot<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R> RepositorySlot<R>
where
    R: ?Sized + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(SlotInner {
                name: name.into(),
                cell: OnceLock::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Bind the repository. Fails if the slot was already filled.
    pub fn fill(&self, repository: Arc<R>) -> Result<()> {
        self.inner
            .cell
            .set(repository)
            .map_err(|_| RepositoryError::RepositoryAlreadyBound(self.inner.name.clone()))?;
        tracing::debug!(repository = %self.inner.name, "repository slot filled");
        Ok(())
    }

    pub fn is_filled(&self) -> bool {
        self.inner.cell.get().is_some()
    }

    /// The bound repository, or `UnresolvedRepository` before [`fill`](Self::fill).
    pub fn get(&self) -> Result<Arc<R>> {
        self.inner
            .cell
            .get()
            .cloned()
            .ok_or_else(|| RepositoryError::UnresolvedRepository(self.inner.name.clone()))
    }

    pub fn getter(&self) -> Getter<R> {
        let slot = self.clone();
        Getter::new(move || {
            let resolved = slot.get();
            async move { resolved }
        })
    }
}

impl<R: ?Sized> fmt::Debug for RepositorySlot<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositorySlot")
            .field("name", &self.inner.name)
            .field("filled", &self.inner.cell.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Named: Send + Sync {
        fn name(&self) -> &str;
    }

    struct Repo(&'static str);

    impl Named for Repo {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[tokio::test]
    async fn getter_resolves_after_fill() {
        let slot = RepositorySlot::<dyn Named>::new("CustomerRepository");
        let getter = slot.getter();

        let err = getter.get().await.err().unwrap();
        assert!(matches!(
            err,
            RepositoryError::UnresolvedRepository(ref n) if n == "CustomerRepository"
        ));

        slot.fill(Arc::new(Repo("customers"))).unwrap();
        assert_eq!(getter.get().await.unwrap().name(), "customers");
    }

    #[tokio::test]
    async fn slot_fills_once() {
        let slot = RepositorySlot::<Repo>::new("OrderRepository");
        slot.fill(Arc::new(Repo("a"))).unwrap();
        assert!(matches!(
            slot.fill(Arc::new(Repo("b"))),
            Err(RepositoryError::RepositoryAlreadyBound(_))
        ));
        assert_eq!(slot.get().unwrap().name(), "a");
    }

    #[tokio::test]
    async fn map_projects_to_trait_object() {
        let concrete = Getter::from_value(Arc::new(Repo("orders")));
        let projected: Getter<dyn Named> = concrete.map(|repo| repo as Arc<dyn Named>);
        assert_eq!(projected.get().await.unwrap().name(), "orders");
    }
}
