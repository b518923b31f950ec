//! Entity lifecycle hooks as an explicit wrapper around each mutation.
//!
//! A service hands [`guard`] two steps: the *before* step (validation,
//! default fill-ins, referential guards) and the mutation itself. The
//! mutation only runs when the before step succeeds, so a rejected hook
//! never leaves a partial write behind. Both outcomes are logged.
use std::fmt;
use std::future::Future;

use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::store::StoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Create,
    Update,
    Delete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Create => "create",
            Phase::Update => "update",
            Phase::Delete => "delete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs `before`, then feeds its output to `mutate`.
///
/// A failing `before` aborts with its own error. A failing `mutate` is mapped
/// from [`crate::store::StoreError`], so a unique-constraint hit at the store
/// surfaces as [`AppError::Conflict`].
pub async fn guard<D, T, B, M, Fut>(
    entity: &'static str,
    phase: Phase,
    before: B,
    mutate: M,
) -> AppResult<T>
where
    B: Future<Output = AppResult<D>>,
    M: FnOnce(D) -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let checked = match before.await {
        Ok(checked) => checked,
        Err(err) => {
            warn!(entity, phase = %phase, error = %err, "before hook rejected mutation");
            return Err(err);
        }
    };

    match mutate(checked).await {
        Ok(out) => {
            info!(entity, phase = %phase, "mutation applied");
            Ok(out)
        }
        Err(err) => {
            let err = AppError::from(err);
            warn!(entity, phase = %phase, error = %err, "mutation failed");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::store::StoreError;
    use crate::validation::FieldErrors;

    #[tokio::test]
    async fn rejected_before_hook_skips_mutation() {
        let calls = AtomicUsize::new(0);
        let result: AppResult<()> = guard(
            "role",
            Phase::Create,
            async {
                let mut errors = FieldErrors::default();
                errors.add("name", "The name field is required.");
                Err::<(), _>(errors.into())
            },
            |_| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::ValidationFailed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn store_conflict_maps_to_app_conflict() {
        let result: AppResult<()> = guard(
            "permission",
            Phase::Create,
            async { Ok(()) },
            |_| async { Err(StoreError::Conflict("permission exists".into())) },
        )
        .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn before_output_reaches_mutation() {
        let out = guard(
            "car",
            Phase::Update,
            async { Ok(21) },
            |n: i32| async move { Ok(n * 2) },
        )
        .await
        .unwrap();
        assert_eq!(out, 42);
    }
}
