//! Retry predicates and the bounded attempt loop.
//!
//! A call makes attempts one after another until one succeeds or the attempt
//! ceiling is reached. After each transport failure the loop asks the
//! call's [`RetryPredicate`] whether to go again; without a predicate a call
//! makes exactly one attempt. Retries are immediate.

use crate::attempt::{AttemptError, TransportFailure};
use crate::Error;
use async_trait::async_trait;
use std::future::Future;

/// Decides whether a failed attempt should be retried.
///
/// The predicate sees the transport's stderr text for the failed attempt and
/// may suspend before answering. The loop waits for the answer before making
/// the next attempt.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use curlew::retry::RetryPredicate;
///
/// struct RetryOnRefused;
///
/// #[async_trait]
/// impl RetryPredicate for RetryOnRefused {
///     async fn should_retry(&self, failure: &str) -> bool {
///         failure.contains("Connection refused")
///     }
/// }
/// ```
#[async_trait]
pub trait RetryPredicate: Send + Sync {
    /// Returns `true` if the attempt that failed with `failure` should be
    /// retried.
    async fn should_retry(&self, failure: &str) -> bool;
}

/// Predicate backed by a synchronous closure. See [`retry_if`].
pub struct RetryIf<F>(F);

/// Wraps a synchronous closure over the failure text as a [`RetryPredicate`].
pub fn retry_if<F>(f: F) -> RetryIf<F>
where
    F: Fn(&str) -> bool + Send + Sync,
{
    RetryIf(f)
}

#[async_trait]
impl<F> RetryPredicate for RetryIf<F>
where
    F: Fn(&str) -> bool + Send + Sync,
{
    async fn should_retry(&self, failure: &str) -> bool {
        (self.0)(failure)
    }
}

/// Predicate backed by an asynchronous closure. See [`retry_if_async`].
pub struct RetryIfAsync<F>(F);

/// Wraps a closure returning a future as a [`RetryPredicate`].
///
/// The closure receives an owned copy of the failure text so the returned
/// future does not borrow from the loop.
pub fn retry_if_async<F, Fut>(f: F) -> RetryIfAsync<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = bool> + Send + 'static,
{
    RetryIfAsync(f)
}

#[async_trait]
impl<F, Fut> RetryPredicate for RetryIfAsync<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = bool> + Send + 'static,
{
    async fn should_retry(&self, failure: &str) -> bool {
        (self.0)(failure.to_string()).await
    }
}

/// Retry every failure (up to the attempt ceiling).
#[derive(Debug, Clone, Copy)]
pub struct RetryAlways;

#[async_trait]
impl RetryPredicate for RetryAlways {
    async fn should_retry(&self, _failure: &str) -> bool {
        true
    }
}

/// Retry only when the failure text contains one of the given patterns.
///
/// # Examples
///
/// ```
/// use curlew::retry::RetryOnMatch;
///
/// // curl exit codes 6, 7 and 28
/// let predicate = RetryOnMatch::new([
///     "Could not resolve host",
///     "Failed to connect",
///     "Operation timed out",
/// ]);
/// ```
#[derive(Debug, Clone)]
pub struct RetryOnMatch {
    patterns: Vec<String>,
}

impl RetryOnMatch {
    /// Creates a predicate matching any of `patterns`.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl RetryPredicate for RetryOnMatch {
    async fn should_retry(&self, failure: &str) -> bool {
        self.patterns.iter().any(|p| failure.contains(p.as_str()))
    }
}

/// Combine multiple retry predicates with OR logic.
///
/// Predicates are consulted in order and the first `true` wins; later
/// predicates are not polled.
pub struct OrPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl OrPredicate {
    /// Creates a new `OrPredicate` from a list of predicates.
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

#[async_trait]
impl RetryPredicate for OrPredicate {
    async fn should_retry(&self, failure: &str) -> bool {
        for predicate in &self.predicates {
            if predicate.should_retry(failure).await {
                return true;
            }
        }
        false
    }
}

/// Combine multiple retry predicates with AND logic.
///
/// Predicates are consulted in order and the first `false` wins.
pub struct AndPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl AndPredicate {
    /// Creates a new `AndPredicate` from a list of predicates.
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

#[async_trait]
impl RetryPredicate for AndPredicate {
    async fn should_retry(&self, failure: &str) -> bool {
        for predicate in &self.predicates {
            if !predicate.should_retry(failure).await {
                return false;
            }
        }
        true
    }
}

/// The state threaded through the attempt loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptState {
    /// Attempts that have failed so far.
    pub failures: usize,
    /// The attempt ceiling.
    pub max_retries: usize,
    /// The most recent transport failure.
    pub last_failure: Option<TransportFailure>,
}

impl AttemptState {
    /// A fresh state, before the first attempt.
    pub fn new(max_retries: usize) -> Self {
        Self {
            failures: 0,
            max_retries,
            last_failure: None,
        }
    }

    /// The 1-indexed number of the next attempt.
    pub fn attempt_number(&self) -> usize {
        self.failures + 1
    }

    /// Records a failed attempt. Only the latest failure is kept.
    pub fn record_failure(self, failure: TransportFailure) -> Self {
        Self {
            failures: self.failures + 1,
            max_retries: self.max_retries,
            last_failure: Some(failure),
        }
    }

    /// Whether the ceiling still allows another attempt.
    pub fn has_budget(&self) -> bool {
        self.failures < self.max_retries
    }
}

/// How the attempt loop ended without a success.
#[derive(Debug)]
pub(crate) enum Stopped {
    /// The last attempt failed at the transport and no retry followed.
    Exhausted(AttemptState),
    /// An attempt failed in a way that is never retried.
    Fatal(Error),
}

/// Runs attempts until one succeeds, the ceiling is reached, or the predicate
/// declines. Returns the successful value together with the number of attempts
/// it took.
pub(crate) async fn run<T, F, Fut>(
    max_retries: usize,
    predicate: Option<&dyn RetryPredicate>,
    mut attempt: F,
) -> Result<(T, usize), Stopped>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let mut state = AttemptState::new(max_retries);

    loop {
        let number = state.attempt_number();

        let failure = match attempt(number).await {
            Ok(value) => return Ok((value, number)),
            Err(AttemptError::Fatal(e)) => return Err(Stopped::Fatal(e)),
            Err(AttemptError::Transport(failure)) => failure,
        };

        tracing::warn!(
            attempt = number,
            max_retries = max_retries,
            exit_code = ?failure.exit_code,
            stderr = %failure.stderr.trim_end(),
            "Transport attempt failed"
        );

        state = state.record_failure(failure);

        if !state.has_budget() {
            return Err(Stopped::Exhausted(state));
        }

        let Some(predicate) = predicate else {
            return Err(Stopped::Exhausted(state));
        };

        let stderr = state
            .last_failure
            .as_ref()
            .map(|f| f.stderr.as_str())
            .unwrap_or_default();

        if !predicate.should_retry(stderr).await {
            tracing::debug!(attempt = number, "Retry predicate declined");
            return Err(Stopped::Exhausted(state));
        }

        tracing::info!(next_attempt = number + 1, "Retrying request");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn failure(text: &str) -> TransportFailure {
        TransportFailure {
            stderr: text.to_string(),
            exit_code: Some(7),
        }
    }

    async fn always_failing(
        max_retries: usize,
        predicate: Option<&dyn RetryPredicate>,
    ) -> (usize, Result<((), usize), Stopped>) {
        let calls = AtomicUsize::new(0);
        let result = run(max_retries, predicate, |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err::<(), _>(AttemptError::Transport(failure(&format!("fail {n}")))) }
        })
        .await;
        (calls.load(Ordering::SeqCst), result)
    }

    #[test]
    fn test_state_transitions() {
        let state = AttemptState::new(2);
        assert_eq!(state.attempt_number(), 1);
        assert!(state.has_budget());

        let state = state.record_failure(failure("first"));
        assert_eq!(state.failures, 1);
        assert_eq!(state.attempt_number(), 2);
        assert!(state.has_budget());

        let state = state.record_failure(failure("second"));
        assert!(!state.has_budget());
        assert_eq!(state.last_failure, Some(failure("second")));
    }

    #[tokio::test]
    async fn test_always_true_predicate_makes_exactly_max_attempts() {
        for max in 1..=5 {
            let (calls, result) = always_failing(max, Some(&RetryAlways)).await;
            assert_eq!(calls, max);
            match result {
                Err(Stopped::Exhausted(state)) => {
                    assert_eq!(state.failures, max);
                    assert_eq!(
                        state.last_failure.map(|f| f.stderr),
                        Some(format!("fail {max}"))
                    );
                }
                other => panic!("Expected Exhausted, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_no_predicate_makes_one_attempt() {
        let (calls, result) = always_failing(10, None).await;
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(Stopped::Exhausted(s)) if s.failures == 1));
    }

    #[tokio::test]
    async fn test_zero_ceiling_still_attempts_once() {
        let (calls, _) = always_failing(0, Some(&RetryAlways)).await;
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_declining_predicate_stops() {
        let predicate = RetryOnMatch::new(["fail 1"]);
        let (calls, _) = always_failing(5, Some(&predicate)).await;
        // "fail 1" retried, "fail 2" declined
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_success_after_failures() {
        let result = run(3, Some(&RetryAlways), |n| async move {
            if n < 3 {
                Err(AttemptError::Transport(failure("boom")))
            } else {
                Ok("done")
            }
        })
        .await;

        match result {
            Ok((value, attempts)) => {
                assert_eq!(value, "done");
                assert_eq!(attempts, 3);
            }
            Err(e) => panic!("Expected success, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let result = run(3, Some(&RetryAlways), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(AttemptError::Fatal(Error::MalformedResponse("x".into()))) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(Stopped::Fatal(Error::MalformedResponse(_)))));
    }

    #[tokio::test]
    async fn test_async_predicate_is_awaited() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        let predicate = retry_if_async(move |stderr| {
            let seen = seen_clone.clone();
            async move {
                tokio::task::yield_now().await;
                seen.fetch_add(1, Ordering::SeqCst);
                stderr.starts_with("fail")
            }
        });

        let (calls, _) = always_failing(4, Some(&predicate)).await;
        assert_eq!(calls, 4);
        // consulted after attempts 1..=3 only; the 4th hits the ceiling
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_combinators() {
        let or = OrPredicate::new(vec![
            Box::new(RetryOnMatch::new(["timed out"])),
            Box::new(retry_if(|s: &str| s.contains("refused"))),
        ]);
        assert!(or.should_retry("curl: (7) Connection refused").await);
        assert!(or.should_retry("curl: (28) Operation timed out").await);
        assert!(!or.should_retry("curl: (3) URL malformed").await);

        let and = AndPredicate::new(vec![
            Box::new(RetryAlways),
            Box::new(RetryOnMatch::new(["refused"])),
        ]);
        assert!(and.should_retry("Connection refused").await);
        assert!(!and.should_retry("URL malformed").await);
    }
}
