//! Example demonstrating retry predicates.
//!
//! This example shows how to:
//! - Retry on curl failures with a closure
//! - Use an async predicate
//! - Combine predicates with AND/OR logic
//! - Inspect the error once retries run out
//!
//! Run with: `cargo run --example custom_retry`

use async_trait::async_trait;
use curlew::retry::{AndPredicate, OrPredicate, RetryOnMatch, RetryPredicate};
use curlew::{Error, RequestOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Custom predicate: only allow a fixed number of retries across all calls
struct RetryBudget(AtomicUsize);

#[async_trait]
impl RetryPredicate for RetryBudget {
    async fn should_retry(&self, _failure: &str) -> bool {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn report(result: Result<curlew::Response, Error>) {
    match result {
        Ok(response) => println!(
            "Success! Status {} after {} attempts",
            response.status_code, response.attempts
        ),
        Err(Error::Request(err)) => {
            println!(
                "Failed after {} of {} attempts",
                err.context.attempts, err.context.max_retries
            );
            println!("  curl exit code: {:?}", err.context.exit_code);
            println!("  curl said: {}", err.message.trim_end());
        }
        Err(e) => println!("Failed: {}", e),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("curlew=info,custom_retry=info")
        .init();

    // Nothing listens on port 9, so every attempt fails with exit code 7
    let unreachable = "http://127.0.0.1:9/";

    println!("=== Example 1: Retry with a Closure ===");
    let options = RequestOptions::new()
        .with_max_retries(3)
        .with_retry_if(|stderr| {
            stderr.contains("Failed to connect") || stderr.contains("Couldn't connect")
        });
    report(curlew::request(unreachable, options).await);
    println!();

    println!("=== Example 2: Async Predicate ===");
    // The predicate may take its time; the next attempt waits for it
    let options = RequestOptions::new()
        .with_max_retries(2)
        .with_retry_if_async(|stderr| async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            !stderr.is_empty()
        });
    report(curlew::request(unreachable, options).await);
    println!();

    println!("=== Example 3: Combining Predicates ===");
    let budget = Arc::new(RetryBudget(AtomicUsize::new(1)));
    let predicate = AndPredicate::new(vec![
        Box::new(OrPredicate::new(vec![
            Box::new(RetryOnMatch::new(["Could not resolve host"])),
            Box::new(RetryOnMatch::new(["Failed to connect", "Couldn't connect"])),
        ])),
        Box::new(SharedBudget(budget)),
    ]);
    let options = RequestOptions::new()
        .with_max_retries(5)
        .with_retry_predicate(Arc::new(predicate));
    report(curlew::request(unreachable, options).await);
}

struct SharedBudget(Arc<RetryBudget>);

#[async_trait]
impl RetryPredicate for SharedBudget {
    async fn should_retry(&self, failure: &str) -> bool {
        self.0.should_retry(failure).await
    }
}
