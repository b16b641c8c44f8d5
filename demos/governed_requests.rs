//! Governed Requests Example
//!
//! This example demonstrates the request governor end to end:
//! - Immediate execution while the token budget lasts
//! - Priority queuing once the budget is exhausted
//! - Retry with exponential backoff on transient failures
//! - Reacting to an explicit rate-limit-exceeded signal
//!
//! Usage:
//!   cargo run --example governed_requests

use async_trait::async_trait;
use request_governor::{
    Error, EventSink, GovernorConfig, GovernorEvent, Priority, RequestGovernor,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Prints rate-limit pauses the way a status indicator would show them.
struct StatusLine;

#[async_trait]
impl EventSink for StatusLine {
    async fn report(&self, event: GovernorEvent) -> request_governor::Result<()> {
        match event {
            GovernorEvent::RateLimitExceeded { wait } => {
                println!("[status] rate limited by the service; pausing {:?}", wait);
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> request_governor::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== Request Governor Demo ===\n");

    demo_priority_queuing().await?;
    demo_retry_with_backoff().await?;
    demo_rate_limit_signal().await?;

    Ok(())
}

async fn demo_priority_queuing() -> request_governor::Result<()> {
    println!("--- Example 1: Priority Queuing ---\n");

    // 2 requests of burst, one new token per second
    let config = GovernorConfig::new().with_capacity(2).with_refill_rate(1.0);
    let governor = RequestGovernor::new(config)?;

    println!("Budget: burst 2, 1 request/second\n");

    let start = Instant::now();
    let mut handles = Vec::new();
    for (name, priority) in [
        ("import summary", Priority::Low),
        ("slide text", Priority::Normal),
        ("title image", Priority::High),
        ("speaker notes", Priority::Normal),
    ] {
        let governor = governor.clone();
        handles.push(tokio::spawn(async move {
            let outcome = governor
                .execute_request(priority, move || async move {
                    // a real caller would issue the API request here
                    Ok::<_, Error>(name)
                })
                .await;
            (name, start.elapsed(), outcome)
        }));
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    for handle in handles {
        let (name, at, outcome) = handle.await.expect("task panicked");
        match outcome {
            Ok(_) => println!("{:>14} finished after {:?}", name, at),
            Err(e) => println!("{:>14} failed: {}", name, e),
        }
    }
    println!();
    Ok(())
}

async fn demo_retry_with_backoff() -> request_governor::Result<()> {
    println!("--- Example 2: Retry with Backoff ---\n");

    let config = GovernorConfig::new()
        .with_max_retries(3)
        .with_base_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(2));
    let governor = RequestGovernor::new(config)?;

    let attempts = Arc::new(AtomicU32::new(0));
    let result = {
        let attempts = Arc::clone(&attempts);
        governor
            .execute_with_retry(move || {
                let attempts = Arc::clone(&attempts);
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    println!("attempt {}...", n + 1);
                    if n < 2 {
                        Err(Error::remote(503, "model overloaded"))
                    } else {
                        Ok("slide outline")
                    }
                }
            })
            .await
    };

    println!("result after retries: {:?}\n", result?);
    Ok(())
}

async fn demo_rate_limit_signal() -> request_governor::Result<()> {
    println!("--- Example 3: Rate-Limit-Exceeded Signal ---\n");

    let config = GovernorConfig::new()
        .with_capacity(2)
        .with_refill_rate(0.5)
        .with_max_retries(2)
        .with_base_delay(Duration::from_millis(100));
    let governor = RequestGovernor::with_sink(config, Arc::new(StatusLine))?;

    let attempts = Arc::new(AtomicU32::new(0));
    let result = {
        let attempts = Arc::clone(&attempts);
        governor
            .execute_with_retry(move || {
                let attempts = Arc::clone(&attempts);
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        // the service asked us to slow down
                        Err(Error::RateLimited {
                            retry_after: Some(Duration::from_secs(1)),
                        })
                    } else {
                        Ok("image data")
                    }
                }
            })
            .await
    };

    println!("recovered after the pause: {:?}", result?);
    println!(
        "bucket refilled to {} tokens\n",
        governor.snapshot().await.bucket.tokens
    );
    Ok(())
}
