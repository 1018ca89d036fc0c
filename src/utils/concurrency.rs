// src/utils/concurrency.rs

//! Bounded concurrency runner.

use std::future::Future;

use futures::stream::{self, StreamExt};

use crate::error::Result;

/// Run `worker` over `items` with at most `concurrency` calls in flight.
///
/// Slots free up as soon as any call finishes, not in fixed waves. The
/// output has one slot per input, in input order; a failed call leaves
/// `None` in its slot and never cancels its siblings.
pub async fn run_all<T, R, F, Fut>(items: Vec<T>, concurrency: usize, worker: F) -> Vec<Option<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(items.len()).collect();
    let worker = &worker;

    let mut in_flight = stream::iter(items.into_iter().enumerate())
        .map(|(index, item)| async move { (index, worker(item).await) })
        .buffer_unordered(concurrency.max(1));

    while let Some((index, result)) = in_flight.next().await {
        match result {
            Ok(value) => slots[index] = Some(value),
            Err(error) => log::warn!("Item {index} failed: {error}"),
        }
    }

    slots
}
