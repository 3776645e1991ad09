//! Concurrent fan-out helpers.
//!
//! Racing lookup sources: every source runs at once, the first acceptable
//! result wins and the rest are dropped, which cancels their I/O.

use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};

/// Result of [`race_first`].
#[derive(Debug)]
pub enum RaceOutcome<T> {
    /// A future produced an accepted value; all others were cancelled.
    Winner { index: usize, value: T },

    /// Nothing was accepted. Every result, sorted by the futures' original
    /// position.
    Exhausted(Vec<(usize, T)>),
}

/// Run `futures` concurrently and return the first value `accept` approves.
///
/// Once a winner is found the remaining futures are dropped before this
/// function returns, so nothing keeps running in the background.
pub async fn race_first<'a, T, F>(futures: Vec<BoxFuture<'a, T>>, accept: F) -> RaceOutcome<T>
where
    T: Send + 'a,
    F: Fn(&T) -> bool,
{
    let mut pending: FuturesUnordered<_> = futures
        .into_iter()
        .enumerate()
        .map(|(index, fut)| async move { (index, fut.await) })
        .collect();

    let mut finished = Vec::new();
    while let Some((index, value)) = pending.next().await {
        if accept(&value) {
            return RaceOutcome::Winner { index, value };
        }
        finished.push((index, value));
    }

    finished.sort_by_key(|(index, _)| *index);
    RaceOutcome::Exhausted(finished)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn delayed(ms: u64, value: u32) -> BoxFuture<'static, u32> {
        async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            value
        }
        .boxed()
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_accepted_wins() {
        let outcome = race_first(
            vec![delayed(300, 7), delayed(100, 0), delayed(200, 5)],
            |v| *v > 0,
        )
        .await;

        match outcome {
            RaceOutcome::Winner { index, value } => {
                assert_eq!(index, 2);
                assert_eq!(value, 5);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_keeps_declaration_order() {
        let outcome = race_first(vec![delayed(300, 1), delayed(100, 2)], |_| false).await;
        match outcome {
            RaceOutcome::Exhausted(all) => assert_eq!(all, vec![(0, 1), (1, 2)]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_losers_are_cancelled() {
        let completed = Arc::new(AtomicUsize::new(0));
        let slow = {
            let completed = completed.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                completed.fetch_add(1, Ordering::SeqCst);
                0u32
            }
            .boxed()
        };

        let outcome = race_first(vec![slow, delayed(10, 9)], |v| *v > 0).await;
        assert!(matches!(outcome, RaceOutcome::Winner { value: 9, .. }));

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let outcome = race_first(Vec::<BoxFuture<'static, u32>>::new(), |_| true).await;
        assert!(matches!(outcome, RaceOutcome::Exhausted(ref v) if v.is_empty()));
    }
}
