use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio_stream::Stream;

use super::aggregator::MetricAggregator;
use super::MetricSample;

/// Pass-through stream that times every item it yields.
///
/// The clock starts on the first poll. Each `Ok` or `Err` item records one
/// sample (errors carry an `error` tag); items are handed on unchanged and
/// unbuffered. Dropping the stream before it yields records nothing.
pub struct MeasuredStream<S> {
    inner: Pin<Box<S>>,
    aggregator: MetricAggregator,
    metric_id: String,
    context: String,
    started: Option<Instant>,
}

impl<S> MeasuredStream<S> {
    pub(crate) fn new(
        aggregator: MetricAggregator,
        metric_id: impl Into<String>,
        context: impl Into<String>,
        stream: S,
    ) -> Self {
        Self {
            inner: Box::pin(stream),
            aggregator,
            metric_id: metric_id.into(),
            context: context.into(),
            started: None,
        }
    }
}

impl<S, T, E> Stream for MeasuredStream<S>
where
    S: Stream<Item = Result<T, E>>,
{
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let started = *this.started.get_or_insert_with(Instant::now);

        let polled = this.inner.as_mut().poll_next(cx);
        if let Poll::Ready(Some(item)) = &polled {
            let mut sample = MetricSample::new(&*this.metric_id, &*this.context, started.elapsed());
            if item.is_err() {
                sample = sample.with_tag("error");
            }
            this.aggregator.record(sample);
        }
        polled
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn values_and_errors_pass_through_and_are_timed() {
        let agg = MetricAggregator::new();
        let source = tokio_stream::iter(vec![Ok(1), Err("boom"), Ok(3)]);

        let items: Vec<Result<i32, &str>> =
            agg.measure_stream("quotes", "vendor", source).collect().await;

        assert_eq!(items, vec![Ok(1), Err("boom"), Ok(3)]);
        let samples = agg.all_samples();
        assert_eq!(samples.len(), 3);
        assert!(samples.iter().all(|s| s.metric_id == "quotes"));
        assert_eq!(samples.iter().filter(|s| s.tags.contains("error")).count(), 1);
    }

    #[tokio::test]
    async fn dropping_before_any_item_records_nothing() {
        let agg = MetricAggregator::new();
        let mut measured =
            agg.measure_stream("quotes", "vendor", tokio_stream::pending::<Result<u8, ()>>());

        let waited = tokio::time::timeout(Duration::from_millis(5), measured.next()).await;
        assert!(waited.is_err());
        drop(measured);

        assert!(agg.is_empty());
    }

    #[tokio::test]
    async fn an_empty_stream_records_nothing() {
        let agg = MetricAggregator::new();
        let source = tokio_stream::empty::<Result<u8, ()>>();
        let items: Vec<_> = agg.measure_stream("quotes", "vendor", source).collect().await;

        assert!(items.is_empty());
        assert!(agg.is_empty());
    }
}
