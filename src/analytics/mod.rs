use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

use crate::telemetry::{spawn_best_effort, TelemetrySink};

/// How many events we keep for the inspection endpoint.
const MAX_RECENT_EVENTS: usize = 200;

/// One user-interaction event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub event_id: Uuid,
    /// "search", "filter", "page_view", "click", ...
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Stamps events with ids and the session, keeps the most recent ones and
/// forwards each to the telemetry sink.
#[derive(Clone)]
pub struct AnalyticsTracker {
    session_id: Uuid,
    inner: Arc<Mutex<Inner>>,
    sink: Option<Arc<dyn TelemetrySink>>,
}

#[derive(Default)]
struct Inner {
    user_id: Option<String>,
    recent: VecDeque<AnalyticsEvent>,
}

impl Default for AnalyticsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsTracker {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            inner: Arc::new(Mutex::new(Inner::default())),
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Attach (or clear) the user id on subsequent events.
    pub fn set_user(&self, user_id: Option<String>) {
        self.inner.lock().user_id = user_id;
    }

    pub fn track_event(
        &self,
        event_type: &str,
        properties: Map<String, Value>,
        url: Option<String>,
    ) -> AnalyticsEvent {
        let event = {
            let mut inner = self.inner.lock();
            let event = AnalyticsEvent {
                event_id: Uuid::new_v4(),
                event_type: event_type.to_string(),
                timestamp: Utc::now(),
                session_id: self.session_id,
                user_id: inner.user_id.clone(),
                properties,
                url,
            };
            inner.recent.push_back(event.clone());
            if inner.recent.len() > MAX_RECENT_EVENTS {
                inner.recent.pop_front();
            }
            event
        };

        tracing::debug!(
            event_type = %event.event_type,
            event_id = %event.event_id,
            session_id = %event.session_id,
            "tracking analytics event"
        );

        if let Some(sink) = self.sink.clone() {
            let forwarded = event.clone();
            spawn_best_effort("analytics event", async move {
                sink.send_event(&forwarded).await
            });
        }

        event
    }

    pub fn track_search(
        &self,
        query: &str,
        results_count: u64,
        filters: Option<Value>,
        duration_ms: Option<f64>,
    ) -> AnalyticsEvent {
        let mut props = Map::new();
        props.insert("query".into(), Value::from(query));
        props.insert("resultsCount".into(), Value::from(results_count));
        if let Some(filters) = filters {
            props.insert("filters".into(), filters);
        }
        if let Some(duration) = duration_ms {
            props.insert("duration".into(), Value::from(duration));
        }
        self.track_event("search", props, None)
    }

    pub fn track_filter(
        &self,
        filter_type: &str,
        filter_value: Value,
        results_count_after_filter: u64,
    ) -> AnalyticsEvent {
        let mut props = Map::new();
        props.insert("filterType".into(), Value::from(filter_type));
        props.insert("filterValue".into(), filter_value);
        props.insert(
            "resultsCountAfterFilter".into(),
            Value::from(results_count_after_filter),
        );
        self.track_event("filter", props, None)
    }

    pub fn track_page_view(&self, url: &str) -> AnalyticsEvent {
        let mut props = Map::new();
        props.insert("url".into(), Value::from(url));
        self.track_event("page_view", props, Some(url.to_string()))
    }

    pub fn track_click(&self, element_id: &str, element_name: Option<&str>) -> AnalyticsEvent {
        let mut props = Map::new();
        props.insert("elementId".into(), Value::from(element_id));
        if let Some(name) = element_name {
            props.insert("elementName".into(), Value::from(name));
        }
        self.track_event("click", props, None)
    }

    /// Oldest first.
    pub fn recent_events(&self) -> Vec<AnalyticsEvent> {
        self.inner.lock().recent.iter().cloned().collect()
    }
}
