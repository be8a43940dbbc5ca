//! Metrics definitions for the relay.

use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds. Tagged with handler, status.",
};

pub const UPSTREAM_REQUESTS: MetricDef = MetricDef {
    name: "upstream.requests",
    metric_type: MetricType::Counter,
    description: "Responses received from Notion. Tagged with endpoint, status.",
};

pub const UPSTREAM_ERRORS: MetricDef = MetricDef {
    name: "upstream.errors",
    metric_type: MetricType::Counter,
    description: "Notion calls that failed without a response. Tagged with endpoint.",
};

pub const ALL_METRICS: &[MetricDef] = &[REQUEST_DURATION, UPSTREAM_REQUESTS, UPSTREAM_ERRORS];
