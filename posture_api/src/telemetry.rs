use opentelemetry::{
    global,
    metrics::{Counter, Gauge, Histogram, MeterProvider},
    KeyValue,
};
use prometheus::Registry;

const DETECTION_MS_BOUNDARIES: [f64; 9] = [5.0, 10.0, 25.0, 50.0, 100.0, 200.0, 350.0, 500.0, 1000.0];

pub struct Metrics {
    request_counter: Counter<u64>,
    detection_duration: Histogram<u64>,
    stream_fps: Gauge<f64>,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .expect("failed to build prometheus exporter");

        let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
            .with_reader(exporter)
            .build();

        let meter = provider.meter("posture_api");
        global::set_meter_provider(provider);

        let request_counter = meter
            .u64_counter("requests_total")
            .with_description("Total number of requests")
            .build();

        let detection_duration = meter
            .u64_histogram("detection_duration_ms")
            .with_boundaries(DETECTION_MS_BOUNDARIES.to_vec())
            .with_description("Duration of pose detection round-trips in milliseconds")
            .build();

        let stream_fps = meter
            .f64_gauge("stream_fps")
            .with_description("Frame rate of the WebSocket posture stream")
            .build();

        Metrics {
            request_counter,
            detection_duration,
            stream_fps,
            registry,
        }
    }

    pub fn record_request(&self, route: &str) {
        let attributes = vec![KeyValue::new("route", route.to_string())];
        self.request_counter.add(1, &attributes);
    }

    pub fn record_detection_duration(&self, duration_ms: u64, route: &str) {
        let attributes = vec![KeyValue::new("route", route.to_string())];
        self.detection_duration.record(duration_ms, &attributes);
    }

    pub fn record_stream_fps(&self, fps: f64) {
        self.stream_fps.record(fps, &[]);
    }
}
