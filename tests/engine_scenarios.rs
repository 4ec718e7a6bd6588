use netvigil::config::NetvigilConfig;
use netvigil::detect::report::{DeviceStatus, MonitorReport};
use netvigil::detect::{AnomalyEngine, Issue, Reading, Severity};
use std::sync::Arc;

// Simulates a fleet of twelve devices polled together, the way the dashboard
// drives the engine: access points, switches and SD-WAN edges.

fn device_ids() -> Vec<String> {
    let prefixes = ["AP", "SW", "WAN"];
    (0..12)
        .map(|i| format!("{}-{:03}", prefixes[i % 3], i + 1))
        .collect()
}

fn nominal(i: usize) -> Reading {
    Reading {
        latency: if i % 2 == 0 { 19.0 } else { 21.0 },
        packet_loss: 0.2,
        bandwidth: 80.0,
        cpu_usage: 15.0,
        memory_usage: 40.0,
    }
}

#[test]
fn test_fleet_poll_cycle() {
    let engine = AnomalyEngine::from_config(&NetvigilConfig::default());
    let ids = device_ids();

    for cycle in 0..30 {
        for id in &ids {
            engine.classify(id, nominal(cycle));
        }
    }

    let statuses = ids
        .iter()
        .map(|id| {
            let reading = match id.as_str() {
                "SW-002" => Reading { latency: 90.0, ..nominal(0) },
                "WAN-003" => Reading { packet_loss: 1.8, ..nominal(0) },
                "AP-004" => Reading { bandwidth: 40.0, ..nominal(0) },
                _ => nominal(0),
            };
            DeviceStatus {
                record: engine.classify(id, reading),
                reading,
            }
        })
        .collect();
    let report = MonitorReport::from_statuses(statuses);

    assert_eq!(report.stats.healthy, 9);
    assert_eq!(report.stats.warning, 2);
    assert_eq!(report.stats.critical, 1);

    let issues: Vec<_> = report
        .anomalies
        .iter()
        .map(|r| (r.device_id.as_str(), r.issue))
        .collect();
    assert_eq!(
        issues,
        vec![
            ("SW-002", Some(Issue::HighLatency)),
            ("WAN-003", Some(Issue::PacketLoss)),
            ("AP-004", Some(Issue::LowBandwidth)),
        ]
    );
    assert!(report.anomalies.iter().all(|r| r.recommendation.is_some()));
    let sw = report
        .devices
        .iter()
        .find(|s| s.record.device_id == "SW-002")
        .unwrap();
    assert_eq!(sw.reading.latency, 90.0);
    assert_eq!(engine.device_count(), 12);
}

#[tokio::test]
async fn test_shared_engine_across_tasks() {
    let engine = Arc::new(AnomalyEngine::default());
    let mut handles = Vec::new();

    for id in device_ids() {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            let mut last = None;
            for i in 0..40 {
                last = Some(engine.classify(&id, nominal(i)));
            }
            last
        }));
    }

    for handle in handles {
        let record = handle.await.unwrap().unwrap();
        assert_eq!(record.severity, Severity::Healthy);
        assert_eq!(record.confidence, 95);
    }
    for id in device_ids() {
        assert_eq!(engine.history_len(&id), Some(40));
    }
}
