use std::time::Duration;

use fleet_config::AgentIntervals;
use fleet_domain::AgentKind;

/// 代理类型对应的固定执行间隔
pub fn interval_for(intervals: &AgentIntervals, kind: AgentKind) -> Duration {
    let seconds = match kind {
        AgentKind::LoadMatching => intervals.load_matching_seconds,
        AgentKind::RouteOptimization => intervals.route_optimization_seconds,
        AgentKind::FuelOptimization => intervals.fuel_optimization_seconds,
        AgentKind::ComplianceMonitoring => intervals.compliance_monitoring_seconds,
        AgentKind::CustomerCommunication => intervals.customer_communication_seconds,
    };
    Duration::from_secs(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_intervals_are_distinct() {
        let intervals = AgentIntervals::default();
        let secs: Vec<u64> = AgentKind::ALL
            .iter()
            .map(|kind| interval_for(&intervals, *kind).as_secs())
            .collect();
        assert_eq!(secs, vec![120, 300, 600, 900, 1800]);
    }
}
