use chrono::{DateTime, Duration, Utc};
use fleet_domain::{
    CustomerCommunicationSettings, Driver, Load, LoadStatus, NotificationType, Priority,
    RunOutcome, TrackingEvent, Truck,
};
use fleet_errors::FleetResult;
use tracing::{debug, info};

use crate::context::{AgentContext, RunReport};

/// 没有任何跟踪事件的货物按该时长计算陈旧度
const NO_EVENT_STALE_HOURS: f64 = 24.0;

const CUSTOMER_UPDATE_EVENT: &str = "CUSTOMER_UPDATE";

/// 客户沟通代理
///
/// 跟踪事件陈旧时向客户发送进度更新，并在交付前后发出提醒与确认请求。
#[derive(Debug, Clone)]
pub struct CustomerCommunicationAgent {
    ctx: AgentContext,
    settings: CustomerCommunicationSettings,
}

fn hours_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 3_600_000.0
}

fn hours(value: f64) -> Duration {
    Duration::milliseconds((value * 3_600_000.0) as i64)
}

/// 生成客户更新文本
pub fn update_message(
    load: &Load,
    driver: Option<&Driver>,
    truck: Option<&Truck>,
    last_event: Option<&TrackingEvent>,
    now: DateTime<Utc>,
) -> String {
    let mut message = format!("Load {} update: ", load.load_number);

    match load.status {
        LoadStatus::Assigned => {
            let name = driver.map(|d| d.name.as_str()).unwrap_or("unassigned");
            message.push_str(&format!(
                "Driver {name} has been assigned and is preparing for pickup."
            ));
        }
        LoadStatus::InTransit => {
            let location = last_event
                .map(|e| e.location.as_str())
                .or_else(|| driver.and_then(|d| d.current_location.as_deref()))
                .unwrap_or("En route");
            message.push_str(&format!("Currently {location}. "));

            if load.delivery_date > now {
                message.push_str(&format!(
                    "Estimated delivery: {}.",
                    load.delivery_date.format("%Y-%m-%d at %H:%M UTC")
                ));
            } else {
                message.push_str(&format!(
                    "Delivery was scheduled for {}. Checking status...",
                    load.delivery_date.format("%Y-%m-%d")
                ));
            }
        }
        _ => {}
    }

    if let Some(driver) = driver {
        message.push_str(&format!(" Driver: {} ({})", driver.name, driver.phone));
    }
    if let Some(truck) = truck {
        message.push_str(&format!(" | Unit: {}", truck.unit_number));
    }
    message
}

impl CustomerCommunicationAgent {
    pub fn new(ctx: AgentContext, settings: CustomerCommunicationSettings) -> Self {
        Self { ctx, settings }
    }

    pub fn context(&self) -> &AgentContext {
        &self.ctx
    }

    pub async fn run(&self) -> RunOutcome {
        let result = self.execute().await;
        self.ctx.finish(result).await
    }

    async fn execute(&self) -> FleetResult<RunReport> {
        debug!("{} 开始运行", self.ctx.name);
        let store = &self.ctx.store;
        let s = &self.settings;

        let active_loads = store
            .loads
            .find_by_status(&[LoadStatus::Assigned, LoadStatus::InTransit])
            .await?;

        let mut updates_sent = 0usize;
        let mut customers_notified = 0usize;
        for load in &active_loads {
            let now = Utc::now();
            let last_event = store.tracking.find_latest(&load.id).await?;
            let stale_hours = last_event
                .as_ref()
                .map(|e| hours_between(e.timestamp, now))
                .unwrap_or(NO_EVENT_STALE_HOURS);

            if stale_hours >= s.update_interval_hours {
                let driver = match load.driver_id.as_deref() {
                    Some(id) => store.drivers.find_by_id(id).await?,
                    None => None,
                };
                let truck = match load.truck_id.as_deref() {
                    Some(id) => store.trucks.find_by_id(id).await?,
                    None => None,
                };
                let message =
                    update_message(load, driver.as_ref(), truck.as_ref(), last_event.as_ref(), now);

                self.ctx
                    .notify(
                        "Customer Update Sent",
                        format!("Update sent for load {}: {}", load.load_number, message),
                        NotificationType::Info,
                        Priority::Low,
                    )
                    .await?;

                let location = driver
                    .as_ref()
                    .and_then(|d| d.current_location.clone())
                    .unwrap_or_else(|| "Unknown".to_string());
                store
                    .tracking
                    .create(&TrackingEvent::new(
                        &load.id,
                        CUSTOMER_UPDATE_EVENT,
                        &location,
                        Some(message),
                    ))
                    .await?;

                updates_sent += 1;
                customers_notified += 1;
                info!(load = %load.load_number, "已发送客户进度更新");
            }

            if load.status == LoadStatus::InTransit {
                let overdue = hours_between(load.delivery_date, now);
                if overdue > 0.0 && overdue < s.confirmation_window_hours {
                    self.ctx
                        .notify(
                            "Delivery Confirmation Needed",
                            format!("Load {} delivery confirmation required", load.load_number),
                            NotificationType::Warning,
                            Priority::High,
                        )
                        .await?;
                }
            }
        }

        let now = Utc::now();
        let upcoming = store
            .loads
            .find_deliveries_between(LoadStatus::InTransit, now, now + hours(s.lookahead_hours))
            .await?;
        for load in &upcoming {
            let hours_until = hours_between(now, load.delivery_date);
            if hours_until > s.reminder_window_start_hours
                && hours_until <= s.reminder_window_end_hours
            {
                self.ctx
                    .notify(
                        "Delivery Reminder Sent",
                        format!(
                            "Delivery reminder sent for load {} - arriving in {:.1} hours",
                            load.load_number, hours_until
                        ),
                        NotificationType::Info,
                        Priority::Low,
                    )
                    .await?;
                updates_sent += 1;
            }
        }

        Ok(RunReport::new(format!(
            "sent {updates_sent} updates to {customers_notified} customers"
        ))
        .metric("customer_updates_sent_today", updates_sent as f64)
        .metric("customers_notified_today", customers_notified as f64)
        .metric("active_loads_monitored", active_loads.len() as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_testing_utils::{DriverBuilder, LoadBuilder, TrackingEventBuilder, TruckBuilder};

    #[test]
    fn test_assigned_message_names_driver_and_unit() {
        let now = Utc::now();
        let driver = DriverBuilder::new().build();
        let truck = TruckBuilder::new().build();
        let load = LoadBuilder::new()
            .with_status(LoadStatus::Assigned)
            .with_assignment(&driver.id, Some(truck.id.as_str()))
            .build();

        let message = update_message(&load, Some(&driver), Some(&truck), None, now);
        assert_eq!(
            message,
            "Load L2024-001 update: Driver Mike Johnson has been assigned and is preparing for pickup. Driver: Mike Johnson (+1-555-0101) | Unit: T001"
        );
    }

    #[test]
    fn test_in_transit_message_prefers_event_location() {
        let now = Utc::now();
        let delivery = now + Duration::hours(10);
        let load = LoadBuilder::new()
            .with_status(LoadStatus::InTransit)
            .with_delivery_date(delivery)
            .build();
        let event = TrackingEventBuilder::new(&load.id)
            .with_location("Amarillo, TX")
            .build();

        let message = update_message(&load, None, None, Some(&event), now);
        assert!(message.starts_with("Load L2024-001 update: Currently Amarillo, TX. Estimated delivery: "));
        assert!(message.ends_with(&format!("{}.", delivery.format("%Y-%m-%d at %H:%M UTC"))));

        let late = LoadBuilder::new()
            .with_status(LoadStatus::InTransit)
            .with_delivery_date(now - Duration::hours(3))
            .build();
        let message = update_message(&late, None, None, None, now);
        assert!(message.contains("Currently En route. Delivery was scheduled for "));
        assert!(message.ends_with("Checking status..."));
    }
}
