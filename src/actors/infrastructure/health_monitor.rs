use kameo::Actor;
use kameo::message::{Context, Message};
use kameo::actor::ActorRef;
use kameo::error::Infallible;
use kameo::reply::{Reply, ReplyError};
use serde::Serialize;
use std::sync::Arc;
use std::collections::BTreeMap;
use std::time::Duration;
use chrono::Utc;
use crate::metrics::Metrics;
use crate::utils::{CircuitBreaker, CircuitState};
use crate::actors::core::{HealthStatus, ComponentHealth};

// ============================================================================
// Health Monitor Actor - Aggregates component health
// ============================================================================
//
// Responsibilities:
// - Track health status reported by the realtime listener
// - Poll the Telegram circuit breaker and mirror it into metrics
// - Aggregate system-wide health for GET /health
//
// ============================================================================

pub const REALTIME_COMPONENT: &str = "realtime";
pub const TELEGRAM_COMPONENT: &str = "telegram";

const BREAKER_POLL_INTERVAL: Duration = Duration::from_secs(10);

// ============================================================================
// Messages
// ============================================================================

pub struct UpdateHealth {
    pub component: String,
    pub status: HealthStatus,
    pub details: Option<String>,
}

pub struct GetSystemHealth;

#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    pub overall_status: HealthStatus,
    pub components: BTreeMap<String, ComponentHealth>,
    pub check_time: chrono::DateTime<Utc>,
}

impl Reply for SystemHealth {
    type Ok = Self;
    type Error = Infallible;
    type Value = Self;

    fn to_result(self) -> Result<Self, Infallible> {
        Ok(self)
    }

    fn into_any_err(self) -> Option<Box<dyn ReplyError>> {
        None
    }

    fn into_value(self) -> Self::Value {
        self
    }
}

// ============================================================================
// Health Monitor Actor
// ============================================================================

pub struct HealthMonitorActor {
    components: BTreeMap<String, ComponentHealth>,
    telegram_breaker: Option<Arc<CircuitBreaker>>,
    metrics: Arc<Metrics>,
}

impl HealthMonitorActor {
    pub fn new(telegram_breaker: Option<Arc<CircuitBreaker>>, metrics: Arc<Metrics>) -> Self {
        Self {
            components: BTreeMap::new(),
            telegram_breaker,
            metrics,
        }
    }

    fn compute_overall_status(&self) -> HealthStatus {
        let mut has_degraded = false;
        let mut unhealthy_components = Vec::new();

        for (name, health) in &self.components {
            match &health.status {
                HealthStatus::Unhealthy(msg) => {
                    unhealthy_components.push(format!("{}: {}", name, msg));
                }
                HealthStatus::Degraded(_) => {
                    has_degraded = true;
                }
                HealthStatus::Healthy => {}
            }
        }

        if !unhealthy_components.is_empty() {
            HealthStatus::Unhealthy(unhealthy_components.join(", "))
        } else if has_degraded {
            HealthStatus::Degraded("Some components degraded".to_string())
        } else {
            HealthStatus::Healthy
        }
    }
}

fn breaker_health(state: CircuitState) -> HealthStatus {
    match state {
        CircuitState::Closed => HealthStatus::Healthy,
        CircuitState::HalfOpen => HealthStatus::Degraded("Circuit breaker half-open".to_string()),
        CircuitState::Open => HealthStatus::Unhealthy("Circuit breaker open".to_string()),
    }
}

impl Actor for HealthMonitorActor {
    type Args = Self;
    type Error = Infallible;

    async fn on_start(
        state: Self::Args,
        actor_ref: ActorRef<Self>
    ) -> Result<Self, Self::Error> {
        tracing::info!("HealthMonitorActor started");

        if let Some(breaker) = state.telegram_breaker.clone() {
            let metrics = state.metrics.clone();
            let actor_ref = actor_ref.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(BREAKER_POLL_INTERVAL);
                loop {
                    interval.tick().await;

                    let breaker_state = breaker.get_state().await;
                    metrics.update_circuit_breaker_state(breaker_state.as_gauge());

                    let sent = actor_ref.tell(UpdateHealth {
                        component: TELEGRAM_COMPONENT.to_string(),
                        status: breaker_health(breaker_state),
                        details: None,
                    }).send().await;

                    if sent.is_err() {
                        break;
                    }
                }
            });
        }

        Ok(state)
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Message<UpdateHealth> for HealthMonitorActor {
    type Reply = ();

    async fn handle(&mut self, msg: UpdateHealth, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        let changed = self
            .components
            .get(&msg.component)
            .map(|current| current.status != msg.status)
            .unwrap_or(true);

        if changed {
            tracing::debug!(
                component = %msg.component,
                status = ?msg.status,
                "Updated component health"
            );
        }

        let health = ComponentHealth::new(msg.component.clone(), msg.status).with_details(msg.details);
        self.components.insert(msg.component, health);
    }
}

impl Message<GetSystemHealth> for HealthMonitorActor {
    type Reply = SystemHealth;

    async fn handle(&mut self, _msg: GetSystemHealth, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        SystemHealth {
            overall_status: self.compute_overall_status(),
            components: self.components.clone(),
            check_time: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> HealthMonitorActor {
        HealthMonitorActor::new(None, Arc::new(Metrics::new().unwrap()))
    }

    #[test]
    fn test_overall_status_prefers_worst_component() {
        let mut actor = monitor();
        assert!(actor.compute_overall_status().is_healthy());

        actor.components.insert(
            REALTIME_COMPONENT.to_string(),
            ComponentHealth::new(REALTIME_COMPONENT, HealthStatus::Degraded("retrying".to_string())),
        );
        assert!(matches!(actor.compute_overall_status(), HealthStatus::Degraded(_)));

        actor.components.insert(
            TELEGRAM_COMPONENT.to_string(),
            ComponentHealth::new(TELEGRAM_COMPONENT, HealthStatus::Unhealthy("Circuit breaker open".to_string())),
        );
        match actor.compute_overall_status() {
            HealthStatus::Unhealthy(reason) => assert!(reason.contains("telegram")),
            other => panic!("expected unhealthy, got {other:?}"),
        }
    }

    #[test]
    fn test_breaker_state_mapping() {
        assert!(breaker_health(CircuitState::Closed).is_healthy());
        assert!(breaker_health(CircuitState::Open).is_unhealthy());
    }

    #[tokio::test]
    async fn test_reported_health_is_aggregated() {
        let actor_ref = HealthMonitorActor::spawn(monitor());

        actor_ref
            .tell(UpdateHealth {
                component: REALTIME_COMPONENT.to_string(),
                status: HealthStatus::Healthy,
                details: Some("subscribed".to_string()),
            })
            .send()
            .await
            .unwrap();

        let health = actor_ref.ask(GetSystemHealth).send().await.unwrap();
        assert!(health.overall_status.is_healthy());
        assert_eq!(
            health.components[REALTIME_COMPONENT].details.as_deref(),
            Some("subscribed")
        );
    }
}
