// 50 Hz command loop with watchdog
// Robot-centric commands are latched and re-applied every tick; if they stop
// arriving the watchdog releases the wheels once. Drive/strafe/turn requests
// block the loop until the drivetrain finishes them, and their final hold is
// left in place until the next command.

use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::config::{CMD_TIMEOUT, LOOP_HZ, TOPIC_CMD_MOTION, TOPIC_HEALTH, TOPIC_REPORT};
use crate::drivetrain::{ActuatorPort, Clock, DriveTrainController, HeadingSensor};
use crate::messages::{MotionReport, MotionRequest, RuntimeHealth};

/// What the loop should do on this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Actuation {
    /// Re-apply the latched robot-centric vector
    RobotCentric { forward: f64, side: f64, rotate: f64 },
    /// Teleop just went stale; wheels should coast
    Release,
    /// Leave the wheels as the last motion left them
    Idle,
}

pub struct Runtime {
    latest_cmd: Option<MotionRequest>,
    cmd_received_at: Instant,
    health: RuntimeHealth,
    pending: Vec<MotionRequest>,
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            latest_cmd: None,
            cmd_received_at: Instant::now(),
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
            pending: Vec::new(),
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    /// Process incoming request
    pub fn on_request(&mut self, request: MotionRequest) {
        info!("Received request: {:?}", &request);
        if request.is_continuous() {
            self.latest_cmd = Some(request);
            self.cmd_received_at = Instant::now();
        } else {
            // A discrete motion supersedes any teleop vector
            self.latest_cmd = None;
            self.pending.push(request);
        }
    }

    /// Discrete motions received since the last call, oldest first
    pub fn take_pending(&mut self) -> Vec<MotionRequest> {
        std::mem::take(&mut self.pending)
    }

    pub fn mark_fault(&mut self) {
        self.health = RuntimeHealth::Fault;
    }

    /// Compute actuation based on watchdog state
    pub fn compute_actuation(&mut self) -> Actuation {
        self.compute_actuation_at(Instant::now())
    }

    fn compute_actuation_at(&mut self, now: Instant) -> Actuation {
        let cmd_age = now.saturating_duration_since(self.cmd_received_at);

        match self.latest_cmd {
            Some(MotionRequest::RobotCentric {
                forward,
                side,
                rotate,
            }) if cmd_age <= CMD_TIMEOUT => {
                self.health = RuntimeHealth::Ok;
                Actuation::RobotCentric {
                    forward,
                    side,
                    rotate,
                }
            }
            Some(_) => {
                // Watchdog triggered - stop the robot
                if self.health != RuntimeHealth::CmdStale {
                    warn!("Command stale ({:?} old), releasing wheels", cmd_age);
                }
                self.latest_cmd = None;
                self.health = RuntimeHealth::CmdStale;
                Actuation::Release
            }
            None => {
                if self.health != RuntimeHealth::Fault {
                    self.health = RuntimeHealth::CmdStale;
                }
                Actuation::Idle
            }
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one discrete request and describe the result
pub fn execute_request<A, H, C>(
    controller: &mut DriveTrainController<A, H, C>,
    request: &MotionRequest,
) -> MotionReport
where
    A: ActuatorPort,
    H: HeadingSensor,
    C: Clock,
{
    let started = controller.clock().now();
    let result = controller.execute(request);
    let elapsed_ms = controller
        .clock()
        .now()
        .saturating_sub(started)
        .as_millis() as u64;
    match result {
        Ok(outcome) => MotionReport {
            kind: request.kind().to_string(),
            outcome: Some(outcome),
            elapsed_ms,
            error: None,
        },
        Err(e) => {
            error!("{} failed: {}", request.kind(), e);
            MotionReport {
                kind: request.kind().to_string(),
                outcome: None,
                elapsed_ms,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Apply this tick's actuation to the drivetrain
pub fn apply_actuation<A, H, C>(
    controller: &mut DriveTrainController<A, H, C>,
    actuation: Actuation,
) -> crate::Result<()>
where
    A: ActuatorPort,
    H: HeadingSensor,
    C: Clock,
{
    match actuation {
        Actuation::RobotCentric {
            forward,
            side,
            rotate,
        } => controller.drive_robot_centric(forward, side, rotate),
        Actuation::Release => controller.release(),
        Actuation::Idle => Ok(()),
    }
}

pub async fn run<A, H, C>(
    mut controller: DriveTrainController<A, H, C>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    A: ActuatorPort,
    H: HeadingSensor,
    C: Clock,
{
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_MOTION).await?;
    let pub_report = session.declare_publisher(TOPIC_REPORT).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut runtime = Runtime::new();
    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        LOOP_HZ,
        CMD_TIMEOUT.as_millis()
    );
    info!("Subscribed to: {}", TOPIC_CMD_MOTION);
    info!("Publishing to: {}, {}", TOPIC_REPORT, TOPIC_HEALTH);

    loop {
        tick.tick().await;

        // 1. Drain all pending requests (non-blocking)
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<MotionRequest>(&payload) {
                Ok(request) => runtime.on_request(request),
                Err(e) => warn!("Failed to parse request: {}", e),
            }
        }

        // 2. Run discrete motions to completion, in arrival order
        for request in runtime.take_pending() {
            let report = tokio::task::block_in_place(|| execute_request(&mut controller, &request));
            if report.error.is_some() {
                runtime.mark_fault();
            }
            pub_report.put(serde_json::to_string(&report)?).await?;
        }

        // 3. Apply teleop vector or release (includes watchdog logic)
        let actuation = runtime.compute_actuation();
        if let Err(e) = apply_actuation(&mut controller, actuation) {
            error!("Failed to apply actuation: {}", e);
            runtime.mark_fault();
        }

        // 4. Publish health
        let health_json = serde_json::to_string(&runtime.health())?;
        pub_health.put(health_json).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriveConfig;
    use crate::drivetrain::sim::{SimImu, SimWheel, SimWorld};
    use crate::drivetrain::{MotionOutcome, NullDiagnostics, RunMode, WheelRole};

    fn sim_controller(world: &SimWorld) -> DriveTrainController<SimWheel, SimImu, SimWorld> {
        DriveTrainController::new(world.wheels(), world.imu(), world.clone(), DriveConfig::default())
            .unwrap()
            .with_diagnostics(NullDiagnostics)
    }

    fn teleop(forward: f64) -> MotionRequest {
        MotionRequest::RobotCentric {
            forward,
            side: 0.0,
            rotate: 0.0,
        }
    }

    #[test]
    fn test_starts_stale() {
        let mut runtime = Runtime::new();
        assert_eq!(runtime.compute_actuation(), Actuation::Idle);
        assert_eq!(runtime.health(), RuntimeHealth::CmdStale);
    }

    #[test]
    fn test_fresh_teleop_is_applied() {
        let mut runtime = Runtime::new();
        runtime.on_request(teleop(0.4));
        assert_eq!(
            runtime.compute_actuation(),
            Actuation::RobotCentric {
                forward: 0.4,
                side: 0.0,
                rotate: 0.0
            }
        );
        assert_eq!(runtime.health(), RuntimeHealth::Ok);
    }

    #[test]
    fn test_watchdog_releases_stale_teleop() {
        let mut runtime = Runtime::new();
        runtime.on_request(teleop(0.4));
        let later = Instant::now() + CMD_TIMEOUT + Duration::from_millis(50);
        assert_eq!(runtime.compute_actuation_at(later), Actuation::Release);
        assert_eq!(runtime.health(), RuntimeHealth::CmdStale);
        // Released once, then left alone
        assert_eq!(runtime.compute_actuation_at(later), Actuation::Idle);
    }

    #[test]
    fn test_discrete_requests_queue_in_order() {
        let mut runtime = Runtime::new();
        runtime.on_request(teleop(0.4));
        runtime.on_request(MotionRequest::Drive {
            distance_cm: 10.0,
            power: 0.5,
        });
        runtime.on_request(MotionRequest::Turn {
            target_deg: 90.0,
            power: 0.2,
            axis: 1,
        });

        let pending = runtime.take_pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].kind(), "drive");
        assert_eq!(pending[1].kind(), "turn");
        assert!(runtime.take_pending().is_empty());
        // Teleop vector was dropped by the discrete motion
        assert_eq!(runtime.compute_actuation(), Actuation::Idle);
    }

    #[test]
    fn test_execute_request_reports_outcome_and_errors() {
        let world = SimWorld::default();
        let mut controller = sim_controller(&world);

        let report = execute_request(
            &mut controller,
            &MotionRequest::Drive {
                distance_cm: 20.0,
                power: 0.5,
            },
        );
        assert_eq!(report.outcome, Some(MotionOutcome::Reached));
        assert!(report.error.is_none());
        // Timed on the simulated clock, not the wall clock
        assert!(report.elapsed_ms > 0);
        assert_eq!(report.elapsed_ms, world.now().as_millis() as u64);

        let report = execute_request(
            &mut controller,
            &MotionRequest::Turn {
                target_deg: 90.0,
                power: 0.2,
                axis: 7,
            },
        );
        assert_eq!(report.outcome, None);
        assert!(report.error.unwrap().contains("axis 7"));
    }

    #[test]
    fn test_hold_survives_ticks_after_discrete_motion() {
        let world = SimWorld::default();
        let mut controller = sim_controller(&world);
        let mut runtime = Runtime::new();

        runtime.on_request(MotionRequest::Drive {
            distance_cm: 20.0,
            power: 0.5,
        });
        for request in runtime.take_pending() {
            execute_request(&mut controller, &request);
        }
        for _ in 0..3 {
            let actuation = runtime.compute_actuation();
            apply_actuation(&mut controller, actuation).unwrap();
        }

        for role in WheelRole::ALL {
            assert_eq!(world.power(role), 1.0, "{:?}", role);
            assert_eq!(world.run_mode(role), RunMode::ClosedLoopToPosition);
        }
    }

    #[test]
    fn test_stale_teleop_releases_wheels() {
        let world = SimWorld::default();
        let mut controller = sim_controller(&world);
        let mut runtime = Runtime::new();

        runtime.on_request(teleop(0.5));
        let actuation = runtime.compute_actuation();
        apply_actuation(&mut controller, actuation).unwrap();
        assert!(world.power(WheelRole::FrontLeft) != 0.0);

        let later = Instant::now() + CMD_TIMEOUT + Duration::from_millis(50);
        let actuation = runtime.compute_actuation_at(later);
        apply_actuation(&mut controller, actuation).unwrap();
        for role in WheelRole::ALL {
            assert_eq!(world.power(role), 0.0, "{:?}", role);
        }
    }
}
