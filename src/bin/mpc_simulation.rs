// Closed-loop path tracking simulation with nonlinear MPC.
//
// A simulated vehicle drives a winding track. Every control period its noisy
// pose is encoded as a simulator telemetry message, answered by the
// telemetry handler, and the reply acts on the vehicle after the configured
// latency. The run is plotted to img/mpc_simulation.svg.
//
// usage: mpc_simulation [params.toml]

use log::{info, warn, LevelFilter};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use mpc_controller::config::{self, MpcConfig};
use mpc_controller::simulation::{CommandDelay, PlantState, Track, VehiclePlant};
use mpc_controller::telemetry::messages::MPH_TO_MPS;
use mpc_controller::telemetry::{SteerCommand, TelemetryHandler};
use mpc_controller::utils::{logger_init, TrackingPlot};
use mpc_controller::{Actuation, MotionModel, MpcController, MpcError, MpcResult};

const SIM_TIME: f64 = 40.0; // [s]
const CONTROL_PERIOD: f64 = 0.1; // [s]
const PLANT_DT: f64 = 0.01; // [s]

const WAYPOINTS_AHEAD: usize = 6;
const POSITION_NOISE: f64 = 0.05; // [m]
const HEADING_NOISE: f64 = 0.002; // [rad]
const PLOT_EVERY: usize = 20; // ticks between drawn predictions

fn main() {
    if let Err(e) = run() {
        eprintln!("mpc_simulation: {}", e);
        std::process::exit(1);
    }
}

fn run() -> MpcResult<()> {
    logger_init(LevelFilter::Info)?;

    let config: MpcConfig = match std::env::args().nth(1) {
        Some(path) => config::load(path)?,
        None => MpcConfig::default(),
    };
    let max_steering = config.max_steering();
    let plant = VehiclePlant::new(config.lf);
    let mut delay = CommandDelay::new(config.latency);
    let mut handler = TelemetryHandler::new(MpcController::new(config)?);

    let noise = |sigma: f64| Normal::new(0.0, sigma).map_err(|e| MpcError::InvalidConfig(e.to_string()));
    let position_noise = noise(POSITION_NOISE)?;
    let heading_noise = noise(HEADING_NOISE)?;
    let mut rng = StdRng::seed_from_u64(7);

    let track = Track::sine(800.0, 10.0, 15.0, 200.0);
    let mut state = PlantState::new(0.0, 2.0, 0.0, 5.0);
    let mut plot = TrackingPlot::new("MPC path tracking");
    plot.set_reference(&track.xs, &track.ys);
    plot.push_position(state.x, state.y);

    let ticks = (SIM_TIME / CONTROL_PERIOD).round() as usize;
    let substeps = (CONTROL_PERIOD / PLANT_DT).round() as usize;
    let mut time = 0.0;

    for tick in 0..ticks {
        let measured = PlantState {
            x: state.x + position_noise.sample(&mut rng),
            y: state.y + position_noise.sample(&mut rng),
            psi: state.psi + heading_noise.sample(&mut rng),
            v: state.v,
        };
        let telemetry = track.telemetry(&measured, WAYPOINTS_AHEAD, 1.0 / MPH_TO_MPS);
        if telemetry.ptsx.len() < WAYPOINTS_AHEAD {
            info!("End of track reached at t = {:.1} s", time);
            break;
        }
        let msg = format!("42[\"telemetry\",{}]", serde_json::to_string(&telemetry)?);

        match handler.handle(&msg) {
            Ok(Some(reply)) => {
                let (_, cmd): (String, SteerCommand) = serde_json::from_str(&reply[2..])?;
                delay.push(time, Actuation::new(-cmd.steering_angle * max_steering, cmd.throttle));

                if let Some(out) = handler.last_output() {
                    if !out.is_success() {
                        plot.push_failure(state.x, state.y);
                    } else if tick % PLOT_EVERY == 0 {
                        plot.push_prediction(
                            measured.x,
                            measured.y,
                            measured.psi,
                            &out.predicted_x,
                            &out.predicted_y,
                        );
                    }
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Tick {}: {}", tick, e),
        }

        for _ in 0..substeps {
            let u = delay.active(time);
            state = plant.propagate(&state, &u, PLANT_DT);
            time += PLANT_DT;
            plot.push_position(state.x, state.y);
        }
    }

    let (solves, failures) = handler.controller().statistics();
    info!(
        "Finished: {} solves, {} failures, final pose ({:.1}, {:.1}) at {:.2} m/s",
        solves, failures, state.x, state.y, state.v
    );

    if let Err(e) = std::fs::create_dir_all("img") {
        warn!("Cannot create img directory: {}", e);
    }
    match plot.save_svg("img/mpc_simulation.svg") {
        Ok(_) => info!("Plot saved to img/mpc_simulation.svg"),
        Err(e) => warn!("Cannot save plot: {}", e),
    }
    Ok(())
}
