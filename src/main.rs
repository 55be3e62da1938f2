use log::{debug, error, info};
use motndp::models::{
    city::{
        city_grid::{City, CityError},
        od_matrix::OdMatrix,
    },
    line::{line_config::LineEnvConfig, line_env::LineEnv},
};
use rand::seq::SliceRandom;

const GRID_ROWS: usize = 6;
const GRID_COLS: usize = 6;
const NR_STATIONS: usize = 8;

/// Demand falls off with the distance between cells; the left half of the
/// grid is group 0 and the right half group 1.
fn demo_city() -> Result<City, CityError> {
    let size = GRID_ROWS * GRID_COLS;
    let mut od = OdMatrix::zeros(size);
    for o in 0..size {
        for d in 0..size {
            if o == d {
                continue;
            }
            let dr = (o / GRID_COLS).abs_diff(d / GRID_COLS);
            let dc = (o % GRID_COLS).abs_diff(d % GRID_COLS);
            od.set(o, d, 1.0 / (1 + dr.max(dc)) as f32);
        }
    }
    let groups: Vec<usize> = (0..size)
        .map(|i| usize::from(i % GRID_COLS >= GRID_COLS / 2))
        .collect();
    City::from_group_map(GRID_ROWS, GRID_COLS, &od, &groups)
}

fn main() {
    std::env::set_var("RUST_LOG", "motndp=debug");
    env_logger::init();
    debug!("Debug on");

    let city = match demo_city() {
        Ok(city) => city,
        Err(e) => {
            error!("Demo city is invalid: {e}");
            return;
        }
    };
    let mut env = match LineEnv::new(city, LineEnvConfig::new(NR_STATIONS)) {
        Ok(env) => env,
        Err(e) => {
            error!("Could not build line environment: {e}");
            return;
        }
    };
    if let Err(e) = env.reset(Some(42), None) {
        error!("Could not reset: {e}");
        return;
    }

    let mut rng = rand::thread_rng();
    let mut totals = vec![0.0_f32; env.nr_groups()];
    loop {
        let Some(action) = env.action_mask().legal_actions().choose(&mut rng).copied() else {
            break;
        };
        match env.step_action(action) {
            Ok(step) => {
                for (t, r) in totals.iter_mut().zip(&step.reward) {
                    *t += r;
                }
                if step.terminated {
                    break;
                }
            }
            Err(e) => {
                error!("Step failed: {e}");
                return;
            }
        }
    }
    info!(
        "Line {:?} serves {:?} of each group's demand",
        env.covered_locations(),
        totals
    );
}
