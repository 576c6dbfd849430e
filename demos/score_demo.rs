//! Run every pipeline against the bundled demo artifacts

use fitlytics_core::fitness::RawFitnessInputs;
use fitlytics_core::{Exercise, FitlyticsEngine};

const ACTIVITY_MODEL: &str = include_str!("data/activity_model.json");
const FITNESS_MODEL: &str = include_str!("data/fitness_model.json");
const SENSOR_WINDOW: &str = include_str!("data/sensor_window.json");
const RAW_INPUTS: &str = include_str!("data/raw_inputs.json");
const FORM_WINDOW: &str = include_str!("data/form_window.json");

fn main() {
    let engine = match (
        fitlytics_core::ModelArtifact::from_json(ACTIVITY_MODEL),
        fitlytics_core::ModelArtifact::from_json(FITNESS_MODEL),
    ) {
        (Ok(activity), Ok(fitness)) => FitlyticsEngine::new()
            .with_activity_model(activity)
            .with_fitness_model(fitness),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error: {e}");
            return;
        }
    };

    match engine.classify_json(SENSOR_WINDOW) {
        Ok(payload) => println!("{payload}"),
        Err(e) => eprintln!("Error: {e:?}"),
    }

    match engine.evaluate_form_json(Exercise::JumpingJacks, FORM_WINDOW) {
        Ok(payload) => println!("{payload}"),
        Err(e) => eprintln!("Error: {e:?}"),
    }

    match RawFitnessInputs::from_json(RAW_INPUTS).and_then(|inputs| engine.score_raw_inputs(&inputs)) {
        Ok(report) => println!(
            "fitness score {:.2} ({}) from raw {:.2}",
            report.score,
            report.level.as_str(),
            report.raw
        ),
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
