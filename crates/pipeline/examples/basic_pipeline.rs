//! Basic pipeline example: a scripted sensor sweeping through the three
//! classes, printed in the serial console format.

use std::time::Duration;

use pipeline::{Executor, LineSink, PipelineConfig, PipelineGraph, ReferenceModel};
use thermo_sensor::ScriptedSensor;
use thermo_types::PipelineEvent;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Basic Pipeline Example");
    println!("======================");

    let config = PipelineConfig { sampling_period_ms: 200, ..Default::default() };
    let sweep = [4.0, 12.5, 19.0, 22.0, 25.5, 28.0, 34.0].map(Ok);
    let expected = sweep.len();
    let sensor = ScriptedSensor::new(sweep);
    let engine = ReferenceModel::from_config(&config)?;

    let (event_tx, event_rx) = flume::unbounded();
    let graph = PipelineGraph::build(&config, sensor, engine, LineSink::stdout(), event_tx)?;
    let executor = Executor::start(graph)?;

    let mut reports = 0;
    while reports < expected {
        match event_rx.recv_timeout(Duration::from_secs(2))? {
            PipelineEvent::Reported { .. } => reports += 1,
            event if event.is_fatal() => {
                eprintln!("{:?}", event);
                break;
            }
            _ => {}
        }
    }

    executor.stop();
    Ok(())
}
