//! The multi-threaded pipeline executor.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use flume::Sender;
use thread_priority::ThreadPriority;
use tracing::{debug, error, info, warn};

use thermo_types::{PipelineEvent, StageKind};

use crate::error::{PipelineError, PipelineResult, StageError};
use crate::graph::{PipelineGraph, PipelineNode};
use crate::stage::{Step, Task};
use crate::timing::ShutdownHandle;

/// A handle to a running stage in the executor.
struct StageHandle {
    kind: StageKind,
    thread_handle: thread::JoinHandle<()>,
}

/// Runs each stage on its own named thread.
pub struct Executor {
    handles: Vec<StageHandle>,
    shutdown: ShutdownHandle,
    events: Sender<PipelineEvent>,
}

impl Executor {
    /// Spawn every stage of `graph`.
    pub fn start(graph: PipelineGraph) -> PipelineResult<Self> {
        let PipelineGraph { nodes, shutdown, events } = graph;
        let mut executor = Self { handles: Vec::with_capacity(nodes.len()), shutdown, events };

        for node in nodes {
            let kind = node.kind;
            match spawn_stage(node, executor.events.clone()) {
                Ok(thread_handle) => executor.handles.push(StageHandle { kind, thread_handle }),
                Err(e) => {
                    // unwind whatever already started
                    executor.stop();
                    return Err(PipelineError::Spawn { stage: kind.to_string(), message: e.to_string() });
                }
            }
        }
        info!("Executor started {} stage threads", executor.handles.len());
        Ok(executor)
    }

    /// True once every stage thread has exited on its own.
    pub fn is_finished(&self) -> bool {
        self.handles.iter().all(|h| h.thread_handle.is_finished())
    }

    /// Request shutdown and join every stage.
    ///
    /// Sampling wakes from its sleep and exits, dropping its signal; the
    /// downstream stages drain what is pending and follow.
    pub fn stop(mut self) {
        info!("Stopping pipeline executor...");
        self.shutdown.stop();
        self.join_all();
    }

    fn join_all(&mut self) {
        for handle in self.handles.drain(..) {
            debug!("Waiting for stage '{}' to shut down...", handle.kind);
            if let Err(e) = handle.thread_handle.join() {
                error!("Stage '{}' thread panicked outside its step: {}", handle.kind, panic_message(&e));
            }
        }
        let _ = self.events.send(PipelineEvent::ShutdownAck);
        info!("All stages joined");
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            self.shutdown.stop();
            self.join_all();
        }
    }
}

fn spawn_stage(node: PipelineNode, events: Sender<PipelineEvent>) -> std::io::Result<thread::JoinHandle<()>> {
    let PipelineNode { kind, task, priority } = node;
    thread::Builder::new()
        .name(kind.name().to_string())
        .spawn(move || run_stage(task, priority, events))
}

/// Body of a stage thread.
fn run_stage(mut task: Box<dyn Task>, priority: Option<ThreadPriority>, events: Sender<PipelineEvent>) {
    let stage = task.kind();
    if let Some(priority) = priority {
        if let Err(e) = thread_priority::set_current_thread_priority(priority) {
            warn!("Failed to set priority for stage '{}': {:?}", stage, e);
        }
    }

    info!("Stage thread '{}' started.", stage);
    let _ = events.send(PipelineEvent::StageStarted { stage });

    loop {
        let result = panic::catch_unwind(AssertUnwindSafe(|| task.step()));
        let error = match result {
            Ok(Ok(Step::Continue)) => continue,
            Ok(Ok(Step::Stop)) => {
                let _ = events.send(PipelineEvent::StageStopped { stage });
                break;
            }
            Ok(Err(e)) => e,
            Err(payload) => StageError::Panicked(panic_message(&payload)),
        };

        // fail-stop: the unit is never restarted
        error!("Stage '{}' halted: {}", stage, error);
        let _ = events.send(PipelineEvent::StageHalted { stage, reason: error.to_string() });
        break;
    }

    info!("Stage thread '{}' finished.", stage);
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
