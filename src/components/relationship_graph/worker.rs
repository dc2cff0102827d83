//! Hosts the simulation engine off the render thread.
//!
//! [`SimulationWorker::spawn`] runs the engine on a dedicated thread and talks
//! to it over channels. Where threads are unavailable (e.g. single-threaded
//! wasm) it falls back to driving the same [`Engine`] in-process, one tick per
//! poll, behind the same message protocol.

use std::collections::VecDeque;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use log::{debug, warn};

use super::error::GraphError;
use super::protocol::{SimCommand, SimEvent};
use super::simulation::{SimulationParams, SimulationState};

/// Whether the host should keep serving messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
	/// Keep reading commands.
	Continue,
	/// `STOP` was received.
	Stop,
}

/// Message dispatcher around the single [`SimulationState`].
///
/// Remembers the last size and params it was given, so an `UPDATE_DATA`
/// arriving before `INIT` still starts centred and tuned.
#[derive(Default)]
pub struct Engine {
	state: Option<SimulationState>,
	dimensions: (f64, f64),
	params: SimulationParams,
}

impl Engine {
	/// An engine with no layout; the first `INIT` or `UPDATE_DATA` creates one.
	pub fn new() -> Self {
		Self::default()
	}

	/// Applies one command. Returns [`Control::Stop`] after `STOP`.
	pub fn handle(&mut self, cmd: SimCommand) -> Control {
		match cmd {
			SimCommand::Init {
				nodes,
				links,
				width,
				height,
				params,
			} => {
				self.dimensions = (width, height);
				self.params = params.clone();
				self.state = Some(SimulationState::new(&nodes, &links, width, height, params));
			}
			SimCommand::UpdateData { nodes, links } => match self.state.as_mut() {
				Some(state) => state.update_data(&nodes, &links),
				None => {
					let (width, height) = self.dimensions;
					self.state = Some(SimulationState::new(
						&nodes,
						&links,
						width,
						height,
						self.params.clone(),
					));
				}
			},
			SimCommand::UpdateDimensions {
				width,
				height,
				params,
			} => {
				self.dimensions = (width, height);
				if let Some(p) = &params {
					self.params = p.clone();
				}
				if let Some(state) = self.state.as_mut() {
					state.update_dimensions(width, height, params);
				}
			}
			SimCommand::DragStart { id, x, y } => {
				if let Some(state) = self.state.as_mut() {
					state.drag_start(&id, x, y);
				}
			}
			SimCommand::DragMove { id, x, y } => {
				if let Some(state) = self.state.as_mut() {
					state.drag_move(&id, x, y);
				}
			}
			SimCommand::DragEnd { id } => {
				if let Some(state) = self.state.as_mut() {
					state.drag_end(&id);
				}
			}
			SimCommand::Stop => {
				self.state = None;
				return Control::Stop;
			}
		}
		Control::Continue
	}

	/// A layout exists and is still cooling.
	pub fn is_running(&self) -> bool {
		self.state.as_ref().is_some_and(SimulationState::is_running)
	}

	/// Ticks once if the layout is running and reports the new positions.
	pub fn step(&mut self) -> Option<SimEvent> {
		let state = self.state.as_mut()?;
		if !state.is_running() {
			return None;
		}
		state.tick();
		Some(SimEvent::Tick {
			positions: state.positions(),
		})
	}

	/// Tick spacing for the threaded host, never zero.
	pub fn tick_interval(&self) -> Duration {
		let ms = self
			.state
			.as_ref()
			.map_or(SimulationParams::default().tick_interval_ms, |s| {
				s.params().tick_interval_ms
			});
		Duration::from_millis(ms.max(1))
	}

	/// The layout, once `INIT` or `UPDATE_DATA` has created it.
	pub fn state(&self) -> Option<&SimulationState> {
		self.state.as_ref()
	}
}

/// Channel ends and join handle of a threaded engine.
pub struct ThreadedWorker {
	commands: Sender<SimCommand>,
	events: Receiver<SimEvent>,
	handle: Option<JoinHandle<()>>,
}

/// Engine driven synchronously by the caller.
#[derive(Default)]
pub struct InlineWorker {
	engine: Engine,
	stopped: bool,
	queue: VecDeque<SimEvent>,
}

/// Handle the orchestrator uses to talk to the engine, wherever it runs.
pub enum SimulationWorker {
	/// Engine on its own thread.
	Threaded(ThreadedWorker),
	/// Engine ticked by the caller.
	Inline(InlineWorker),
}

impl SimulationWorker {
	/// Spawns the engine thread, or degrades to in-process when that fails.
	pub fn spawn() -> Self {
		match Self::try_spawn() {
			Ok(worker) => worker,
			Err(e) => {
				warn!("simulation: {e}; running in-process");
				Self::inline()
			}
		}
	}

	/// Spawns the engine thread, reporting failure to the caller.
	pub fn try_spawn() -> Result<Self, GraphError> {
		let (cmd_tx, cmd_rx) = unbounded();
		let (evt_tx, evt_rx) = unbounded();
		let handle = thread::Builder::new()
			.name("graph-simulation".into())
			.spawn(move || run(cmd_rx, evt_tx))?;
		debug!("simulation: worker thread started");
		Ok(Self::Threaded(ThreadedWorker {
			commands: cmd_tx,
			events: evt_rx,
			handle: Some(handle),
		}))
	}

	/// Engine in the caller's thread, ticked once per [`SimulationWorker::poll`].
	pub fn inline() -> Self {
		Self::Inline(InlineWorker::default())
	}

	/// Running on its own thread.
	pub fn is_threaded(&self) -> bool {
		matches!(self, Self::Threaded(_))
	}

	/// Sends a command without waiting for it to be applied.
	pub fn post(&mut self, cmd: SimCommand) {
		match self {
			Self::Threaded(w) => {
				if w.commands.send(cmd).is_err() {
					debug!("simulation: worker gone, command dropped");
				}
			}
			Self::Inline(w) => {
				if w.stopped {
					return;
				}
				if w.engine.handle(cmd) == Control::Stop {
					w.stopped = true;
				}
			}
		}
	}

	/// Collects every event produced since the last poll. The inline host
	/// advances one tick per poll.
	pub fn poll(&mut self) -> Vec<SimEvent> {
		match self {
			Self::Threaded(w) => w.events.try_iter().collect(),
			Self::Inline(w) => {
				if let Some(event) = w.engine.step() {
					w.queue.push_back(event);
				}
				w.queue.drain(..).collect()
			}
		}
	}

	/// Sends `STOP` and waits for the thread to exit.
	pub fn stop(&mut self) {
		match self {
			Self::Threaded(w) => {
				let _ = w.commands.send(SimCommand::Stop);
				if let Some(handle) = w.handle.take() {
					if handle.join().is_err() {
						warn!("simulation: worker thread panicked");
					}
				}
			}
			Self::Inline(w) => {
				w.engine.handle(SimCommand::Stop);
				w.stopped = true;
				w.queue.clear();
			}
		}
	}
}

impl Drop for SimulationWorker {
	fn drop(&mut self) {
		self.stop();
	}
}

/// Thread body: block while idle, otherwise tick at the configured interval,
/// applying commands as soon as they arrive.
fn run(commands: Receiver<SimCommand>, events: Sender<SimEvent>) {
	let mut engine = Engine::new();
	loop {
		if !engine.is_running() {
			match commands.recv() {
				Ok(cmd) => {
					if engine.handle(cmd) == Control::Stop {
						break;
					}
				}
				Err(_) => break,
			}
		}

		loop {
			match commands.try_recv() {
				Ok(cmd) => {
					if engine.handle(cmd) == Control::Stop {
						debug!("simulation: worker stopped");
						return;
					}
				}
				Err(TryRecvError::Empty) => break,
				Err(TryRecvError::Disconnected) => return,
			}
		}

		if let Some(event) = engine.step() {
			if events.send(event).is_err() {
				return;
			}
		}

		match commands.recv_timeout(engine.tick_interval()) {
			Ok(cmd) => {
				if engine.handle(cmd) == Control::Stop {
					break;
				}
			}
			Err(RecvTimeoutError::Timeout) => {}
			Err(RecvTimeoutError::Disconnected) => break,
		}
	}
	debug!("simulation: worker stopped");
}
