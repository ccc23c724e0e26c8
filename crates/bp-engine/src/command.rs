//! Parameter edits sent from the main loop to the audio callback.
//!
//! The engine owns the step tables it synthesizes from. Edits made on the
//! main loop travel through a single-producer/single-consumer ring buffer
//! and are applied at the start of the next render call, so the callback
//! never observes a half-written step.

use bp_ir::StepSettings;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Pending edits the queue can hold between two render calls.
pub const COMMAND_QUEUE_CAPACITY: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EngineCommand {
    SetStep {
        track: usize,
        step: usize,
        settings: StepSettings,
    },
    SetGain {
        track: usize,
        gain: f32,
    },
    /// Return to sample 0 with all phases reset.
    Rewind,
}

/// Main-loop end of the queue.
pub struct CommandSender {
    producer: HeapProd<EngineCommand>,
}

/// Audio end of the queue, owned by the engine.
pub struct CommandReceiver {
    consumer: HeapCons<EngineCommand>,
}

pub fn command_queue() -> (CommandSender, CommandReceiver) {
    let (producer, consumer) = HeapRb::<EngineCommand>::new(COMMAND_QUEUE_CAPACITY).split();
    (CommandSender { producer }, CommandReceiver { consumer })
}

impl CommandSender {
    /// Queue a command. Gives the command back if the queue is full.
    pub fn send(&mut self, command: EngineCommand) -> Result<(), EngineCommand> {
        self.producer.try_push(command)
    }
}

impl CommandReceiver {
    pub fn try_recv(&mut self) -> Option<EngineCommand> {
        self.consumer.try_pop()
    }
}

impl std::fmt::Debug for CommandSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSender").finish()
    }
}

impl std::fmt::Debug for CommandReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandReceiver").finish()
    }
}
