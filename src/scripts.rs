use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::blocks::Block;
use crate::delay;
use crate::error::ScriptError;
use crate::events::KernelEvent;
use crate::runtime::Runtime;
use crate::world::EntityId;

pub type ScriptFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ScriptError>> + 'a>>;

/// What a running script can reach: the shared runtime, its subject entity,
/// movement, the delay primitive and the console. Nothing else.
pub struct ScriptContext {
    runtime: Runtime,
    subject: EntityId,
    token: CancellationToken,
}

impl ScriptContext {
    pub fn new(runtime: Runtime, subject: EntityId, token: CancellationToken) -> Self {
        Self { runtime, subject, token }
    }

    pub async fn sleep(&self, duration: Duration) -> Result<(), ScriptError> {
        delay::sleep(duration, &self.token).await
    }

    /// Steps the subject along its heading, then pauses for one motion frame.
    pub async fn move_subject(&self, steps: f64) -> Result<(), ScriptError> {
        if !self.runtime.world_mut().move_steps(self.subject, steps) {
            return Err(ScriptError::MissingSubject(self.subject));
        }
        self.sleep(self.runtime.timing().motion_pause()).await
    }

    pub fn log(&self, event: KernelEvent) {
        self.runtime.log(event);
    }

    /// Runs a block sequence in order, stopping at the first error.
    pub fn execute<'a>(&'a self, blocks: &'a [Block]) -> ScriptFuture<'a> {
        Box::pin(async move {
            for block in blocks {
                self.step(block).await?;
            }
            Ok(())
        })
    }

    fn subject_is_stage(&self) -> Result<bool, ScriptError> {
        self.runtime
            .world()
            .entity(self.subject)
            .map(|entity| entity.is_stage)
            .ok_or(ScriptError::MissingSubject(self.subject))
    }

    fn subject_name(&self) -> Result<String, ScriptError> {
        self.runtime
            .world()
            .entity(self.subject)
            .map(|entity| entity.name.clone())
            .ok_or(ScriptError::MissingSubject(self.subject))
    }

    async fn step(&self, block: &Block) -> Result<(), ScriptError> {
        let timing = self.runtime.timing();
        match block {
            Block::Move { steps } => {
                if self.subject_is_stage()? {
                    return Ok(());
                }
                let steps = steps.evaluate()?.to_number(block.opcode())?;
                self.move_subject(steps).await
            }
            Block::Turn { degrees } => {
                if self.subject_is_stage()? {
                    return Ok(());
                }
                let degrees = degrees.evaluate()?.to_number(block.opcode())?;
                self.runtime.world_mut().turn(self.subject, degrees);
                self.sleep(timing.motion_pause()).await
            }
            Block::GotoXy { x, y } => {
                if self.subject_is_stage()? {
                    return Ok(());
                }
                let x = x.evaluate()?.to_number(block.opcode())?;
                let y = y.evaluate()?.to_number(block.opcode())?;
                self.runtime.world_mut().go_to_xy(self.subject, x, y);
                self.sleep(timing.motion_pause()).await
            }
            Block::Say { message } => {
                let message = message.evaluate()?.to_string();
                self.log(KernelEvent::Say { speaker: self.subject_name()?, message });
                self.sleep(timing.say_pause()).await
            }
            Block::SwitchBackdrop { backdrop } => {
                let name = backdrop.evaluate()?.to_string();
                if !self.runtime.world_mut().set_backdrop(&name) {
                    return Err(ScriptError::UnknownBackdrop(name));
                }
                Ok(())
            }
            Block::Wait { duration } => {
                let seconds = duration.evaluate()?.to_number(block.opcode())?;
                self.sleep(delay::seconds(seconds)).await
            }
            Block::Forever { body } => loop {
                self.execute(body).await?;
                self.sleep(timing.loop_yield()).await?;
            },
            Block::Repeat { times, body } => {
                let times = times.evaluate()?.to_number(block.opcode())?;
                let mut iteration = 0.0;
                while iteration < times {
                    self.execute(body).await?;
                    self.sleep(timing.loop_yield()).await?;
                    iteration += 1.0;
                }
                Ok(())
            }
            Block::If { condition, body } => {
                if condition.evaluate()?.is_truthy() {
                    self.execute(body).await
                } else {
                    Ok(())
                }
            }
            Block::Broadcast { message } => {
                let message = message.evaluate()?.to_string();
                self.runtime.broadcast_under(&message, &self.token);
                Ok(())
            }
        }
    }
}
