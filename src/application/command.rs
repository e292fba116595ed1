//! Command dispatch with undo/redo
//!
//! Mutating merge operations are commands with symmetric undo and redo.
//! The dispatcher keeps unbounded LIFO history stacks; executing a new
//! command clears the redo stack. Cross-cutting behavior that must follow
//! every command runs as an explicit, ordered list of post-command effects
//! rather than being baked into the commands themselves.

use crate::domain::comparison::ComparisonModel;
use crate::domain::manager::TagManager;
use crate::error::Result;
use std::cell::Cell;
use std::rc::Rc;

/// Mutable state a command operates on
pub struct CommandContext<'a, 's> {
    pub model: &'a mut ComparisonModel,
    pub manager: &'a TagManager<'s>,
}

/// Which dispatcher entry point ran a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    Execute,
    Undo,
    Redo,
}

/// A reversible merge operation. Each method must be idempotent: running
/// execute twice without an undo in between is a no-op, and likewise for
/// undo and redo.
pub trait Command {
    fn execute(&mut self, ctx: &mut CommandContext) -> Result<()>;
    fn undo(&mut self, ctx: &mut CommandContext) -> Result<()>;
    fn redo(&mut self, ctx: &mut CommandContext) -> Result<()>;
}

/// Cross-cutting behavior run after every command action, in list order
pub trait PostCommandEffect {
    fn apply(&mut self, action: CommandAction);
}

/// Shared handle to the session's unsaved-changes flag
#[derive(Debug, Clone, Default)]
pub struct DirtyFlag(Rc<Cell<bool>>);

impl DirtyFlag {
    pub fn new() -> Self {
        DirtyFlag::default()
    }

    pub fn is_dirty(&self) -> bool {
        self.0.get()
    }

    pub fn clear(&self) {
        self.0.set(false);
    }

    fn mark(&self) {
        self.0.set(true);
    }
}

/// Marks the session dirty after every command action
pub struct DirtyTracker {
    flag: DirtyFlag,
}

impl DirtyTracker {
    pub fn new(flag: DirtyFlag) -> Self {
        DirtyTracker { flag }
    }
}

impl PostCommandEffect for DirtyTracker {
    fn apply(&mut self, _action: CommandAction) {
        self.flag.mark();
    }
}

/// Undo/redo history plus the post-command effects pipeline
#[derive(Default)]
pub struct CommandDispatcher {
    undo_stack: Vec<Box<dyn Command>>,
    redo_stack: Vec<Box<dyn Command>>,
    effects: Vec<Box<dyn PostCommandEffect>>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        CommandDispatcher::default()
    }

    /// Append an effect; effects run in registration order
    pub fn register_effect(&mut self, effect: Box<dyn PostCommandEffect>) {
        self.effects.push(effect);
    }

    /// Run a new command and push it onto the undo stack.
    ///
    /// A failing command is not recorded, and a successful one invalidates
    /// the redo history.
    pub fn execute(
        &mut self,
        mut command: Box<dyn Command>,
        ctx: &mut CommandContext,
    ) -> Result<()> {
        command.execute(ctx)?;
        self.undo_stack.push(command);
        self.redo_stack.clear();
        self.run_effects(CommandAction::Execute);
        Ok(())
    }

    /// Undo the most recent command, if any. Returns whether one was undone.
    pub fn undo(&mut self, ctx: &mut CommandContext) -> Result<bool> {
        let Some(mut command) = self.undo_stack.pop() else {
            return Ok(false);
        };
        command.undo(ctx)?;
        self.redo_stack.push(command);
        self.run_effects(CommandAction::Undo);
        Ok(true)
    }

    /// Re-apply the most recently undone command, if any
    pub fn redo(&mut self, ctx: &mut CommandContext) -> Result<bool> {
        let Some(mut command) = self.redo_stack.pop() else {
            return Ok(false);
        };
        command.redo(ctx)?;
        self.undo_stack.push(command);
        self.run_effects(CommandAction::Redo);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    fn run_effects(&mut self, action: CommandAction) {
        for effect in &mut self.effects {
            effect.apply(action);
        }
    }
}
