use crate::changes::ChangeSet;
use crate::core::Result;
use std::fmt;

/// Point in a record's transaction lifecycle at which observers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitHook {
    BeforeCommit,
    AfterCommit,
    AfterRollback,
}

impl fmt::Display for CommitHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitHook::BeforeCommit => write!(f, "before_commit"),
            CommitHook::AfterCommit => write!(f, "after_commit"),
            CommitHook::AfterRollback => write!(f, "after_rollback"),
        }
    }
}

pub type Condition = Box<dyn Fn(&ChangeSet) -> bool + Send>;
pub type Callback = Box<dyn FnMut(&ChangeSet) -> Result<()> + Send>;

struct Observer {
    hook: CommitHook,
    condition: Option<Condition>,
    callback: Callback,
}

/// Commit-time observers of one record, run in registration order.
#[derive(Default)]
pub struct Observers {
    observers: Vec<Observer>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, hook: CommitHook, callback: F)
    where
        F: FnMut(&ChangeSet) -> Result<()> + Send + 'static,
    {
        self.observers.push(Observer {
            hook,
            condition: None,
            callback: Box::new(callback),
        });
    }

    /// Registers an observer that only runs when `condition` holds for the
    /// change view at the time the hook fires.
    pub fn register_if<C, F>(&mut self, hook: CommitHook, condition: C, callback: F)
    where
        C: Fn(&ChangeSet) -> bool + Send + 'static,
        F: FnMut(&ChangeSet) -> Result<()> + Send + 'static,
    {
        self.observers.push(Observer {
            hook,
            condition: Some(Box::new(condition)),
            callback: Box::new(callback),
        });
    }

    /// Runs every observer for `hook`, stopping at the first error.
    pub fn run(&mut self, hook: CommitHook, view: &ChangeSet) -> Result<()> {
        for observer in self.observers.iter_mut().filter(|o| o.hook == hook) {
            if let Some(condition) = &observer.condition
                && !condition(view)
            {
                continue;
            }
            (observer.callback)(view)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.observers.iter().map(|o| o.hook))
            .finish()
    }
}

/// Condition: the change view includes `name`.
pub fn saved_change_to(name: impl Into<String>) -> impl Fn(&ChangeSet) -> bool + Send + 'static {
    let name = name.into();
    move |view: &ChangeSet| view.contains(&name)
}
