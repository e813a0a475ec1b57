use std::fmt;
use std::ops::{Deref, DerefMut, Drop};
use std::sync::Mutex;

use crate::exec::Runner;

/// A small cache of idle runners owned by one compiled expression.
///
/// A match needs a runner with its stacks and capture book, and
/// allocating those per call is a real cost for callers who match in a
/// loop (`find_iter`, `replace_all`). The pool keeps finished runners
/// around instead: acquisition pops one under a mutex held only for the
/// push/pop itself, and a runner is never shared while a match is in
/// flight. There is no bound on how many runners exist; concurrent
/// callers that miss the pool simply allocate.
pub(crate) struct RunnerPool {
    idle: Mutex<Vec<Runner>>,
}

impl RunnerPool {
    pub fn new() -> RunnerPool {
        RunnerPool { idle: Mutex::new(Vec::new()) }
    }

    /// Take a runner, allocating if none is idle. The guard returns the
    /// runner to the pool when dropped.
    pub fn get(&self) -> RunnerGuard<'_> {
        let mut idle = self.idle.lock().unwrap();
        let runner = idle.pop().unwrap_or_else(Runner::new);
        RunnerGuard { pool: self, runner: Some(runner) }
    }

    fn put(&self, runner: Runner) {
        let mut idle = self.idle.lock().unwrap();
        idle.push(runner);
    }
}

/// Scoped access to a pooled runner.
pub(crate) struct RunnerGuard<'a> {
    pool: &'a RunnerPool,
    runner: Option<Runner>,
}

impl<'a> Deref for RunnerGuard<'a> {
    type Target = Runner;
    fn deref(&self) -> &Runner {
        self.runner.as_ref().unwrap()
    }
}

impl<'a> DerefMut for RunnerGuard<'a> {
    fn deref_mut(&mut self) -> &mut Runner {
        self.runner.as_mut().unwrap()
    }
}

impl<'a> Drop for RunnerGuard<'a> {
    fn drop(&mut self) {
        // reset regardless of how the match ended so no partial state
        // survives into the next acquisition
        let mut runner = self.runner.take().unwrap();
        runner.reset();
        self.pool.put(runner);
    }
}

impl fmt::Debug for RunnerPool {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let idle = self.idle.lock().unwrap();
        write!(f, "RunnerPool({} idle)", idle.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runners_are_recycled() {
        let pool = RunnerPool::new();
        {
            let _a = pool.get();
            let _b = pool.get();
        }
        assert_eq!(pool.idle.lock().unwrap().len(), 2);
        {
            let _c = pool.get();
            assert_eq!(pool.idle.lock().unwrap().len(), 1);
        }
        assert_eq!(pool.idle.lock().unwrap().len(), 2);
    }
}
