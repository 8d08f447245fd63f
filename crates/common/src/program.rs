//! Evaluation context of a program
//!
//! A [`Program`] is created once per evaluation pass. It owns everything that
//! would otherwise be process-global: the functions already created per logical
//! name and the hooks that must run when the program has finished declaring
//! resources.

use crate::config::ProgramConfig;
use crate::graph::{Resource, ResourceGraph, ResourceSpec};
use crate::resources::LambdaFunction;
use crate::Result;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Work deferred until every resource of the program has been declared
pub trait ExitHook {
    /// Declare any deferred resources
    ///
    /// Returns whether anything was declared, in which case the hooks run
    /// again so that work scheduled during this pass is not lost.
    fn before_exit(&self, program: &Program<'_>) -> Result<bool>;
}

/// Evaluation context handed to every declaration helper
pub struct Program<'g> {
    graph: &'g dyn ResourceGraph,
    config: ProgramConfig,
    functions: RefCell<HashMap<String, LambdaFunction>>,
    services: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
    hooks: RefCell<Vec<Rc<dyn ExitHook>>>,
}

impl<'g> Program<'g> {
    pub fn new(graph: &'g dyn ResourceGraph, config: ProgramConfig) -> Self {
        Self {
            graph,
            config,
            functions: RefCell::new(HashMap::new()),
            services: RefCell::new(HashMap::new()),
            hooks: RefCell::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &ProgramConfig {
        &self.config
    }

    pub fn region(&self) -> &str {
        &self.config.region
    }

    pub fn declare(&self, spec: ResourceSpec) -> Result<Resource> {
        self.graph.declare(spec)
    }

    pub(crate) fn cached_function(&self, name: &str) -> Option<LambdaFunction> {
        self.functions.borrow().get(name).cloned()
    }

    pub(crate) fn cache_function(&self, name: &str, function: LambdaFunction) {
        self.functions
            .borrow_mut()
            .insert(name.to_string(), function);
    }

    /// The program-wide instance of a deferred service, created on first use
    ///
    /// The instance is registered as an exit hook when it is created.
    pub fn service<T>(&self) -> Rc<T>
    where
        T: ExitHook + Default + 'static,
    {
        let id = TypeId::of::<T>();
        let existing = self.services.borrow().get(&id).cloned();
        if let Some(service) = existing.and_then(|s| s.downcast::<T>().ok()) {
            return service;
        }

        let service = Rc::new(T::default());
        self.services
            .borrow_mut()
            .insert(id, service.clone() as Rc<dyn Any>);
        self.on_before_exit(service.clone());
        service
    }

    /// Register a hook to run when the program finishes
    pub fn on_before_exit(&self, hook: Rc<dyn ExitHook>) {
        self.hooks.borrow_mut().push(hook);
    }

    /// Run exit hooks until a pass declares nothing new
    ///
    /// Calling this more than once is harmless.
    pub fn finish(&self) -> Result<()> {
        let mut pass = 0;
        loop {
            pass += 1;
            let hooks: Vec<Rc<dyn ExitHook>> = self.hooks.borrow().clone();
            let mut declared = false;
            for hook in hooks {
                declared |= hook.before_exit(self)?;
            }

            debug!(pass, declared, "ran exit hooks");
            if !declared {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryGraph;
    use std::cell::Cell;

    #[derive(Default)]
    struct CountingHook {
        remaining: Cell<u32>,
        runs: Cell<u32>,
    }

    impl ExitHook for CountingHook {
        fn before_exit(&self, _program: &Program<'_>) -> Result<bool> {
            self.runs.set(self.runs.get() + 1);
            if self.remaining.get() > 0 {
                self.remaining.set(self.remaining.get() - 1);
                return Ok(true);
            }
            Ok(false)
        }
    }

    #[test]
    fn test_service_is_shared() {
        let graph = InMemoryGraph::new("us-east-1");
        let program = Program::new(&graph, ProgramConfig::new("us-east-1"));

        let a = program.service::<CountingHook>();
        let b = program.service::<CountingHook>();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(program.hooks.borrow().len(), 1);
    }

    #[test]
    fn test_finish_reruns_hooks_while_work_is_declared() {
        let graph = InMemoryGraph::new("us-east-1");
        let program = Program::new(&graph, ProgramConfig::new("us-east-1"));

        let hook = program.service::<CountingHook>();
        hook.remaining.set(2);

        program.finish().unwrap();
        assert_eq!(hook.runs.get(), 3);

        program.finish().unwrap();
        assert_eq!(hook.runs.get(), 4);
    }
}
