//! Ordered sequences of steps with around-middleware.
//!
//! A pipeline runs its children like a sequence, short-circuiting on the
//! first halt. `around` hooks wrap the invocation of every step added
//! after them; when several hooks apply, the later-registered one wraps
//! the earlier one, so hooks compose innermost-first.

use crate::ast::{AstNode, AstTag};
use crate::outcome::Outcome;
use crate::step::{Step, Type};
use std::fmt;
use std::sync::Arc;

/// An around hook: receives the wrapped step and the incoming outcome,
/// and decides when (or whether) to invoke the step.
pub type AroundFn = Arc<dyn Fn(&Type, Outcome) -> Outcome + Send + Sync>;

/// Consuming builder for a pipeline. Publish with [`Pipeline::into_type`]
/// (or any `Into<Type>` site); published pipelines are as immutable as
/// every other type.
#[derive(Clone, Default)]
pub struct Pipeline {
    steps: Vec<Type>,
    arounds: Vec<AroundFn>,
}

impl Pipeline {
    pub fn new() -> Pipeline {
        Pipeline::default()
    }

    /// Append a step, wrapped by every hook registered so far.
    pub fn step(mut self, step: impl Into<Type>) -> Pipeline {
        let mut typ = step.into();
        for hook in &self.arounds {
            typ = Type::new(AroundStep {
                inner: typ,
                hook: hook.clone(),
            });
        }
        self.steps.push(typ);
        self
    }

    /// Register a hook around every subsequent step invocation.
    pub fn around(
        mut self,
        hook: impl Fn(&Type, Outcome) -> Outcome + Send + Sync + 'static,
    ) -> Pipeline {
        self.arounds.push(Arc::new(hook));
        self
    }

    pub fn into_type(self) -> Type {
        Type::new(self)
    }
}

impl Step for Pipeline {
    fn apply(&self, input: Outcome) -> Outcome {
        let mut out = input;
        for step in &self.steps {
            if out.is_halt() {
                return out;
            }
            out = step.apply(out);
        }
        out
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::Pipeline).with_children(self.steps.iter().map(Type::ast).collect())
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pipeline({} steps)", self.steps.len())
    }
}

impl From<Pipeline> for Type {
    fn from(pipeline: Pipeline) -> Type {
        pipeline.into_type()
    }
}

/// One hook layered over one step.
struct AroundStep {
    inner: Type,
    hook: AroundFn,
}

impl Step for AroundStep {
    fn apply(&self, input: Outcome) -> Outcome {
        (self.hook)(&self.inner, input)
    }

    fn ast(&self) -> AstNode {
        self.inner.ast()
    }
}

impl fmt::Debug for AroundStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Around({:?})", self.inner)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
