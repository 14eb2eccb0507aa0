use crate::escalation::ExceptionPolicy;
use crate::middleware::ValidationGate;
use crate::params::Parameters;
use crate::response::Response;
use std::fmt;
use std::sync::Arc;

use super::ping::ping;

/// Suffix of the sibling name an action's exception handler is stored under.
pub const EXCEPTION_HANDLER_SUFFIX: &str = "_exceptionhandler";

/// Built-in liveness action present on every controller.
pub const PING_ACTION: &str = "ping";

/// Normalize a controller or action name for lookup.
#[must_use]
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A routable group of actions.
///
/// A fresh instance is built for every request from that request's
/// parameters; instances are never shared between requests.
pub trait Controller: Send + 'static {
    fn from_parameters(parameters: Parameters) -> Self
    where
        Self: Sized;

    fn parameters(&self) -> &Parameters;
}

/// Failure raised by an action, carried through escalation and into the
/// exception handler.
#[derive(Debug)]
pub struct ActionError {
    inner: anyhow::Error,
}

impl ActionError {
    pub fn new(inner: anyhow::Error) -> Self {
        Self { inner }
    }

    /// Build from a caught panic payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::new(anyhow::anyhow!("action panicked: {message}"))
    }

    /// Message of the outermost failure.
    #[must_use]
    pub fn message(&self) -> String {
        self.inner.to_string()
    }

    /// Message of the innermost failure in the cause chain.
    #[must_use]
    pub fn root_message(&self) -> String {
        self.inner.root_cause().to_string()
    }

    /// Full diagnostic: every link of the chain plus a backtrace when one was captured.
    #[must_use]
    pub fn trace(&self) -> String {
        format!("{:?}", self.inner)
    }

    pub fn error(&self) -> &anyhow::Error {
        &self.inner
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<anyhow::Error> for ActionError {
    fn from(inner: anyhow::Error) -> Self {
        Self::new(inner)
    }
}

/// Action body.
pub type ActionFn<C> = dyn Fn(&mut C) -> anyhow::Result<Response> + Send + Sync;
/// Action-specific exception handler.
pub type ExceptionHandlerFn<C> = dyn Fn(&mut C, &ActionError) -> Response + Send + Sync;

/// Declarations attached to an action at registration time.
#[derive(Clone)]
pub struct ActionMeta {
    /// Normalized action name
    pub name: Arc<str>,
    /// Validation gates, in declaration order
    pub gates: Vec<Arc<dyn ValidationGate>>,
    /// Exception policies, in declaration order
    pub policies: Vec<ExceptionPolicy>,
}

impl Default for ActionMeta {
    fn default() -> Self {
        Self {
            name: Arc::from(""),
            gates: Vec::new(),
            policies: Vec::new(),
        }
    }
}

impl fmt::Debug for ActionMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionMeta")
            .field("name", &self.name)
            .field("gates", &self.gates.len())
            .field("policies", &self.policies)
            .finish()
    }
}

pub struct ActionDescriptor<C> {
    pub meta: ActionMeta,
    handler: Arc<ActionFn<C>>,
}

impl<C> Clone for ActionDescriptor<C> {
    fn clone(&self) -> Self {
        Self {
            meta: self.meta.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

/// Registration table for one controller type.
///
/// ```rust
/// use actionserver::controller::{Controller, ControllerDefinition};
/// use actionserver::middleware::RequiredParameters;
/// use actionserver::params::Parameters;
/// use actionserver::response::Response;
///
/// struct Greeter { params: Parameters }
///
/// impl Controller for Greeter {
///     fn from_parameters(params: Parameters) -> Self { Self { params } }
///     fn parameters(&self) -> &Parameters { &self.params }
/// }
///
/// let definition = ControllerDefinition::<Greeter>::new("Greeter")
///     .action("hello", |c: &mut Greeter| {
///         let name = c.parameters().get("name").unwrap_or("world").to_string();
///         Ok(Response::ok("Hello", format!("hello {name}")))
///     })
///     .require(RequiredParameters::parse("name"))
///     .finish();
/// assert_eq!(definition.action_names(), vec!["ping", "hello"]);
/// ```
pub struct ControllerDefinition<C: Controller> {
    name: String,
    actions: Vec<ActionDescriptor<C>>,
    exception_handlers: Vec<(String, Arc<ExceptionHandlerFn<C>>)>,
}

impl<C: Controller> ControllerDefinition<C> {
    /// Start a definition. The built-in `ping` action is always present.
    pub fn new(name: impl Into<String>) -> Self {
        let ping_action = ActionDescriptor {
            meta: ActionMeta {
                name: Arc::from(PING_ACTION),
                ..ActionMeta::default()
            },
            handler: Arc::new(|c: &mut C| Ok::<_, anyhow::Error>(ping(c.parameters())))
                as Arc<ActionFn<C>>,
        };
        Self {
            name: name.into(),
            actions: vec![ping_action],
            exception_handlers: Vec::new(),
        }
    }

    /// Declare an action and continue configuring it.
    pub fn action<F>(mut self, name: &str, handler: F) -> ActionBuilder<C>
    where
        F: Fn(&mut C) -> anyhow::Result<Response> + Send + Sync + 'static,
    {
        self.actions.push(ActionDescriptor {
            meta: ActionMeta {
                name: Arc::from(normalize(name)),
                ..ActionMeta::default()
            },
            handler: Arc::new(handler),
        });
        ActionBuilder { definition: self }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized action names in declaration order, `ping` first.
    pub fn action_names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.meta.name.as_ref()).collect()
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        String,
        Vec<ActionDescriptor<C>>,
        Vec<(String, Arc<ExceptionHandlerFn<C>>)>,
    ) {
        (self.name, self.actions, self.exception_handlers)
    }
}

/// Configures the most recently declared action.
pub struct ActionBuilder<C: Controller> {
    definition: ControllerDefinition<C>,
}

impl<C: Controller> ActionBuilder<C> {
    fn current(&mut self) -> &mut ActionDescriptor<C> {
        // `action()` pushed before handing out the builder, so the table is never empty.
        let last = self.definition.actions.len() - 1;
        &mut self.definition.actions[last]
    }

    /// Append a validation gate.
    pub fn require<G: ValidationGate + 'static>(mut self, gate: G) -> Self {
        self.current().meta.gates.push(Arc::new(gate));
        self
    }

    /// Append an exception policy.
    pub fn on_error(mut self, policy: ExceptionPolicy) -> Self {
        self.current().meta.policies.push(policy);
        self
    }

    /// Register the handler invoked when this action fails.
    ///
    /// An action takes at most one handler; a second one fails registration.
    pub fn exception_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut C, &ActionError) -> Response + Send + Sync + 'static,
    {
        let key = format!("{}{EXCEPTION_HANDLER_SUFFIX}", self.current().meta.name);
        self.definition
            .exception_handlers
            .push((key, Arc::new(handler)));
        self
    }

    /// Finish this action and declare the next one.
    pub fn action<F>(self, name: &str, handler: F) -> ActionBuilder<C>
    where
        F: Fn(&mut C) -> anyhow::Result<Response> + Send + Sync + 'static,
    {
        self.definition.action(name, handler)
    }

    pub fn finish(self) -> ControllerDefinition<C> {
        self.definition
    }
}

/// A controller instance paired with one of its resolved actions.
///
/// This is what the invocation pipeline operates on; the concrete controller
/// type is erased behind it.
pub trait BoundAction: Send {
    /// Registered controller name
    fn controller(&self) -> &str;
    fn meta(&self) -> &ActionMeta;
    fn parameters(&self) -> &Parameters;
    fn invoke(&mut self) -> anyhow::Result<Response>;
    /// Run the `{action}_exceptionhandler` sibling, if one was registered.
    fn handle_exception(&mut self, error: &ActionError) -> Option<Response>;
}

pub(crate) struct Bound<C: Controller> {
    pub(crate) controller_name: Arc<str>,
    pub(crate) instance: C,
    pub(crate) action: ActionDescriptor<C>,
    pub(crate) exception_handler: Option<Arc<ExceptionHandlerFn<C>>>,
}

impl<C: Controller> BoundAction for Bound<C> {
    fn controller(&self) -> &str {
        &self.controller_name
    }

    fn meta(&self) -> &ActionMeta {
        &self.action.meta
    }

    fn parameters(&self) -> &Parameters {
        self.instance.parameters()
    }

    fn invoke(&mut self) -> anyhow::Result<Response> {
        (self.action.handler)(&mut self.instance)
    }

    fn handle_exception(&mut self, error: &ActionError) -> Option<Response> {
        let handler = self.exception_handler.as_ref()?;
        Some(handler(&mut self.instance, error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalation::{Behavior, ExceptionPolicy};
    use crate::middleware::RequiredParameters;

    struct Probe {
        params: Parameters,
    }

    impl Controller for Probe {
        fn from_parameters(params: Parameters) -> Self {
            Self { params }
        }
        fn parameters(&self) -> &Parameters {
            &self.params
        }
    }

    #[test]
    fn definition_always_carries_ping() {
        let def = ControllerDefinition::<Probe>::new("Probe");
        assert_eq!(def.action_names(), vec!["ping"]);
    }

    #[test]
    fn declarations_attach_to_the_latest_action() {
        let def = ControllerDefinition::<Probe>::new("Probe")
            .action("First", |_| Ok(Response::ok("1", "one")))
            .require(RequiredParameters::parse("a"))
            .action("Second", |_| Ok(Response::ok("2", "two")))
            .require(RequiredParameters::parse("b"))
            .require(RequiredParameters::parse("c"))
            .on_error(ExceptionPolicy::log(Behavior::BlockClients))
            .exception_handler(|_, e| Response::internal_error(e.root_message()))
            .finish();

        let (_, actions, handlers) = def.into_parts();
        assert_eq!(actions[1].meta.name.as_ref(), "first");
        assert_eq!(actions[1].meta.gates.len(), 1);
        assert!(actions[1].meta.policies.is_empty());
        assert_eq!(actions[2].meta.gates.len(), 2);
        assert_eq!(actions[2].meta.policies.len(), 1);
        assert_eq!(handlers.len(), 1);
        assert_eq!(handlers[0].0, "second_exceptionhandler");
    }

    #[test]
    fn root_message_follows_the_cause_chain() {
        let err = ActionError::new(
            anyhow::anyhow!("disk unplugged")
                .context("write failed")
                .context("save failed"),
        );
        assert_eq!(err.message(), "save failed");
        assert_eq!(err.root_message(), "disk unplugged");
        assert!(err.trace().contains("write failed"));
    }

    #[test]
    fn panic_payloads_become_messages() {
        let err = ActionError::from_panic(Box::new("boom"));
        assert_eq!(err.root_message(), "action panicked: boom");
        let err = ActionError::from_panic(Box::new(String::from("bang")));
        assert_eq!(err.root_message(), "action panicked: bang");
    }
}
