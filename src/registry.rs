//! Controller registry.
//!
//! Built once at startup through [`RegistryBuilder`] and frozen into a
//! [`ControllerRegistry`] that is shared read-only between request tasks.
//! Controllers are keyed by `{name}controller` in lowercase, so a request for
//! `/example/echo` resolves a controller registered as `Example` (or as
//! `ExampleController`).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::controller::{
    normalize, ActionDescriptor, Bound, BoundAction, Controller, ControllerDefinition,
    ExceptionHandlerFn, EXCEPTION_HANDLER_SUFFIX,
};
use crate::params::Parameters;

const CONTROLLER_SUFFIX: &str = "controller";

/// Error raised while building the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two controllers normalize to the same key
    DuplicateController(String),
    /// A controller declares two actions with the same normalized name
    DuplicateAction { controller: String, action: String },
    /// An action is given more than one exception handler
    DuplicateExceptionHandler { controller: String, action: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateController(name) => {
                write!(f, "controller '{name}' is already registered")
            }
            RegistryError::DuplicateAction { controller, action } => {
                write!(f, "controller '{controller}' declares action '{action}' more than once")
            }
            RegistryError::DuplicateExceptionHandler { controller, action } => write!(
                f,
                "controller '{controller}' declares more than one exception handler for '{action}'"
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

/// A path segment that did not resolve to a registered controller or action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    ControllerNotFound,
    ActionNotFound,
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::ControllerNotFound => write!(f, "Controller does not exist."),
            RouteError::ActionNotFound => write!(f, "Action does not exist."),
        }
    }
}

impl std::error::Error for RouteError {}

/// Registry key for a controller name given at registration.
fn registration_key(name: &str) -> String {
    let name = normalize(name);
    if name.ends_with(CONTROLLER_SUFFIX) {
        name
    } else {
        format!("{name}{CONTROLLER_SUFFIX}")
    }
}

/// Registry key for the controller segment of a request path.
#[must_use]
pub fn lookup_key(segment: &str) -> String {
    format!("{segment}{CONTROLLER_SUFFIX}").to_lowercase()
}

/// Type-erased constructor for one registered controller type.
pub trait ControllerFactory: Send + Sync {
    /// Name the controller was registered under
    fn name(&self) -> &str;
    fn has_action(&self, action: &str) -> bool;
    /// Build a fresh controller instance and pair it with `action`.
    fn bind(&self, action: &str, parameters: Parameters) -> Option<Box<dyn BoundAction>>;
}

struct Factory<C: Controller> {
    name: Arc<str>,
    actions: HashMap<String, ActionDescriptor<C>>,
    exception_handlers: HashMap<String, Arc<ExceptionHandlerFn<C>>>,
}

impl<C: Controller> ControllerFactory for Factory<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_action(&self, action: &str) -> bool {
        self.actions.contains_key(&normalize(action))
    }

    fn bind(&self, action: &str, parameters: Parameters) -> Option<Box<dyn BoundAction>> {
        let action = normalize(action);
        let descriptor = self.actions.get(&action)?.clone();
        let exception_handler = self
            .exception_handlers
            .get(&format!("{action}{EXCEPTION_HANDLER_SUFFIX}"))
            .map(Arc::clone);
        Some(Box::new(Bound {
            controller_name: Arc::clone(&self.name),
            instance: C::from_parameters(parameters),
            action: descriptor,
            exception_handler,
        }))
    }
}

/// Collects controller definitions before the server starts.
#[derive(Default)]
pub struct RegistryBuilder {
    controllers: HashMap<String, Arc<dyn ControllerFactory>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a controller type.
    ///
    /// Fails if another controller already uses the same key or if the
    /// definition declares an action name twice (the built-in `ping` counts).
    pub fn register<C: Controller>(
        &mut self,
        definition: ControllerDefinition<C>,
    ) -> Result<&mut Self, RegistryError> {
        let (name, descriptors, handlers) = definition.into_parts();
        let key = registration_key(&name);
        if self.controllers.contains_key(&key) {
            return Err(RegistryError::DuplicateController(name));
        }

        let mut actions = HashMap::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let action = descriptor.meta.name.to_string();
            if actions.contains_key(&action) {
                return Err(RegistryError::DuplicateAction {
                    controller: name,
                    action,
                });
            }
            actions.insert(action, descriptor);
        }

        let mut exception_handlers = HashMap::with_capacity(handlers.len());
        for (handler_key, handler) in handlers {
            if exception_handlers.contains_key(&handler_key) {
                let action = handler_key
                    .strip_suffix(EXCEPTION_HANDLER_SUFFIX)
                    .unwrap_or(&handler_key)
                    .to_string();
                return Err(RegistryError::DuplicateExceptionHandler {
                    controller: name,
                    action,
                });
            }
            exception_handlers.insert(handler_key, handler);
        }

        debug!(controller = %name, key = %key, actions = actions.len(), "controller registered");
        self.controllers.insert(
            key,
            Arc::new(Factory::<C> {
                name: Arc::from(name),
                actions,
                exception_handlers,
            }),
        );
        Ok(self)
    }

    /// Freeze the registry.
    pub fn build(self) -> Arc<ControllerRegistry> {
        Arc::new(ControllerRegistry {
            controllers: self.controllers,
        })
    }
}

/// Immutable mapping from controller key to controller factory.
pub struct ControllerRegistry {
    controllers: HashMap<String, Arc<dyn ControllerFactory>>,
}

impl ControllerRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Find the controller addressed by a request path segment.
    pub fn resolve(&self, segment: &str) -> Result<&dyn ControllerFactory, RouteError> {
        self.controllers
            .get(&lookup_key(segment))
            .map(|f| f.as_ref())
            .ok_or(RouteError::ControllerNotFound)
    }

    /// Resolve both segments and build the per-request controller instance.
    pub fn bind(
        &self,
        controller: &str,
        action: &str,
        parameters: Parameters,
    ) -> Result<Box<dyn BoundAction>, RouteError> {
        self.resolve(controller)?
            .bind(action, parameters)
            .ok_or(RouteError::ActionNotFound)
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Registered controller names, sorted.
    pub fn controller_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.controllers.values().map(|f| f.name()).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("controllers", &self.controller_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Response;

    struct Example {
        params: Parameters,
    }

    impl Controller for Example {
        fn from_parameters(params: Parameters) -> Self {
            Self { params }
        }
        fn parameters(&self) -> &Parameters {
            &self.params
        }
    }

    #[test]
    fn registration_key_appends_suffix_once() {
        assert_eq!(registration_key("Example"), "examplecontroller");
        assert_eq!(registration_key("ExampleController"), "examplecontroller");
        assert_eq!(lookup_key("EXAMPLE"), "examplecontroller");
    }

    #[test]
    fn duplicate_controllers_are_rejected() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(ControllerDefinition::<Example>::new("Example"))
            .unwrap();
        let err = builder
            .register(ControllerDefinition::<Example>::new("ExampleController"))
            .err()
            .unwrap();
        assert_eq!(err, RegistryError::DuplicateController("ExampleController".into()));
    }

    #[test]
    fn duplicate_actions_are_rejected() {
        let def = ControllerDefinition::<Example>::new("Example")
            .action("Echo", |_| Ok(Response::ok("1", "1")))
            .action("echo", |_| Ok(Response::ok("2", "2")))
            .finish();
        let err = RegistryBuilder::new().register(def).err().unwrap();
        assert_eq!(
            err,
            RegistryError::DuplicateAction {
                controller: "Example".into(),
                action: "echo".into()
            }
        );

        let shadowed_ping = ControllerDefinition::<Example>::new("Example")
            .action("Ping", |_| Ok(Response::ok("p", "p")))
            .finish();
        assert!(RegistryBuilder::new().register(shadowed_ping).is_err());
    }

    #[test]
    fn bind_resolves_case_insensitively() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(
                ControllerDefinition::<Example>::new("Example")
                    .action("Echo", |c: &mut Example| {
                        Ok(Response::ok("Echo", c.parameters().get("name").unwrap_or("")))
                    })
                    .finish(),
            )
            .unwrap();
        let registry = builder.build();

        let mut bound = registry
            .bind("EXAMPLE", "ECHO", Parameters::from_query("name=Ann"))
            .unwrap();
        assert_eq!(bound.controller(), "Example");
        assert_eq!(bound.invoke().unwrap().message(), "Ann");

        assert_eq!(
            registry.bind("unknown", "ping", Parameters::new()).err(),
            Some(RouteError::ControllerNotFound)
        );
        assert_eq!(
            registry.bind("example", "missing", Parameters::new()).err(),
            Some(RouteError::ActionNotFound)
        );
    }
}
