//! Per-object tracer bindings.
//!
//! A [`Pin`] binds a [`Tracer`] together with optional service and tag
//! overrides to one particular object instance, so two instances of the
//! same client type can report to different tracers within one process.
//! The association lives in a process-wide side table keyed by the
//! target's address and never owns the target. Dropping a pinned target
//! leaves its entry behind, and a later allocation reusing that address
//! would find it; callers that drop pinned objects should `clear_from`
//! them first.

use crate::trace::{Span, Tracer};
use once_cell::sync::Lazy;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Mutex;

static PINS: Lazy<Mutex<HashMap<usize, Pin>>> = Lazy::new(|| Mutex::new(HashMap::new()));

// Address-based identity: stable for the target's lifetime, but reusable
// by a later allocation once the target is dropped.
fn identity_key<T: ?Sized>(target: &T) -> usize {
    target as *const T as *const () as usize
}

/// A binding of a tracer and span overrides to one object instance.
#[derive(Clone, Debug)]
pub struct Pin {
    tracer: Tracer,
    service: Option<Cow<'static, str>>,
    tags: HashMap<String, String>,
}

impl Pin {
    /// Create a pin that starts spans through `tracer`.
    pub fn new(tracer: Tracer) -> Self {
        Pin {
            tracer,
            service: None,
            tags: HashMap::new(),
        }
    }

    /// Report spans started through this pin under `service` instead of
    /// the tracer's own service name.
    pub fn with_service(mut self, service: impl Into<Cow<'static, str>>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Attach `key=value` to every span started through this pin.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// The tracer this pin routes spans to.
    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// The service override, if any.
    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    /// Install or replace the pin bound to `target`. The last override
    /// wins; any previously installed pin is discarded.
    pub fn override_on<T: ?Sized>(target: &T, pin: Pin) {
        let mut pins = PINS.lock().unwrap_or_else(|e| e.into_inner());
        pins.insert(identity_key(target), pin);
    }

    /// Look up the pin bound to `target`, if one is installed.
    pub fn get_from<T: ?Sized>(target: &T) -> Option<Pin> {
        let pins = PINS.lock().unwrap_or_else(|e| e.into_inner());
        pins.get(&identity_key(target)).cloned()
    }

    /// Remove the pin bound to `target`, returning it if one was installed.
    pub fn clear_from<T: ?Sized>(target: &T) -> Option<Pin> {
        let mut pins = PINS.lock().unwrap_or_else(|e| e.into_inner());
        pins.remove(&identity_key(target))
    }

    /// Start a span through the pinned tracer with this pin's service and
    /// tags applied.
    pub fn span(&self, name: impl Into<Cow<'static, str>>) -> Span {
        let mut builder = self.tracer.span_builder(name);
        if let Some(service) = &self.service {
            builder = builder.with_service(service.clone());
        }
        for (key, value) in &self.tags {
            builder = builder.with_tag(key.clone(), value.clone());
        }
        builder.start()
    }
}
