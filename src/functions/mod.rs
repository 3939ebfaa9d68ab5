//! The function contract and registry.
//!
//! Functions are looked up by name while a script is parsed, so an unknown
//! name is a validation error rather than a runtime surprise. Each call site
//! gets its own instance from the registered factory.

mod builtin;

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value as JsonValue;

use crate::context::ExecutionContext;
use crate::error::{FunctionError, RegistryError};

/// Arguments as resolved at call time: each argument yields zero or more
/// nodes (a path argument can match several).
pub type FunctionArgs = Vec<Vec<JsonValue>>;

/// A named computation usable in a value expression.
pub trait Function {
    fn name(&self) -> &str;

    /// Minimum and maximum argument count; `None` means unbounded.
    fn arity(&self) -> (usize, Option<usize>);

    fn execute(
        &self,
        args: FunctionArgs,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<Vec<JsonValue>, FunctionError>;
}

impl fmt::Debug for dyn Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name())
    }
}

pub type FunctionFactory = fn() -> Box<dyn Function>;

/// Maps function names (case-insensitive) to factories.
pub struct FunctionRegistry {
    functions: BTreeMap<String, FunctionFactory>,
}

impl FunctionRegistry {
    /// Creates a new, empty function registry.
    pub fn new() -> Self {
        Self {
            functions: BTreeMap::new(),
        }
    }

    /// Registers a factory under the name its functions report.
    pub fn register(&mut self, factory: FunctionFactory) -> Result<(), RegistryError> {
        let function = factory();
        let name = function.name().to_lowercase();

        if !crate::expression::parse_function_call(&format!("#{}", name)).is_function {
            return Err(RegistryError::InvalidName(name));
        }
        if let (min, Some(max)) = function.arity()
            && min > max
        {
            return Err(RegistryError::InvalidArity { name, min, max });
        }
        if self.functions.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }

        self.functions.insert(name, factory);
        Ok(())
    }

    /// Builds a fresh instance of the named function.
    pub fn create(&self, name: &str) -> Option<Box<dyn Function>> {
        self.functions.get(&name.to_lowercase()).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_lowercase())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl Default for FunctionRegistry {
    /// Creates a new registry populated with all built-in functions.
    fn default() -> Self {
        let mut registry = Self::new();
        for factory in builtin::FACTORIES {
            // Built-in names are fixed identifiers, registration can't clash.
            let _ = registry.register(*factory);
        }
        registry
    }
}

/// Checks an argument count against a function's declared arity.
pub fn check_arity(function: &dyn Function, actual: usize) -> Result<(), FunctionError> {
    let (min, max) = function.arity();
    if actual >= min && max.is_none_or(|max| actual <= max) {
        return Ok(());
    }
    let expected = match max {
        Some(max) if max == min => min.to_string(),
        Some(max) => format!("{}..{}", min, max),
        None => format!("at least {}", min),
    };
    Err(FunctionError::Arity {
        function: function.name().to_string(),
        expected,
        actual,
    })
}
