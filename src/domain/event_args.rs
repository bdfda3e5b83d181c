//! Arguments delivered to event handlers.

use serde::Serialize;
use serde_json::{Map, Value};

/// Positional and named arguments passed through an emission unchanged.
///
/// Values are JSON so that any serializable payload can travel through the
/// bus without the bus knowing its type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventArgs {
    /// Positional arguments, in call order.
    pub args: Vec<Value>,
    /// Named arguments.
    pub kwargs: Map<String, Value>,
}

impl EventArgs {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Adds a named argument, replacing any previous value under `key`.
    #[must_use]
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    /// Returns the first positional argument, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Value> {
        self.args.first()
    }

    /// Returns the positional argument at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Returns the named argument `key`.
    #[must_use]
    pub fn named(&self, key: &str) -> Option<&Value> {
        self.kwargs.get(key)
    }
}

impl<T: Into<Value>> From<Vec<T>> for EventArgs {
    fn from(values: Vec<T>) -> Self {
        Self {
            args: values.into_iter().map(Into::into).collect(),
            kwargs: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_collects_positional_and_named() {
        let args = EventArgs::new().arg("x").arg(2).kwarg("flag", true);
        assert_eq!(args.first(), Some(&json!("x")));
        assert_eq!(args.get(1), Some(&json!(2)));
        assert_eq!(args.get(2), None);
        assert_eq!(args.named("flag"), Some(&json!(true)));
    }

    #[test]
    fn from_vec_builds_positional_only() {
        let args = EventArgs::from(vec!["a", "b"]);
        assert_eq!(args.args.len(), 2);
        assert!(args.kwargs.is_empty());
    }
}
