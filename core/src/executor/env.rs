//! Lexical environment: a stack of scopes mapping names to bindings

use std::collections::HashMap;

use super::container::TrackedContainer;
use super::errors::ErrorKind;

/// What a name is bound to
///
/// Scalars are held by value and never traced; arrays are always tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Scalar(i64),
    Container(TrackedContainer),
}

#[derive(Debug)]
pub struct Env {
    scopes: Vec<HashMap<String, Binding>>,
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl Env {
    /// Environment with a single, outermost scope
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// The outermost scope is never popped
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Bind `name` in the innermost scope
    pub fn declare(&mut self, name: &str, binding: Binding) -> Result<(), ErrorKind> {
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| ErrorKind::Unsupported("no active scope".to_string()))?;
        if scope.contains_key(name) {
            return Err(ErrorKind::Redeclared {
                name: name.to_string(),
            });
        }
        scope.insert(name.to_string(), binding);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&Binding, ErrorKind> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .ok_or_else(|| undefined(name))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Result<&mut Binding, ErrorKind> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
            .ok_or_else(|| undefined(name))
    }
}

fn undefined(name: &str) -> ErrorKind {
    ErrorKind::Undefined {
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inner_scope_shadows_and_pops() {
        let mut env = Env::new();
        env.declare("x", Binding::Scalar(1)).expect("declare failed");

        env.push_scope();
        env.declare("x", Binding::Scalar(2)).expect("shadow failed");
        assert_eq!(env.lookup("x"), Ok(&Binding::Scalar(2)));

        env.pop_scope();
        assert_eq!(env.lookup("x"), Ok(&Binding::Scalar(1)));
    }

    #[test]
    fn test_redeclare_in_same_scope_fails() {
        let mut env = Env::new();
        env.declare("x", Binding::Scalar(1)).expect("declare failed");
        let err = env.declare("x", Binding::Scalar(2)).unwrap_err();
        assert_eq!(
            err,
            ErrorKind::Redeclared {
                name: "x".to_string()
            }
        );
    }

    #[test]
    fn test_lookup_undefined() {
        let mut env = Env::new();
        assert!(matches!(
            env.lookup("nope"),
            Err(ErrorKind::Undefined { .. })
        ));
        assert!(env.lookup_mut("nope").is_err());
    }

    #[test]
    fn test_outermost_scope_survives_pop() {
        let mut env = Env::new();
        env.declare("x", Binding::Scalar(1)).expect("declare failed");
        env.pop_scope();
        assert_eq!(env.depth(), 1);
        assert!(env.lookup("x").is_ok());
    }
}
