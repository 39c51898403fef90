use super::{ScriptEngine, ScriptVariables};
use anyhow::{anyhow, Result};
use parking_lot::RwLock;
use rhai::{Dynamic, Engine, Scope, AST};
use std::collections::HashMap;
use std::sync::Arc;

/// Rhai engine for response transforms.
///
/// Scripts see `request` and `responseMessage` as strings. The value of the
/// last expression is the payload: strings are used as-is, other values are
/// rendered with their display form, unit is an error.
pub struct RhaiScriptEngine {
    engine: Engine,
    // Compiled scripts keyed by source text
    asts: RwLock<HashMap<String, Arc<AST>>>,
}

impl RhaiScriptEngine {
    pub fn new(max_operations: u64) -> Self {
        Self {
            engine: Self::create_engine(max_operations),
            asts: RwLock::new(HashMap::new()),
        }
    }

    fn create_engine(max_operations: u64) -> Engine {
        let mut engine = Engine::new();
        engine.set_max_operations(max_operations);
        engine
    }

    /// Compile a script without running it
    pub fn compile(&self, script: &str) -> Result<Arc<AST>> {
        if let Some(ast) = self.asts.read().get(script) {
            return Ok(Arc::clone(ast));
        }

        let ast = self
            .engine
            .compile(script)
            .map_err(|e| anyhow!("Failed to compile script: {e}"))?;
        let ast = Arc::new(ast);
        self.asts
            .write()
            .insert(script.to_string(), Arc::clone(&ast));
        Ok(ast)
    }

    pub fn cached_scripts(&self) -> usize {
        self.asts.read().len()
    }
}

impl ScriptEngine for RhaiScriptEngine {
    fn evaluate(&self, script: &str, variables: &ScriptVariables<'_>) -> Result<String> {
        let ast = self.compile(script)?;

        let mut scope = Scope::new();
        scope.push("request", variables.request.to_string());
        scope.push("responseMessage", variables.response_message.to_string());

        let result: Dynamic = self
            .engine
            .eval_ast_with_scope(&mut scope, ast.as_ref())
            .map_err(|e| anyhow!("Script execution error: {e}"))?;

        if result.is_unit() {
            return Err(anyhow!("Script returned no value"));
        }
        if result.is_string() {
            return result
                .into_string()
                .map_err(|t| anyhow!("Script result is not a string: {t}"));
        }
        Ok(result.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars<'a>(request: &'a str, message: &'a str) -> ScriptVariables<'a> {
        ScriptVariables {
            request,
            response_message: message,
        }
    }

    #[test]
    fn test_upper_case_message() {
        let engine = RhaiScriptEngine::new(0);
        let out = engine
            .evaluate("responseMessage.to_upper()", &vars("anything", "hello"))
            .unwrap();
        assert_eq!(out, "HELLO");
    }

    #[test]
    fn test_request_available() {
        let engine = RhaiScriptEngine::new(0);
        let script = r#"
            let id = request.sub_string(4);
            responseMessage + " " + id
        "#;
        let out = engine.evaluate(script, &vars("GET 42", "ITEM")).unwrap();
        assert_eq!(out, "ITEM 42");
    }

    #[test]
    fn test_non_string_result_is_displayed() {
        let engine = RhaiScriptEngine::new(0);
        let out = engine.evaluate("40 + 2", &vars("", "")).unwrap();
        assert_eq!(out, "42");
    }

    #[test]
    fn test_unit_result_is_error() {
        let engine = RhaiScriptEngine::new(0);
        let err = engine.evaluate("let x = 1;", &vars("", "")).unwrap_err();
        assert!(err.to_string().contains("no value"));
    }

    #[test]
    fn test_syntax_error() {
        let engine = RhaiScriptEngine::new(0);
        let err = engine
            .evaluate("this is not valid rhai {{{", &vars("", ""))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to compile script"));
    }

    #[test]
    fn test_operation_budget_stops_runaway_script() {
        let engine = RhaiScriptEngine::new(1_000);
        let err = engine
            .evaluate("loop { }", &vars("", ""))
            .unwrap_err();
        assert!(err.to_string().contains("Script execution error"));
    }

    #[test]
    fn test_compiled_scripts_are_reused() {
        let engine = RhaiScriptEngine::new(0);
        engine.evaluate("responseMessage", &vars("", "a")).unwrap();
        engine.evaluate("responseMessage", &vars("", "b")).unwrap();
        assert_eq!(engine.cached_scripts(), 1);
    }
}
