//! Template engine setup for Quarry

use crate::calls::{
    make_config_fn, make_env_var_fn, make_ref_fn, make_source_fn, make_var_fn, CallCapture, CallLog,
};
use crate::error::{JinjaError, JinjaResult};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::{Arc, Mutex};

/// Built-in context function names that user macros must not override
pub const PROTECTED_NAMES: &[&str] = &[
    "ref",
    "source",
    "config",
    "var",
    "env_var",
    "generate_schema_name",
    "generate_database_name",
    "generate_alias_name",
];

/// Templating engine for model, test, and hook expansion.
///
/// Every render goes through one shared capture channel, so the engine is
/// used for one file at a time: render(), inspect the returned [`CallLog`],
/// move on.
pub struct TemplateEngine<'a> {
    env: minijinja::Environment<'a>,
    capture: CallCapture,
    /// `{% macro %}` definitions prepended to every template body
    macro_prelude: String,
    /// Names of registered macros that collided with [`PROTECTED_NAMES`]
    shadowed: Vec<String>,
}

impl<'a> TemplateEngine<'a> {
    /// Create an engine over the resolved project variables.
    pub fn new(vars: &JsonMap<String, JsonValue>) -> Self {
        let mut env = minijinja::Environment::new();
        let capture: CallCapture = Arc::new(Mutex::new(CallLog::default()));

        env.add_function("ref", make_ref_fn(capture.clone()));
        env.add_function("source", make_source_fn(capture.clone()));
        env.add_function("config", make_config_fn(capture.clone()));
        env.add_function("var", make_var_fn(vars.clone()));
        env.add_function("env_var", make_env_var_fn());

        Self {
            env,
            capture,
            macro_prelude: String::new(),
            shadowed: Vec::new(),
        }
    }

    /// Register project macros by name and raw `{% macro %}` body.
    ///
    /// A macro whose name collides with a protected context function is
    /// recorded in [`shadowed_builtins`](Self::shadowed_builtins) and left
    /// out of the prelude so the builtin stays callable.
    pub fn register_macros<'m, I>(&mut self, macros: I)
    where
        I: IntoIterator<Item = (&'m str, &'m str)>,
    {
        for (name, macro_sql) in macros {
            if PROTECTED_NAMES.contains(&name) {
                log::warn!("macro '{}' shadows a built-in function, skipping", name);
                self.shadowed.push(name.to_string());
                continue;
            }
            self.macro_prelude.push_str(macro_sql);
            self.macro_prelude.push('\n');
        }
    }

    /// Macro names that collided with built-in context functions
    pub fn shadowed_builtins(&self) -> &[String] {
        &self.shadowed
    }

    /// Render one template body, returning the output and the calls it made.
    ///
    /// `path` is used only for error context.
    pub fn render(&self, template: &str, path: &str) -> JinjaResult<(String, CallLog)> {
        {
            let mut log = self
                .capture
                .lock()
                .map_err(|e| JinjaError::Internal(format!("capture mutex poisoned: {e}")))?;
            *log = CallLog::default();
        }

        let body = if self.macro_prelude.is_empty() {
            template.to_string()
        } else {
            format!("{}{}", self.macro_prelude, template)
        };

        let rendered = self
            .env
            .render_str(&body, ())
            .map_err(|e| JinjaError::render(path, &e))?;

        let log = self
            .capture
            .lock()
            .map_err(|e| JinjaError::Internal(format!("capture mutex poisoned: {e}")))?
            .clone();

        Ok((rendered, log))
    }
}

impl Default for TemplateEngine<'_> {
    fn default() -> Self {
        Self::new(&JsonMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_plain_sql() {
        let engine = TemplateEngine::default();
        let (out, log) = engine
            .render("select * from users", "models/users.sql")
            .unwrap();
        assert_eq!(out, "select * from users");
        assert!(log.is_empty());
    }

    #[test]
    fn test_render_captures_refs_and_config() {
        let engine = TemplateEngine::default();
        let template = "{{ config(materialized='table') }}select * from {{ ref('stg_orders') }}";
        let (out, log) = engine.render(template, "models/fct_orders.sql").unwrap();

        assert_eq!(out, "select * from stg_orders");
        assert_eq!(log.refs()[0].name, "stg_orders");
        assert_eq!(
            log.config_dict().get("materialized"),
            Some(&json!("table"))
        );
    }

    #[test]
    fn test_capture_resets_between_renders() {
        let engine = TemplateEngine::default();
        engine.render("{{ ref('a') }}", "a.sql").unwrap();
        let (_, log) = engine.render("{{ ref('b') }}", "b.sql").unwrap();
        assert_eq!(log.refs().len(), 1);
        assert_eq!(log.refs()[0].name, "b");
    }

    #[test]
    fn test_render_with_vars() {
        let mut vars = JsonMap::new();
        vars.insert("start_date".to_string(), json!("2024-01-01"));
        let engine = TemplateEngine::new(&vars);

        let (out, _) = engine
            .render("where created_at >= '{{ var(\"start_date\") }}'", "m.sql")
            .unwrap();
        assert_eq!(out, "where created_at >= '2024-01-01'");
    }

    #[test]
    fn test_macro_prelude_makes_macros_callable() {
        let mut engine = TemplateEngine::default();
        engine.register_macros([(
            "cents_to_dollars",
            "{% macro cents_to_dollars(col) %}({{ col }} / 100){% endmacro %}",
        )]);

        let (out, _) = engine
            .render("select {{ cents_to_dollars('amount') }} as amount", "m.sql")
            .unwrap();
        assert_eq!(out.trim(), "select (amount / 100) as amount");
    }

    #[test]
    fn test_macro_can_call_ref() {
        let mut engine = TemplateEngine::default();
        engine.register_macros([(
            "orders_rel",
            "{% macro orders_rel() %}{{ ref('stg_orders') }}{% endmacro %}",
        )]);

        let (_, log) = engine
            .render("select * from {{ orders_rel() }}", "m.sql")
            .unwrap();
        assert_eq!(log.refs()[0].name, "stg_orders");
    }

    #[test]
    fn test_shadowing_macro_is_skipped() {
        let mut engine = TemplateEngine::default();
        engine.register_macros([
            ("ref", "{% macro ref(x) %}nope{% endmacro %}"),
            ("helper", "{% macro helper() %}ok{% endmacro %}"),
        ]);

        assert_eq!(engine.shadowed_builtins(), &["ref".to_string()]);

        // Builtin ref() still works
        let (out, log) = engine.render("{{ ref('m') }}", "m.sql").unwrap();
        assert_eq!(out, "m");
        assert_eq!(log.refs().len(), 1);
    }

    #[test]
    fn test_render_error_includes_path() {
        let engine = TemplateEngine::default();
        let err = engine
            .render("{{ unclosed", "models/broken.sql")
            .unwrap_err();
        assert!(err.to_string().contains("models/broken.sql"));
    }
}
