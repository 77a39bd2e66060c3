//! jq pre-filter for CLI input documents.
use jaq_core::{compile::Undefined, load, Compiler, Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JqError {
    #[error("jq filter does not parse: {}", .0.join("; "))]
    Parse(Vec<String>),

    #[error("jq filter uses undefined names: {}", .0.join(", "))]
    Undefined(Vec<String>),

    #[error("jq output {index}: {message}")]
    Runtime { index: usize, message: String },

    #[error("jq output {index} is not a JSON document: {source}")]
    Output { index: usize, source: serde_json::Error },
}

type LoadErrors<'s> = Vec<(load::File<&'s str, ()>, load::Error<&'s str>)>;
type CompileErrors<'s> = Vec<(load::File<&'s str, ()>, Vec<(&'s str, Undefined)>)>;

impl JqError {
    fn from_load(errs: LoadErrors<'_>) -> Self {
        Self::Parse(errs.into_iter().map(|(_, err)| format!("{err:?}")).collect())
    }

    fn from_compile(errs: CompileErrors<'_>) -> Self {
        let names = errs
            .into_iter()
            .flat_map(|(_, undefined)| undefined)
            .map(|(name, kind)| format!("{name} ({kind:?})"))
            .collect();
        Self::Undefined(names)
    }
}

/// Run `filter_src` over one document; each jq output is one document.
pub fn run_jaq(filter_src: &str, input: &Value) -> Result<Vec<Value>, JqError> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let modules = loader
        .load(&arena, load::File { code: filter_src, path: () })
        .map_err(JqError::from_load)?;
    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(JqError::from_compile)?;

    let no_inputs = RcIter::new(core::iter::empty());
    filter
        .run((Ctx::new([], &no_inputs), Val::from(input.clone())))
        .enumerate()
        .map(|(index, item)| {
            let val = item.map_err(|e| JqError::Runtime { index, message: format!("{e:?}") })?;
            // Val displays as JSON text
            serde_json::from_str(&val.to_string()).map_err(|source| JqError::Output { index, source })
        })
        .collect()
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn selects_and_fans_out() {
        let doc = json!({"items": [{"kind": "Pod"}, {"kind": "Service"}]});
        let out = run_jaq(".items[]", &doc).unwrap();
        assert_eq!(out, vec![json!({"kind": "Pod"}), json!({"kind": "Service"})]);
    }

    #[test]
    fn parse_and_name_errors_are_reported() {
        assert!(matches!(run_jaq(".items[", &json!({})), Err(JqError::Parse(_))));
        assert!(matches!(run_jaq("no_such_function(1)", &json!({})), Err(JqError::Undefined(names)) if !names.is_empty()));
    }
}
