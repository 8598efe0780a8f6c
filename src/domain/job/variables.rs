// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::shared::error::{PaasError, Result};
use regex::{Captures, Regex};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

const PLACEHOLDER: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}";

/// Replaces every `${NAME}` found in string scalars of `tree`. Mapping keys
/// are left untouched.
pub fn substitute_variables(tree: Value, variables: &BTreeMap<String, String>) -> Result<Value> {
    let re = Regex::new(PLACEHOLDER)
        .map_err(|e| PaasError::config_error(format!("Invalid placeholder pattern: {}", e)))?;
    substitute(tree, &re, variables)
}

fn substitute(tree: Value, re: &Regex, variables: &BTreeMap<String, String>) -> Result<Value> {
    match tree {
        Value::String(text) => match whole_placeholder(&text, re) {
            Some(name) => variables
                .get(name)
                .map(|value| typed_scalar(value))
                .ok_or_else(|| PaasError::Variable(name.to_string())),
            None => substitute_in_str(&text, re, variables).map(Value::String),
        },
        Value::Sequence(items) => items
            .into_iter()
            .map(|item| substitute(item, re, variables))
            .collect::<Result<Vec<_>>>()
            .map(Value::Sequence),
        Value::Mapping(mapping) => {
            let mut substituted = Mapping::with_capacity(mapping.len());
            for (key, value) in mapping {
                substituted.insert(key, substitute(value, re, variables)?);
            }
            Ok(Value::Mapping(substituted))
        }
        Value::Tagged(mut tagged) => {
            tagged.value = substitute(tagged.value, re, variables)?;
            Ok(Value::Tagged(tagged))
        }
        scalar => Ok(scalar),
    }
}

/// The variable name when `text` is a single placeholder and nothing else.
fn whole_placeholder<'a>(text: &'a str, re: &Regex) -> Option<&'a str> {
    let caps = re.captures(text)?;
    let whole = caps.get(0)?;
    if whole.start() == 0 && whole.end() == text.len() {
        caps.get(1).map(|name| name.as_str())
    } else {
        None
    }
}

/// A value standing alone in a scalar takes the YAML type it reads as, so
/// `replicas: ${REPLICAS}` yields a number. Numbers that would not print
/// back identically (`1.10`, `007`) and everything else stay strings.
fn typed_scalar(value: &str) -> Value {
    match serde_yaml::from_str::<Value>(value) {
        Ok(Value::Bool(flag)) => Value::Bool(flag),
        Ok(Value::Number(number)) if number.to_string() == value => Value::Number(number),
        _ => Value::String(value.to_string()),
    }
}

fn substitute_in_str(
    text: &str,
    re: &Regex,
    variables: &BTreeMap<String, String>,
) -> Result<String> {
    if !text.contains("${") {
        return Ok(text.to_string());
    }

    let mut missing = None;
    let replaced = re.replace_all(text, |caps: &Captures<'_>| {
        let name = &caps[1];
        match variables.get(name) {
            Some(value) => value.clone(),
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(PaasError::Variable(name)),
        None => Ok(replaced.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert("HOST".to_string(), "demo.example.com".to_string());
        vars.insert("TAG".to_string(), "1.2".to_string());
        vars
    }

    #[test]
    fn test_substitutes_nested_strings() {
        let tree: Value = serde_yaml::from_str(
            "ingresses:\n  demo:\n    host: '${HOST}'\n    paths:\n      - path: '/v${TAG}/api'\n",
        )
        .unwrap();

        let out = substitute_variables(tree, &vars()).unwrap();
        assert_eq!(out["ingresses"]["demo"]["host"].as_str(), Some("demo.example.com"));
        assert_eq!(out["ingresses"]["demo"]["paths"][0]["path"].as_str(), Some("/v1.2/api"));
    }

    #[test]
    fn test_unknown_variable_fails() {
        let tree = Value::String("${NOPE}".to_string());
        match substitute_variables(tree, &vars()) {
            Err(PaasError::Variable(name)) => assert_eq!(name, "NOPE"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_single_placeholder_takes_scalar_type() {
        let mut vars = vars();
        vars.insert("REPLICAS".to_string(), "3".to_string());
        vars.insert("INTERNAL".to_string(), "false".to_string());
        vars.insert("NAME".to_string(), "web: front".to_string());
        vars.insert("VERSION".to_string(), "1.10".to_string());
        let tree: Value = serde_yaml::from_str(
            "replicas: ${REPLICAS}\ninternal: ${INTERNAL}\nhost: ${HOST}\nname: ${NAME}\nlabel: r${REPLICAS}\nversion: ${VERSION}\n",
        )
        .unwrap();

        let out = substitute_variables(tree, &vars).unwrap();
        assert_eq!(out["replicas"].as_u64(), Some(3));
        assert_eq!(out["internal"].as_bool(), Some(false));
        assert_eq!(out["host"].as_str(), Some("demo.example.com"));
        assert_eq!(out["name"].as_str(), Some("web: front"));
        assert_eq!(out["label"].as_str(), Some("r3"));
        assert_eq!(out["version"].as_str(), Some("1.10"));
    }

    #[test]
    fn test_non_strings_are_preserved() {
        let tree: Value = serde_yaml::from_str("replicas: 3\ninternal: true\n").unwrap();
        let out = substitute_variables(tree.clone(), &vars()).unwrap();
        assert_eq!(out, tree);
    }
}
