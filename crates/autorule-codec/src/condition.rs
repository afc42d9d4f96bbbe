//! IF/ELSE condition tree.
//!
//! ```text
//! container (jira.condition.container.block)
//! ├── children[0]: IF block   conditions: [comparator], children: then actions
//! └── children[1]: ELSE block conditions: [],           children: else actions
//! ```

use autorule_core::{Args, Error, Result};
use serde_json::{json, Value};

use crate::catalog::{
    COMPARATOR_TYPE, COMPONENT_CONDITION, COMPONENT_CONDITION_BLOCK, CONDITION_BLOCK_TYPE,
    CONDITION_CONTAINER_TYPE,
};

/// Comparison argument names, in the order the comparator stores them.
pub const COMPARISON_ARGS: [&str; 3] = ["first", "operator", "second"];

/// A condition container split into its comparison args and the raw
/// action nodes of each branch.
#[derive(Debug)]
pub struct ConditionParts<'a> {
    pub args: Args,
    pub then: &'a [Value],
    pub otherwise: &'a [Value],
}

pub fn is_condition(raw: &Value) -> bool {
    raw.get("type").and_then(Value::as_str) == Some(CONDITION_CONTAINER_TYPE)
}

fn node(
    component: &str,
    kind: &str,
    value: Value,
    conditions: Vec<Value>,
    children: Vec<Value>,
) -> Value {
    json!({
        "component": component,
        "schemaVersion": 1,
        "type": kind,
        "value": value,
        "conditions": conditions,
        "children": children,
        "connectionId": null,
    })
}

fn block(conditions: Vec<Value>, children: Vec<Value>) -> Value {
    node(
        COMPONENT_CONDITION_BLOCK,
        CONDITION_BLOCK_TYPE,
        json!({"conditionMatchType": "ALL"}),
        conditions,
        children,
    )
}

/// Build the container from alias-resolved comparison args and already
/// built branch actions. Both blocks are always present.
pub fn build_condition(args: &Args, then: Vec<Value>, otherwise: Vec<Value>) -> Result<Value> {
    let required = |name: &str| {
        args.get(name)
            .filter(|v| !v.is_empty())
            .cloned()
            .ok_or_else(|| Error::missing_argument("condition", name))
    };
    let first = required("first")?;
    let operator = required("operator")?;
    let second = args.get("second").cloned().unwrap_or_default();

    let comparator = node(
        COMPONENT_CONDITION,
        COMPARATOR_TYPE,
        json!({"first": first, "operator": operator, "second": second}),
        Vec::new(),
        Vec::new(),
    );

    Ok(node(
        COMPONENT_CONDITION,
        CONDITION_CONTAINER_TYPE,
        json!({}),
        Vec::new(),
        vec![block(vec![comparator], then), block(Vec::new(), otherwise)],
    ))
}

fn array<'a>(node: &'a Value, key: &str) -> &'a [Value] {
    node.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Split a container into args and branches. Comparison args come back
/// exactly as stored; an empty `second` is left out.
pub fn split_condition(raw: &Value) -> Result<ConditionParts<'_>> {
    let blocks = array(raw, "children");
    let if_block = blocks
        .first()
        .ok_or_else(|| Error::malformed("condition container has no IF block"))?;
    let comparator = array(if_block, "conditions")
        .first()
        .ok_or_else(|| Error::malformed("IF block has no condition"))?;

    let value = comparator.get("value").unwrap_or(&Value::Null);
    let mut args = Args::new();
    for name in COMPARISON_ARGS {
        let stored = value.get(name).and_then(Value::as_str).unwrap_or_default();
        if name == "second" && stored.is_empty() {
            continue;
        }
        args.insert(name.to_string(), stored.to_string());
    }

    Ok(ConditionParts {
        args,
        then: array(if_block, "children"),
        otherwise: blocks.get(1).map(|b| array(b, "children")).unwrap_or(&[]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> Args {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn log(message: &str) -> Value {
        json!({"type": "codebarrel.action.log", "value": message})
    }

    #[test]
    fn test_build_with_else() {
        let cond = args(&[
            ("first", "{{issue.status.name}}"),
            ("operator", "equals"),
            ("second", "Done"),
        ]);
        let built = build_condition(&cond, vec![log("t")], vec![log("e1"), log("e2")]).unwrap();

        assert_eq!(built["type"], "jira.condition.container.block");
        assert_eq!(built["component"], "CONDITION");
        assert_eq!(built["value"], json!({}));

        let blocks = built["children"].as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["type"], "jira.condition.if.block");
        assert_eq!(blocks[0]["component"], "CONDITION_BLOCK");
        assert_eq!(blocks[0]["value"], json!({"conditionMatchType": "ALL"}));
        assert_eq!(blocks[0]["conditions"][0]["type"], "jira.comparator.condition");
        assert_eq!(
            blocks[0]["conditions"][0]["value"],
            json!({"first": "{{issue.status.name}}", "operator": "equals", "second": "Done"})
        );
        assert_eq!(blocks[0]["children"].as_array().unwrap().len(), 1);
        assert_eq!(blocks[1]["conditions"], json!([]));
        assert_eq!(blocks[1]["children"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_build_without_else_keeps_empty_else_block() {
        let cond = args(&[("first", "{{issue.status.name}}"), ("operator", "equals")]);
        let built = build_condition(&cond, vec![log("t")], vec![]).unwrap();

        let blocks = built["children"].as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1]["type"], "jira.condition.if.block");
        assert_eq!(blocks[1]["children"], json!([]));
        assert_eq!(blocks[1]["conditions"], json!([]));
        assert_eq!(blocks[0]["conditions"][0]["value"]["second"], "");
    }

    #[test]
    fn test_every_node_has_fixed_fields() {
        let cond = args(&[("first", "a"), ("operator", "equals"), ("second", "b")]);
        let built = build_condition(&cond, vec![], vec![]).unwrap();
        let nodes = [
            &built,
            &built["children"][0],
            &built["children"][1],
            &built["children"][0]["conditions"][0],
        ];
        for n in nodes {
            assert_eq!(n["schemaVersion"], 1, "{}", n["type"]);
            assert!(n["children"].is_array(), "{}", n["type"]);
            assert!(n["conditions"].is_array(), "{}", n["type"]);
            assert!(n.get("connectionId").is_some_and(Value::is_null), "{}", n["type"]);
        }
        assert_eq!(built["conditions"], json!([]));
    }

    #[test]
    fn test_first_and_operator_required() {
        let err = build_condition(&args(&[("operator", "equals")]), vec![], vec![]).unwrap_err();
        assert!(matches!(err, Error::MissingArgument { .. }));
        assert_eq!(err.to_string(), "condition requires a non-empty 'first' arg");

        let err = build_condition(&args(&[("first", "a"), ("operator", "")]), vec![], vec![])
            .unwrap_err();
        assert_eq!(err.to_string(), "condition requires a non-empty 'operator' arg");
    }

    #[test]
    fn test_split_round_trip() {
        let cond = args(&[("first", "{{issue.priority.name}}"), ("operator", "equals"), ("second", "High")]);
        let built = build_condition(&cond, vec![log("t")], vec![log("e")]).unwrap();
        let parts = split_condition(&built).unwrap();

        assert_eq!(parts.args, cond);
        assert_eq!(parts.then, &[log("t")]);
        assert_eq!(parts.otherwise, &[log("e")]);
    }

    #[test]
    fn test_split_omits_empty_second() {
        let cond = args(&[("first", "{{issue.fixVersions}}"), ("operator", "is_not_empty")]);
        let built = build_condition(&cond, vec![], vec![]).unwrap();
        assert_eq!(split_condition(&built).unwrap().args, cond);
    }

    #[test]
    fn test_split_rejects_missing_blocks() {
        let err = split_condition(&json!({"type": CONDITION_CONTAINER_TYPE, "children": []}))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedPayload { .. }));

        let err = split_condition(&json!({
            "type": CONDITION_CONTAINER_TYPE,
            "children": [{"type": CONDITION_BLOCK_TYPE, "conditions": []}]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("IF block has no condition"));
    }
}
