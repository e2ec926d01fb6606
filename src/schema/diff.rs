//! Value comparison and plan computation
//!
//! Comparison is schema-aware: strings flagged `json` compare by parsed
//! value, sets ignore order, floats compare numerically.

use super::types::{Attribute, Block, ValueKind};
use serde::Serialize;
use serde_json::{Map, Value};

/// True if two strings hold the same JSON document
///
/// Falls back to plain string equality when either side does not parse.
pub fn json_equivalent(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (
        serde_json::from_str::<Value>(a),
        serde_json::from_str::<Value>(b),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Compare two values of an attribute
pub fn values_equal(attr: &Attribute, a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::String(a), Value::String(b)) if attr.json => json_equivalent(a, b),
        (Value::Number(a), Value::Number(b)) if attr.kind == ValueKind::Float => {
            a.as_f64() == b.as_f64()
        },
        (Value::Array(a), Value::Array(b)) => {
            if a.len() != b.len() {
                return false;
            }
            if attr.kind == ValueKind::Set {
                sets_equal(attr, a, b)
            } else {
                a.iter().zip(b).all(|(x, y)| elements_equal(attr, x, y))
            }
        },
        _ => a == b,
    }
}

/// Order-insensitive comparison; each element of `b` pairs with at most
/// one element of `a`
fn sets_equal(attr: &Attribute, a: &[Value], b: &[Value]) -> bool {
    let mut used = vec![false; b.len()];
    a.iter().all(|x| {
        let found = b
            .iter()
            .enumerate()
            .position(|(i, y)| !used[i] && elements_equal(attr, x, y));
        match found {
            Some(i) => {
                used[i] = true;
                true
            },
            None => false,
        }
    })
}

fn elements_equal(attr: &Attribute, a: &Value, b: &Value) -> bool {
    match (&attr.block, a, b) {
        (Some(block), Value::Object(a), Value::Object(b)) => objects_equal(block, a, b),
        _ => a == b,
    }
}

/// Compare two objects attribute by attribute
///
/// Absent and null are equal, absent values fall back to the attribute
/// default, and a computed attribute missing on one side matches anything.
pub fn objects_equal(block: &Block, a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    block.attributes.iter().all(|(name, attr)| {
        let resolve = |object: &Map<String, Value>| {
            object
                .get(name)
                .filter(|v| !v.is_null())
                .cloned()
                .or_else(|| attr.default.clone())
        };
        match (resolve(a), resolve(b)) {
            (Some(x), Some(y)) => values_equal(attr, &x, &y),
            (None, None) => true,
            _ => attr.computed,
        }
    })
}

/// One attribute whose value the plan changes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeChange {
    pub attribute: String,
    pub before: Value,
    pub after: Value,
}

/// Planned state for a resource
#[derive(Debug, Clone, Default, Serialize)]
pub struct Plan {
    pub planned_state: Map<String, Value>,
    pub changes: Vec<AttributeChange>,
    /// Attributes known only after apply
    pub unknown: Vec<String>,
    /// `force_new` attributes that changed; non-empty means destroy+create
    pub requires_replace: Vec<String>,
}

impl Plan {
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Compute the planned state from prior state and configuration
///
/// `prior` is `None` when the resource is being created.
pub fn plan(block: &Block, prior: Option<&Map<String, Value>>, config: &Map<String, Value>) -> Plan {
    let mut plan = Plan::default();

    for (name, attr) in &block.attributes {
        let configured = config.get(name).filter(|v| !v.is_null());
        let previous = prior
            .and_then(|p| p.get(name))
            .filter(|v| !v.is_null());

        let planned = match (configured, previous) {
            (Some(c), Some(p)) if attr.is_settable() && values_equal(attr, p, c) => Some(p.clone()),
            (Some(c), _) if attr.is_settable() => Some(c.clone()),
            (_, Some(p)) if attr.computed => Some(p.clone()),
            // On update a computed value the API left null stays absent
            (_, None) if attr.computed => {
                if prior.is_none() {
                    plan.unknown.push(name.clone());
                }
                None
            },
            _ => attr.default.clone(),
        };

        let before = previous.cloned().unwrap_or(Value::Null);
        let after = planned.clone().unwrap_or(Value::Null);

        if !values_equal(attr, &before, &after) {
            if attr.force_new && prior.is_some() {
                plan.requires_replace.push(name.clone());
            }
            plan.changes.push(AttributeChange {
                attribute: name.clone(),
                before,
                after,
            });
        }

        if let Some(value) = planned {
            plan.planned_state.insert(name.clone(), value);
        }
    }

    if !plan.requires_replace.is_empty() {
        // A replacement gets a fresh remote object, so every computed value
        // is unknown again
        for (name, attr) in &block.attributes {
            if attr.computed && !config.get(name).is_some_and(|v| !v.is_null()) {
                plan.planned_state.remove(name);
                if !plan.unknown.contains(name) {
                    plan.unknown.push(name.clone());
                }
            }
        }
    }

    plan
}
