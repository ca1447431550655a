//! Structured tree mutation
//!
//! Trees are `serde_json::Value`s shaped the way xml2js parses XML: element
//! children live in arrays keyed by tag name and attributes live in a `"$"`
//! map. Paths walk object keys; when a step lands on an array the walk
//! continues into its first element, so `["manifest", "application"]` reaches
//! the single `<application>` element.

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::EditOutcome;
use crate::error::{InjectError, Result};

/// Key holding an element's attributes
pub const ATTRIBUTES: &str = "$";

/// How prior injection is detected in a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    /// One own entry anywhere in the collection blocks all new entries
    #[default]
    Collection,
    /// Each new entry is added unless an own entry with the same identity exists
    Entry,
}

/// Predicate deciding whether an existing entry was injected by us
pub trait Identity {
    /// Entry belongs to the SDK at all
    fn is_own(&self, entry: &Value) -> bool;

    /// Both entries declare the same thing
    fn same(&self, a: &Value, b: &Value) -> bool;
}

/// Identity read from one attribute of an xml2js element
#[derive(Debug, Clone)]
pub struct AttributeIdentity {
    attribute: String,
    prefix: String,
}

/// Entries whose `attribute` contains `prefix` belong to the SDK
pub fn identity_contains(attribute: &str, prefix: &str) -> AttributeIdentity {
    AttributeIdentity {
        attribute: attribute.to_string(),
        prefix: prefix.to_string(),
    }
}

impl AttributeIdentity {
    fn value<'a>(&self, entry: &'a Value) -> Option<&'a str> {
        entry.get(ATTRIBUTES)?.get(&self.attribute)?.as_str()
    }
}

impl Identity for AttributeIdentity {
    fn is_own(&self, entry: &Value) -> bool {
        self.value(entry)
            .is_some_and(|value| value.contains(&self.prefix))
    }

    fn same(&self, a: &Value, b: &Value) -> bool {
        matches!((self.value(a), self.value(b)), (Some(a), Some(b)) if a == b)
    }
}

/// Identity read from a plain field of a mapping entry, e.g. a pod's `name`
#[derive(Debug, Clone)]
pub struct FieldIdentity {
    field: String,
    value: String,
}

/// Entries whose `field` equals `value` belong to the SDK
pub fn identity_equals(field: &str, value: &str) -> FieldIdentity {
    FieldIdentity {
        field: field.to_string(),
        value: value.to_string(),
    }
}

impl Identity for FieldIdentity {
    fn is_own(&self, entry: &Value) -> bool {
        entry.get(&self.field).and_then(Value::as_str) == Some(self.value.as_str())
    }

    fn same(&self, a: &Value, b: &Value) -> bool {
        let field = |v: &Value| v.get(&self.field).cloned();
        field(a).is_some() && field(a) == field(b)
    }
}

/// Walk every segment but the last, returning the object that should hold it
fn resolve_parent<'a>(tree: &'a mut Value, path: &[&str]) -> Result<&'a mut Map<String, Value>> {
    let (_, parents) = path
        .split_last()
        .ok_or_else(|| InjectError::malformed(path, "empty path"))?;

    let mut node = tree;
    for (depth, segment) in parents.iter().enumerate() {
        let walked = &path[..=depth];
        let object = node
            .as_object_mut()
            .ok_or_else(|| InjectError::malformed(walked, "parent is not a mapping"))?;
        let child = object
            .get_mut(*segment)
            .ok_or_else(|| InjectError::malformed(walked, "node is absent"))?;
        node = match child {
            Value::Array(items) => items
                .first_mut()
                .ok_or_else(|| InjectError::malformed(walked, "element list is empty"))?,
            other => other,
        };
    }

    node.as_object_mut()
        .ok_or_else(|| InjectError::malformed(parents, "node is not a mapping"))
}

/// Ensure the collection at `path` holds the SDK's entries
///
/// A missing collection is created empty. With [`Granularity::Collection`]
/// the presence of any own entry leaves the tree untouched; otherwise new
/// entries are appended in the order given, after the existing ones.
pub fn ensure_tree_entries(
    tree: &mut Value,
    path: &[&str],
    new_entries: &[Value],
    granularity: Granularity,
    identity: &impl Identity,
) -> Result<EditOutcome> {
    let parent = resolve_parent(tree, path)?;
    let name = path[path.len() - 1];

    let collection = parent
        .entry(name)
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| InjectError::malformed(path, "collection is not a list"))?;

    let to_add: Vec<&Value> = match granularity {
        Granularity::Collection => {
            if collection.iter().any(|entry| identity.is_own(entry)) {
                debug!(collection = name, "own entry present, leaving collection as is");
                return Ok(EditOutcome::AlreadyPresent);
            }
            new_entries.iter().collect()
        }
        Granularity::Entry => new_entries
            .iter()
            .filter(|new| !collection.iter().any(|existing| identity.same(existing, new)))
            .collect(),
    };

    if to_add.is_empty() {
        return Ok(EditOutcome::AlreadyPresent);
    }

    let added = to_add.len();
    collection.extend(to_add.into_iter().cloned());
    debug!(collection = name, added, "entries appended");
    Ok(EditOutcome::Appended(added))
}

/// Union `attributes` into the attribute map at `path`
///
/// Attributes already declared keep their current value. Returns how many were
/// added.
pub fn ensure_attribute_set(
    tree: &mut Value,
    path: &[&str],
    attributes: &[(&str, &str)],
) -> Result<usize> {
    let parent = resolve_parent(tree, path)?;
    let name = path[path.len() - 1];

    let map = parent
        .entry(name)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| InjectError::malformed(path, "attribute set is not a mapping"))?;

    let mut added = 0;
    for (key, value) in attributes {
        if !map.contains_key(*key) {
            map.insert(key.to_string(), Value::String(value.to_string()));
            added += 1;
        }
    }
    Ok(added)
}

/// Set `fields` on every own entry of the collection at `path`
///
/// Fields already holding the wanted value are left alone. Returns how many
/// fields were written; a missing collection writes nothing.
pub fn ensure_entry_fields(
    tree: &mut Value,
    path: &[&str],
    identity: &impl Identity,
    fields: &[(&str, Value)],
) -> Result<usize> {
    let parent = resolve_parent(tree, path)?;
    let name = path[path.len() - 1];

    let Some(collection) = parent.get_mut(name) else {
        return Ok(0);
    };
    let collection = collection
        .as_array_mut()
        .ok_or_else(|| InjectError::malformed(path, "collection is not a list"))?;

    let mut written = 0;
    for entry in collection.iter_mut().filter(|entry| identity.is_own(entry)) {
        let object = entry
            .as_object_mut()
            .ok_or_else(|| InjectError::malformed(path, "entry is not a mapping"))?;
        for (key, value) in fields {
            if object.get(*key) != Some(value) {
                object.insert(key.to_string(), value.clone());
                written += 1;
            }
        }
    }

    if written > 0 {
        debug!(collection = name, written, "entry fields updated");
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn receiver(name: &str) -> Value {
        json!({ "$": { "android:name": name, "android:exported": "false" } })
    }

    fn pushy() -> AttributeIdentity {
        identity_contains("android:name", "me.pushy.sdk")
    }

    fn manifest() -> Value {
        json!({
            "manifest": {
                "$": { "xmlns:android": "http://schemas.android.com/apk/res/android" },
                "application": [{
                    "$": { "android:name": ".MainApplication" },
                    "activity": [{ "$": { "android:name": ".MainActivity" } }]
                }]
            }
        })
    }

    const RECEIVERS: &[&str] = &["manifest", "application", "receiver"];

    #[test]
    fn test_creates_collection_and_keeps_order() {
        let mut tree = manifest();
        let entries = [receiver("me.pushy.sdk.A"), receiver("me.pushy.sdk.B")];

        let outcome =
            ensure_tree_entries(&mut tree, RECEIVERS, &entries, Granularity::Collection, &pushy()).unwrap();

        assert_eq!(outcome, EditOutcome::Appended(2));
        assert_eq!(tree["manifest"]["application"][0]["receiver"], json!(entries));
    }

    #[test]
    fn test_appends_after_existing_entries() {
        let mut tree = manifest();
        tree["manifest"]["application"][0]["receiver"] = json!([receiver("com.example.Other")]);

        ensure_tree_entries(&mut tree, RECEIVERS, &[receiver("me.pushy.sdk.A")], Granularity::Collection, &pushy())
            .unwrap();

        let names: Vec<_> = tree["manifest"]["application"][0]["receiver"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["$"]["android:name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["com.example.Other", "me.pushy.sdk.A"]);
    }

    #[test]
    fn test_idempotent() {
        let mut tree = manifest();
        let entries = [receiver("me.pushy.sdk.A"), receiver("me.pushy.sdk.B")];

        ensure_tree_entries(&mut tree, RECEIVERS, &entries, Granularity::Collection, &pushy()).unwrap();
        let once = tree.clone();
        let outcome =
            ensure_tree_entries(&mut tree, RECEIVERS, &entries, Granularity::Collection, &pushy()).unwrap();

        assert_eq!(outcome, EditOutcome::AlreadyPresent);
        assert_eq!(tree, once);
    }

    #[test]
    fn test_one_own_entry_blocks_collection() {
        let mut tree = manifest();
        tree["manifest"]["application"][0]["receiver"] = json!([receiver("me.pushy.sdk.A")]);
        let entries = [receiver("me.pushy.sdk.A"), receiver("me.pushy.sdk.B")];

        let outcome =
            ensure_tree_entries(&mut tree, RECEIVERS, &entries, Granularity::Collection, &pushy()).unwrap();

        assert_eq!(outcome, EditOutcome::AlreadyPresent);
        assert_eq!(tree["manifest"]["application"][0]["receiver"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_entry_granularity_fills_gaps() {
        let mut tree = manifest();
        tree["manifest"]["application"][0]["receiver"] = json!([receiver("me.pushy.sdk.A")]);
        let entries = [receiver("me.pushy.sdk.A"), receiver("me.pushy.sdk.B")];

        let outcome = ensure_tree_entries(&mut tree, RECEIVERS, &entries, Granularity::Entry, &pushy()).unwrap();

        assert_eq!(outcome, EditOutcome::Appended(1));
        assert_eq!(
            tree["manifest"]["application"][0]["receiver"],
            json!([receiver("me.pushy.sdk.A"), receiver("me.pushy.sdk.B")])
        );
    }

    #[test]
    fn test_collections_checked_independently() {
        let mut tree = manifest();
        tree["manifest"]["application"][0]["receiver"] = json!([receiver("me.pushy.sdk.A")]);
        let services = [json!({ "$": { "android:name": "me.pushy.sdk.services.PushySocketService" } })];

        let outcome = ensure_tree_entries(
            &mut tree,
            &["manifest", "application", "service"],
            &services,
            Granularity::Collection,
            &pushy(),
        )
        .unwrap();

        assert_eq!(outcome, EditOutcome::Appended(1));
    }

    #[test]
    fn test_missing_node_is_fatal() {
        let mut tree = json!({ "manifest": { "$": {} } });

        let result = ensure_tree_entries(&mut tree, RECEIVERS, &[receiver("me.pushy.sdk.A")], Granularity::Collection, &pushy());

        match result {
            Err(InjectError::MalformedTree { path, .. }) => {
                assert_eq!(path, vec!["manifest", "application"]);
            }
            other => panic!("expected malformed tree, got {:?}", other),
        }
    }

    #[test]
    fn test_non_list_collection_is_fatal() {
        let mut tree = manifest();
        tree["manifest"]["application"][0]["receiver"] = json!("oops");

        let result = ensure_tree_entries(&mut tree, RECEIVERS, &[], Granularity::Collection, &pushy());
        assert!(matches!(result, Err(InjectError::MalformedTree { .. })));
    }

    #[test]
    fn test_field_identity() {
        let mut tree = json!({ "ios": {} });
        let pod = json!({ "name": "MqttCocoaAsyncSocket", "modular_headers": true });
        let identity = identity_equals("name", "MqttCocoaAsyncSocket");

        let first = ensure_tree_entries(&mut tree, &["ios", "extraPods"], &[pod.clone()], Granularity::Collection, &identity).unwrap();
        let second = ensure_tree_entries(&mut tree, &["ios", "extraPods"], &[pod.clone()], Granularity::Collection, &identity).unwrap();

        assert_eq!(first, EditOutcome::Appended(1));
        assert_eq!(second, EditOutcome::AlreadyPresent);
        assert_eq!(tree["ios"]["extraPods"], json!([pod]));
    }

    #[test]
    fn test_existing_empty_collection_receives_entries() {
        let mut tree = manifest();
        tree["manifest"]["application"][0]["receiver"] = json!([]);
        let entries = [receiver("me.pushy.sdk.A"), receiver("me.pushy.sdk.B")];

        let outcome =
            ensure_tree_entries(&mut tree, RECEIVERS, &entries, Granularity::Collection, &pushy()).unwrap();

        assert_eq!(outcome, EditOutcome::Appended(2));
        assert_eq!(tree["manifest"]["application"][0]["receiver"], json!(entries));
    }

    #[test]
    fn test_entry_fields_set_on_own_entries() {
        let mut tree = json!({
            "ios": {
                "extraPods": [
                    { "name": "Other" },
                    { "name": "MqttCocoaAsyncSocket" }
                ]
            }
        });
        let identity = identity_equals("name", "MqttCocoaAsyncSocket");
        let fields = [("modular_headers", json!(true))];

        let written = ensure_entry_fields(&mut tree, &["ios", "extraPods"], &identity, &fields).unwrap();
        let again = ensure_entry_fields(&mut tree, &["ios", "extraPods"], &identity, &fields).unwrap();

        assert_eq!(written, 1);
        assert_eq!(again, 0);
        assert_eq!(
            tree["ios"]["extraPods"],
            json!([
                { "name": "Other" },
                { "name": "MqttCocoaAsyncSocket", "modular_headers": true }
            ])
        );
    }

    #[test]
    fn test_entry_fields_without_collection() {
        let mut tree = json!({ "ios": {} });
        let identity = identity_equals("name", "MqttCocoaAsyncSocket");

        let written =
            ensure_entry_fields(&mut tree, &["ios", "extraPods"], &identity, &[("modular_headers", json!(true))]).unwrap();

        assert_eq!(written, 0);
        assert_eq!(tree, json!({ "ios": {} }));
    }

    #[test]
    fn test_attribute_set_union() {
        let mut tree = manifest();
        let attrs = [
            ("xmlns:android", "ignored"),
            ("xmlns:tools", "http://schemas.android.com/tools"),
        ];

        let added = ensure_attribute_set(&mut tree, &["manifest", "$"], &attrs).unwrap();
        let again = ensure_attribute_set(&mut tree, &["manifest", "$"], &attrs).unwrap();

        assert_eq!(added, 1);
        assert_eq!(again, 0);
        assert_eq!(
            tree["manifest"]["$"],
            json!({
                "xmlns:android": "http://schemas.android.com/apk/res/android",
                "xmlns:tools": "http://schemas.android.com/tools"
            })
        );
    }

    #[test]
    fn test_attribute_set_created_when_missing() {
        let mut tree = json!({ "manifest": { "application": [{}] } });

        let added = ensure_attribute_set(
            &mut tree,
            &["manifest", "application", "$"],
            &[("android:allowBackup", "false")],
        )
        .unwrap();

        assert_eq!(added, 1);
        assert_eq!(tree["manifest"]["application"][0]["$"]["android:allowBackup"], "false");
    }
}
