//! Engine API shapes for swarm services.
//!
//! Only the fields the enforcer reads are modelled; every other part of a
//! service spec travels through as raw JSON so an update can send it back
//! exactly as it was received.

use enforcer_core::types::{RestartPolicySpec, ServiceSnapshot, UpdateConfigSpec};
use enforcer_core::{RegistryError, UpdateIntent};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub(crate) struct ServiceObject {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Version", default)]
    pub version: Option<ObjectVersion>,
    #[serde(rename = "Spec", default)]
    pub spec: ServiceSpec,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ObjectVersion {
    #[serde(rename = "Index")]
    pub index: u64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ServiceSpec {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "TaskTemplate", default)]
    pub task_template: Option<TaskTemplate>,
    #[serde(rename = "UpdateConfig", default)]
    pub update_config: Option<UpdateConfigSpec>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TaskTemplate {
    #[serde(rename = "RestartPolicy", default)]
    pub restart_policy: Option<RestartPolicySpec>,
}

/// Body of an engine error response.
#[derive(Debug, Deserialize)]
pub(crate) struct EngineMessage {
    pub message: String,
}

/// Body of a successful `POST /services/{id}/update`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct UpdateResponse {
    #[serde(rename = "Warnings", default)]
    pub warnings: Option<Vec<String>>,
}

impl From<ServiceObject> for ServiceSnapshot {
    fn from(obj: ServiceObject) -> Self {
        let name = if obj.spec.name.is_empty() {
            obj.id.clone()
        } else {
            obj.spec.name
        };
        ServiceSnapshot {
            id: obj.id,
            name,
            version: obj.version.map(|v| v.index),
            restart_policy: obj.spec.task_template.and_then(|t| t.restart_policy),
            update_config: obj.spec.update_config,
        }
    }
}

/// Write `intent` into a raw service spec, key by key.
///
/// Existing keys inside `TaskTemplate.RestartPolicy` and `UpdateConfig` that
/// the intent does not name are kept, as is everything outside them.
pub fn apply_intent(spec: &mut Value, intent: &UpdateIntent) -> Result<(), RegistryError> {
    let restart = to_object(&intent.restart_policy)?;
    let update = to_object(&intent.update_config)?;

    let root = spec
        .as_object_mut()
        .ok_or_else(|| RegistryError::Decode("service spec is not an object".to_string()))?;

    let template = object_entry(root, "TaskTemplate")?;
    merge_into(object_entry(template, "RestartPolicy")?, restart);
    merge_into(object_entry(root, "UpdateConfig")?, update);
    Ok(())
}

fn to_object<T: serde::Serialize>(value: &T) -> Result<Map<String, Value>, RegistryError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(RegistryError::Decode(format!(
            "expected an object, got {other}"
        ))),
        Err(e) => Err(RegistryError::Decode(e.to_string())),
    }
}

fn object_entry<'a>(
    parent: &'a mut Map<String, Value>,
    key: &str,
) -> Result<&'a mut Map<String, Value>, RegistryError> {
    let slot = parent
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if slot.is_null() {
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut()
        .ok_or_else(|| RegistryError::Decode(format!("{key} is not an object")))
}

fn merge_into(target: &mut Map<String, Value>, fields: Map<String, Value>) {
    for (k, v) in fields {
        target.insert(k, v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enforcer_core::types::{
        FailureAction, RestartCondition, RestartPolicy, UpdateConfig, UpdateOrder,
    };
    use serde_json::json;

    fn intent() -> UpdateIntent {
        UpdateIntent {
            restart_policy: RestartPolicy {
                condition: RestartCondition::OnFailure,
                delay_ns: 10_000_000_000,
                max_attempts: 4,
                window_ns: 10_000_000_000,
            },
            update_config: UpdateConfig {
                parallelism: 2,
                delay_ns: 10_000_000_000,
                order: UpdateOrder::StartFirst,
                failure_action: FailureAction::Pause,
                monitor_ns: 5_000_000_000,
                max_failure_ratio: 0.0,
            },
        }
    }

    #[test]
    fn service_object_maps_to_snapshot() {
        let obj: ServiceObject = serde_json::from_value(json!({
            "ID": "9mnpnzenvg8p",
            "Version": { "Index": 19 },
            "CreatedAt": "2016-06-07T21:05:51.880065305Z",
            "Spec": {
                "Name": "hopeful_cori",
                "TaskTemplate": {
                    "ContainerSpec": { "Image": "redis" },
                    "RestartPolicy": { "Condition": "any", "MaxAttempts": 0 }
                },
                "Mode": { "Replicated": { "Replicas": 1 } },
                "UpdateConfig": {
                    "Parallelism": 1,
                    "Delay": 1000000000,
                    "FailureAction": "pause",
                    "Monitor": 15_000_000_000u64,
                    "MaxFailureRatio": 0.15
                }
            }
        }))
        .unwrap();

        let snapshot = ServiceSnapshot::from(obj);
        assert_eq!(snapshot.id, "9mnpnzenvg8p");
        assert_eq!(snapshot.name, "hopeful_cori");
        assert_eq!(snapshot.version, Some(19));
        let rp = snapshot.restart_policy.unwrap();
        assert_eq!(rp.condition, Some(RestartCondition::Any));
        assert_eq!(rp.max_attempts, Some(0));
        assert_eq!(rp.delay_ns, None);
        let uc = snapshot.update_config.unwrap();
        assert_eq!(uc.delay_ns, Some(1_000_000_000));
        assert_eq!(uc.order, None);
        assert_eq!(uc.max_failure_ratio, Some(0.15));
    }

    #[test]
    fn missing_spec_sections_stay_absent() {
        let obj: ServiceObject =
            serde_json::from_value(json!({ "ID": "abc", "Spec": { "TaskTemplate": {} } }))
                .unwrap();
        let snapshot = ServiceSnapshot::from(obj);
        assert_eq!(snapshot.name, "abc");
        assert_eq!(snapshot.version, None);
        assert!(snapshot.restart_policy.is_none());
        assert!(snapshot.update_config.is_none());
    }

    #[test]
    fn apply_intent_preserves_unrelated_fields() {
        let mut spec = json!({
            "Name": "web",
            "Labels": { "team": "infra" },
            "TaskTemplate": {
                "ContainerSpec": { "Image": "nginx:1.25", "Env": ["A=1"] },
                "RestartPolicy": { "Condition": "on-failure", "Delay": 5_000_000_000u64 },
                "Placement": { "Constraints": ["node.role==worker"] }
            },
            "Mode": { "Replicated": { "Replicas": 3 } },
            "EndpointSpec": { "Mode": "vip" }
        });

        apply_intent(&mut spec, &intent()).unwrap();

        assert_eq!(spec["Name"], "web");
        assert_eq!(spec["Labels"]["team"], "infra");
        assert_eq!(spec["TaskTemplate"]["ContainerSpec"]["Image"], "nginx:1.25");
        assert_eq!(
            spec["TaskTemplate"]["Placement"]["Constraints"][0],
            "node.role==worker"
        );
        assert_eq!(spec["Mode"]["Replicated"]["Replicas"], 3);
        assert_eq!(spec["EndpointSpec"]["Mode"], "vip");

        let rp = &spec["TaskTemplate"]["RestartPolicy"];
        assert_eq!(rp["Delay"], 10_000_000_000u64);
        assert_eq!(rp["Condition"], "on-failure");
        assert_eq!(rp["MaxAttempts"], 4);
        let uc = &spec["UpdateConfig"];
        assert_eq!(uc["Delay"], 10_000_000_000u64);
        assert_eq!(uc["Order"], "start-first");
        assert_eq!(uc["Parallelism"], 2);
    }

    #[test]
    fn apply_intent_keeps_unknown_keys_inside_sections() {
        let mut spec = json!({
            "TaskTemplate": { "RestartPolicy": { "Delay": 1, "FutureKnob": true } },
            "UpdateConfig": null
        });
        apply_intent(&mut spec, &intent()).unwrap();
        assert_eq!(spec["TaskTemplate"]["RestartPolicy"]["FutureKnob"], true);
        assert_eq!(spec["UpdateConfig"]["Monitor"], 5_000_000_000u64);
    }

    #[test]
    fn apply_intent_rejects_non_object_spec() {
        let mut spec = json!(["not", "a", "spec"]);
        assert!(matches!(
            apply_intent(&mut spec, &intent()),
            Err(RegistryError::Decode(_))
        ));
    }
}
