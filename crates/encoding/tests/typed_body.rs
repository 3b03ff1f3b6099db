//! Storage bodies read back with independently declared prost messages,
//! the way the API server unmarshals `Unknown.raw` into the typed object.

use std::collections::HashMap;

use kectl_core::MediaType;
use kectl_encoding::{Codec, Envelope, StorageCodec};
use prost::Message;

#[derive(Clone, PartialEq, Message)]
struct ObjectMeta {
    #[prost(string, optional, tag = "1")]
    name: Option<String>,
    #[prost(string, optional, tag = "3")]
    namespace: Option<String>,
    #[prost(map = "string, string", tag = "11")]
    labels: HashMap<String, String>,
}

#[derive(Clone, PartialEq, Message)]
struct ContainerPort {
    #[prost(int32, optional, tag = "3")]
    container_port: Option<i32>,
}

#[derive(Clone, PartialEq, Message)]
struct Container {
    #[prost(string, optional, tag = "1")]
    name: Option<String>,
    #[prost(string, optional, tag = "2")]
    image: Option<String>,
    #[prost(string, repeated, tag = "4")]
    args: Vec<String>,
    #[prost(message, repeated, tag = "6")]
    ports: Vec<ContainerPort>,
}

#[derive(Clone, PartialEq, Message)]
struct PodSpec {
    #[prost(message, repeated, tag = "2")]
    containers: Vec<Container>,
    #[prost(int64, optional, tag = "4")]
    termination_grace_period_seconds: Option<i64>,
}

#[derive(Clone, PartialEq, Message)]
struct Pod {
    #[prost(message, optional, tag = "1")]
    metadata: Option<ObjectMeta>,
    #[prost(message, optional, tag = "2")]
    spec: Option<PodSpec>,
}

#[derive(Clone, PartialEq, Message)]
struct ConfigMap {
    #[prost(message, optional, tag = "1")]
    metadata: Option<ObjectMeta>,
    #[prost(map = "string, string", tag = "2")]
    data: HashMap<String, String>,
    #[prost(map = "string, bytes", tag = "3")]
    binary_data: HashMap<String, Vec<u8>>,
}

fn store(json: &str) -> Envelope {
    let bin = StorageCodec.convert(MediaType::Json, MediaType::StorageBinary, json.as_bytes()).unwrap();
    Envelope::decode(&bin).unwrap()
}

#[test]
fn pod_body_is_a_typed_pod_message() {
    let env = store(
        r#"{"apiVersion":"v1","kind":"Pod",
            "metadata":{"name":"x","namespace":"ns","labels":{"app":"web"}},
            "spec":{"terminationGracePeriodSeconds":30,
                    "containers":[{"name":"c","image":"busybox","args":["sleep","3600"],
                                   "ports":[{"containerPort":8080}]}]}}"#,
    );
    assert_eq!((env.api_version.as_str(), env.kind.as_str()), ("v1", "Pod"));

    let pod = Pod::decode(env.raw.as_slice()).unwrap();
    let meta = pod.metadata.unwrap();
    assert_eq!(meta.name.as_deref(), Some("x"));
    assert_eq!(meta.namespace.as_deref(), Some("ns"));
    assert_eq!(meta.labels.get("app").map(String::as_str), Some("web"));

    let spec = pod.spec.unwrap();
    assert_eq!(spec.termination_grace_period_seconds, Some(30));
    let c = &spec.containers[0];
    assert_eq!(c.name.as_deref(), Some("c"));
    assert_eq!(c.image.as_deref(), Some("busybox"));
    assert_eq!(c.args, ["sleep", "3600"]);
    assert_eq!(c.ports[0].container_port, Some(8080));
}

#[test]
fn config_map_body_carries_decoded_binary_data() {
    let env = store(
        r#"{"apiVersion":"v1","kind":"ConfigMap","metadata":{"name":"cfg"},
            "data":{"k":"v"},"binaryData":{"blob":"AAEC"}}"#,
    );
    let cm = ConfigMap::decode(env.raw.as_slice()).unwrap();
    assert_eq!(cm.metadata.unwrap().name.as_deref(), Some("cfg"));
    assert_eq!(cm.data.get("k").map(String::as_str), Some("v"));
    assert_eq!(cm.binary_data.get("blob").map(Vec::as_slice), Some([0u8, 1, 2].as_slice()));
}

#[test]
fn bodies_written_by_prost_decode_to_json() {
    let pod = Pod {
        metadata: Some(ObjectMeta { name: Some("p".into()), namespace: Some("ns".into()), labels: HashMap::new() }),
        spec: Some(PodSpec {
            containers: vec![Container {
                name: Some("c".into()),
                image: Some("nginx".into()),
                args: vec![],
                ports: vec![ContainerPort { container_port: Some(80) }],
            }],
            termination_grace_period_seconds: None,
        }),
    };
    let env = Envelope { api_version: "v1".into(), kind: "Pod".into(), raw: pod.encode_to_vec(), content_type: String::new() };
    let json = StorageCodec.convert(MediaType::StorageBinary, MediaType::Json, &env.encode()).unwrap();
    let v: serde_json::Value = serde_json::from_slice(&json).unwrap();
    assert_eq!(v["kind"], "Pod");
    assert_eq!(v["metadata"]["namespace"], "ns");
    assert_eq!(v["spec"]["containers"][0]["image"], "nginx");
    assert_eq!(v["spec"]["containers"][0]["ports"][0]["containerPort"], 80);
}
