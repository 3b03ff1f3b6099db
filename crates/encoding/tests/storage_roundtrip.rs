use kectl_core::MediaType;
use kectl_encoding::{detect, Codec, StorageCodec};

#[test]
fn yaml_manifest_survives_storage_envelope() {
    let yaml = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cfg\n  namespace: ns\ndata:\n  k: v\n";
    let codec = StorageCodec;
    let bin = codec.convert(MediaType::Yaml, MediaType::StorageBinary, yaml.as_bytes()).unwrap();
    assert_eq!(detect(&bin), MediaType::StorageBinary);

    let json = codec.convert(detect(&bin), MediaType::Json, &bin).unwrap();
    let v: serde_json::Value = serde_json::from_slice(&json).unwrap();
    assert_eq!(v["metadata"]["name"], "cfg");
    assert_eq!(v["data"]["k"], "v");
}

#[test]
fn plain_json_is_detected_as_json() {
    assert_eq!(detect(br#"{"kind":"Widget"}"#), MediaType::Json);
}
