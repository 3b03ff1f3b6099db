//! Typed protobuf bodies.
//!
//! Objects are converted field by field between their JSON form and the
//! proto2 wire format the API server stores, driven by the tables in
//! [`kinds`]. Maps travel as repeated `{key = 1, value = 2}` entries and
//! repeated scalars are written unpacked; packed scalars are accepted on read.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat};
use prost::encoding::{decode_key, decode_varint, encode_key, encode_varint, WireType};
use serde_json::{Map, Value as Json};

use crate::EncodingError;

mod kinds;
mod pod;

use kinds::{Field, Ty};

type Object = Map<String, Json>;

/// Encode a JSON object as the typed body of its `api_version`/`kind`.
pub(crate) fn encode_body(api_version: &str, kind: &str, value: &Json) -> Result<Vec<u8>, EncodingError> {
    let fields = kinds::lookup(api_version, kind).ok_or_else(|| unsupported_kind(api_version, kind))?;
    let obj = value.as_object().ok_or_else(|| invalid(kind, "expected an object"))?;
    let mut buf = Vec::new();
    encode_message(fields, obj, kind, &["apiVersion", "kind"], &mut buf)?;
    Ok(buf)
}

/// Decode a typed body back into a JSON object carrying `apiVersion` and `kind`.
pub(crate) fn decode_body(api_version: &str, kind: &str, raw: &[u8]) -> Result<Json, EncodingError> {
    let fields = kinds::lookup(api_version, kind).ok_or_else(|| unsupported_kind(api_version, kind))?;
    let mut obj = Object::new();
    obj.insert("apiVersion".into(), api_version.into());
    obj.insert("kind".into(), kind.into());
    decode_fields(fields, raw, kind, &mut obj)?;
    Ok(Json::Object(obj))
}

fn unsupported_kind(api_version: &str, kind: &str) -> EncodingError {
    EncodingError::UnsupportedKind { api_version: api_version.to_string(), kind: kind.to_string() }
}

fn invalid(path: &str, reason: impl std::fmt::Display) -> EncodingError {
    EncodingError::InvalidValue { path: path.to_string(), reason: reason.to_string() }
}

// encode

fn encode_message(
    fields: &[Field],
    obj: &Object,
    path: &str,
    skip: &[&str],
    buf: &mut Vec<u8>,
) -> Result<(), EncodingError> {
    let unknown = obj
        .iter()
        .find(|(k, v)| !v.is_null() && !skip.contains(&k.as_str()) && !knows(fields, k));
    if let Some((key, _)) = unknown {
        return Err(EncodingError::UnsupportedField { path: format!("{path}.{key}") });
    }
    write_fields(fields, obj, path, buf)
}

fn knows(fields: &[Field], key: &str) -> bool {
    fields.iter().any(|f| match (f.inline, f.ty) {
        (true, Ty::Msg(inner)) => knows(inner, key),
        _ => f.name == key,
    })
}

fn write_fields(fields: &[Field], obj: &Object, path: &str, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
    for field in fields {
        if field.inline {
            if let Ty::Msg(inner) = field.ty {
                let mut body = Vec::new();
                write_fields(inner, obj, path, &mut body)?;
                write_bytes(field.tag, &body, buf);
            }
            continue;
        }
        let value = match obj.get(field.name) {
            None | Some(Json::Null) => continue,
            Some(value) => value,
        };
        let path = format!("{path}.{}", field.name);
        if field.repeated {
            let items = value.as_array().ok_or_else(|| invalid(&path, "expected a list"))?;
            for (i, item) in items.iter().enumerate() {
                write_value(field.tag, field.ty, item, &format!("{path}[{i}]"), buf)?;
            }
        } else {
            write_value(field.tag, field.ty, value, &path, buf)?;
        }
    }
    Ok(())
}

fn write_value(tag: u32, ty: Ty, value: &Json, path: &str, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
    if let Some(value_ty) = map_value(ty) {
        let entries = value.as_object().ok_or_else(|| invalid(path, "expected a map"))?;
        for (key, item) in entries.iter().filter(|(_, v)| !v.is_null()) {
            let mut entry = Vec::new();
            write_bytes(1, key.as_bytes(), &mut entry);
            write_value(2, value_ty, item, &format!("{path}.{key}"), &mut entry)?;
            write_bytes(tag, &entry, buf);
        }
        return Ok(());
    }

    match ty {
        Ty::Str => write_bytes(tag, as_str(value, path)?.as_bytes(), buf),
        Ty::Bool => {
            let b = value.as_bool().ok_or_else(|| invalid(path, "expected a boolean"))?;
            write_varint(tag, u64::from(b), buf);
        }
        Ty::I32 => {
            let v = i32::try_from(as_i64(value, path)?).map_err(|_| invalid(path, "out of int32 range"))?;
            write_varint(tag, i64::from(v) as u64, buf);
        }
        Ty::I64 => write_varint(tag, as_i64(value, path)? as u64, buf),
        Ty::Bytes => {
            let raw = BASE64.decode(as_str(value, path)?).map_err(|e| invalid(path, e))?;
            write_bytes(tag, &raw, buf);
        }
        Ty::Time | Ty::MicroTime => {
            let at = DateTime::parse_from_rfc3339(as_str(value, path)?).map_err(|e| invalid(path, e))?;
            let mut body = Vec::new();
            write_varint(1, at.timestamp() as u64, &mut body);
            write_varint(2, u64::from(at.timestamp_subsec_nanos()), &mut body);
            write_bytes(tag, &body, buf);
        }
        Ty::Quantity => {
            let mut body = Vec::new();
            write_bytes(1, quantity(value, path)?.as_bytes(), &mut body);
            write_bytes(tag, &body, buf);
        }
        Ty::IntOrString => {
            let mut body = Vec::new();
            match value {
                Json::String(s) => {
                    write_varint(1, 1, &mut body);
                    write_varint(2, 0, &mut body);
                    write_bytes(3, s.as_bytes(), &mut body);
                }
                _ => {
                    let v = i32::try_from(as_i64(value, path)?).map_err(|_| invalid(path, "out of int32 range"))?;
                    write_varint(1, 0, &mut body);
                    write_varint(2, i64::from(v) as u64, &mut body);
                    write_bytes(3, b"", &mut body);
                }
            }
            write_bytes(tag, &body, buf);
        }
        Ty::RawJson => {
            let mut body = Vec::new();
            write_bytes(1, &serde_json::to_vec(value)?, &mut body);
            write_bytes(tag, &body, buf);
        }
        Ty::Msg(inner) => {
            let obj = value.as_object().ok_or_else(|| invalid(path, "expected an object"))?;
            let mut body = Vec::new();
            encode_message(inner, obj, path, &[], &mut body)?;
            write_bytes(tag, &body, buf);
        }
        Ty::StrMap | Ty::BytesMap | Ty::QuantityMap => {}
    }
    Ok(())
}

fn map_value(ty: Ty) -> Option<Ty> {
    match ty {
        Ty::StrMap => Some(Ty::Str),
        Ty::BytesMap => Some(Ty::Bytes),
        Ty::QuantityMap => Some(Ty::Quantity),
        _ => None,
    }
}

fn as_str<'v>(value: &'v Json, path: &str) -> Result<&'v str, EncodingError> {
    value.as_str().ok_or_else(|| invalid(path, "expected a string"))
}

fn as_i64(value: &Json, path: &str) -> Result<i64, EncodingError> {
    value.as_i64().ok_or_else(|| invalid(path, "expected an integer"))
}

/// Quantities are strings, but manifests often write `cpu: 1`.
fn quantity(value: &Json, path: &str) -> Result<String, EncodingError> {
    match value {
        Json::String(s) => Ok(s.clone()),
        Json::Number(n) => Ok(n.to_string()),
        _ => Err(invalid(path, "expected a quantity")),
    }
}

fn write_varint(tag: u32, value: u64, buf: &mut Vec<u8>) {
    encode_key(tag, WireType::Varint, buf);
    encode_varint(value, buf);
}

fn write_bytes(tag: u32, bytes: &[u8], buf: &mut Vec<u8>) {
    encode_key(tag, WireType::LengthDelimited, buf);
    encode_varint(bytes.len() as u64, buf);
    buf.extend_from_slice(bytes);
}

// decode

#[derive(Clone, Copy)]
enum Wire<'a> {
    Varint(u64),
    Bytes(&'a [u8]),
}

fn next_field<'a>(buf: &mut &'a [u8], path: &str) -> Result<(u32, Wire<'a>), EncodingError> {
    let (tag, wire_type) = decode_key(buf)?;
    match wire_type {
        WireType::Varint => Ok((tag, Wire::Varint(decode_varint(buf)?))),
        WireType::LengthDelimited => {
            let len = usize::try_from(decode_varint(buf)?).unwrap_or(usize::MAX);
            if len > buf.len() {
                return Err(EncodingError::Truncated { path: path.to_string() });
            }
            let (body, rest) = buf.split_at(len);
            *buf = rest;
            Ok((tag, Wire::Bytes(body)))
        }
        other => Err(invalid(path, format!("unexpected wire type {other:?} for field {tag}"))),
    }
}

fn fields_of<'a>(mut body: &'a [u8], path: &str) -> Result<Vec<(u32, Wire<'a>)>, EncodingError> {
    let mut out = Vec::new();
    while !body.is_empty() {
        out.push(next_field(&mut body, path)?);
    }
    Ok(out)
}

fn decode_fields(fields: &[Field], mut buf: &[u8], path: &str, obj: &mut Object) -> Result<(), EncodingError> {
    while !buf.is_empty() {
        let (tag, wire) = next_field(&mut buf, path)?;
        let field = fields
            .iter()
            .find(|f| f.tag == tag)
            .ok_or_else(|| EncodingError::UnsupportedField { path: format!("{path}#{tag}") })?;

        if field.inline {
            match (field.ty, wire) {
                (Ty::Msg(inner), Wire::Bytes(body)) => decode_fields(inner, body, path, obj)?,
                _ => return Err(invalid(path, format!("field {tag} is not a message"))),
            }
            continue;
        }

        let path = format!("{path}.{}", field.name);
        if let Some(value_ty) = map_value(field.ty) {
            let (key, value) = read_entry(value_ty, wire, &path)?;
            if let Json::Object(map) = obj.entry(field.name).or_insert_with(|| Json::Object(Object::new())) {
                map.insert(key, value);
            }
        } else if field.repeated {
            let value = match (field.ty, wire) {
                (Ty::Bool | Ty::I32 | Ty::I64, Wire::Bytes(mut packed)) => {
                    let mut items = Vec::new();
                    while !packed.is_empty() {
                        items.push(varint_value(field.ty, decode_varint(&mut packed)?));
                    }
                    items
                }
                (ty, wire) => vec![read_value(ty, wire, &path)?],
            };
            if let Json::Array(list) = obj.entry(field.name).or_insert_with(|| Json::Array(Vec::new())) {
                list.extend(value);
            }
        } else {
            match read_value(field.ty, wire, &path)? {
                Json::Null => {}
                Json::String(s) if s.is_empty() => {}
                value => {
                    obj.insert(field.name.to_string(), value);
                }
            }
        }
    }
    Ok(())
}

fn varint_value(ty: Ty, v: u64) -> Json {
    match ty {
        Ty::Bool => Json::Bool(v != 0),
        Ty::I32 => Json::from(v as i32),
        _ => Json::from(v as i64),
    }
}

fn read_value(ty: Ty, wire: Wire<'_>, path: &str) -> Result<Json, EncodingError> {
    let body = match (ty, wire) {
        (Ty::Bool | Ty::I32 | Ty::I64, Wire::Varint(v)) => return Ok(varint_value(ty, v)),
        (Ty::Bool | Ty::I32 | Ty::I64, Wire::Bytes(_)) | (_, Wire::Varint(_)) => {
            return Err(invalid(path, "wire type does not match the field"))
        }
        (_, Wire::Bytes(body)) => body,
    };
    match ty {
        Ty::Str => Ok(Json::String(utf8(body, path)?)),
        Ty::Bytes => Ok(Json::String(BASE64.encode(body))),
        Ty::Time => read_time(body, SecondsFormat::Secs, path),
        Ty::MicroTime => read_time(body, SecondsFormat::Micros, path),
        Ty::Quantity => {
            let mut s = String::new();
            for (tag, wire) in fields_of(body, path)? {
                if let (1, Wire::Bytes(b)) = (tag, wire) {
                    s = utf8(b, path)?;
                }
            }
            Ok(Json::String(s))
        }
        Ty::IntOrString => {
            let (mut is_string, mut int_val, mut str_val) = (false, 0i32, String::new());
            for (tag, wire) in fields_of(body, path)? {
                match (tag, wire) {
                    (1, Wire::Varint(v)) => is_string = v == 1,
                    (2, Wire::Varint(v)) => int_val = v as i32,
                    (3, Wire::Bytes(b)) => str_val = utf8(b, path)?,
                    _ => {}
                }
            }
            Ok(if is_string { Json::String(str_val) } else { Json::from(int_val) })
        }
        Ty::RawJson => {
            for (tag, wire) in fields_of(body, path)? {
                if let (1, Wire::Bytes(raw)) = (tag, wire) {
                    return Ok(serde_json::from_slice(raw)?);
                }
            }
            Ok(Json::Null)
        }
        Ty::Msg(inner) => {
            let mut sub = Object::new();
            decode_fields(inner, body, path, &mut sub)?;
            Ok(Json::Object(sub))
        }
        Ty::Bool | Ty::I32 | Ty::I64 | Ty::StrMap | Ty::BytesMap | Ty::QuantityMap => {
            Err(invalid(path, "wire type does not match the field"))
        }
    }
}

/// A zero timestamp is the unset time and decodes to null.
fn read_time(body: &[u8], format: SecondsFormat, path: &str) -> Result<Json, EncodingError> {
    let (mut secs, mut nanos) = (0i64, 0i32);
    for (tag, wire) in fields_of(body, path)? {
        match (tag, wire) {
            (1, Wire::Varint(v)) => secs = v as i64,
            (2, Wire::Varint(v)) => nanos = v as i32,
            _ => {}
        }
    }
    if secs == 0 && nanos == 0 {
        return Ok(Json::Null);
    }
    let at = u32::try_from(nanos)
        .ok()
        .and_then(|n| DateTime::from_timestamp(secs, n))
        .ok_or_else(|| invalid(path, format!("timestamp {secs}.{nanos} out of range")))?;
    Ok(Json::String(at.to_rfc3339_opts(format, true)))
}

fn read_entry(value_ty: Ty, wire: Wire<'_>, path: &str) -> Result<(String, Json), EncodingError> {
    let Wire::Bytes(body) = wire else {
        return Err(invalid(path, "map entry is not a message"));
    };
    let (mut key, mut value) = (String::new(), Json::String(String::new()));
    for (tag, wire) in fields_of(body, path)? {
        match (tag, wire) {
            (1, Wire::Bytes(b)) => key = utf8(b, path)?,
            (2, wire) => value = read_value(value_ty, wire, path)?,
            _ => {}
        }
    }
    Ok((key, value))
}

fn utf8(bytes: &[u8], path: &str) -> Result<String, EncodingError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| invalid(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roundtrip(value: Json) -> Json {
        let api_version = value["apiVersion"].as_str().unwrap().to_string();
        let kind = value["kind"].as_str().unwrap().to_string();
        let raw = encode_body(&api_version, &kind, &value).unwrap();
        decode_body(&api_version, &kind, &raw).unwrap()
    }

    #[test]
    fn deployment_with_special_types_survives() {
        let deploy = json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {
                "name": "web",
                "namespace": "prod",
                "labels": {"app": "web", "tier": "front"},
                "creationTimestamp": "2024-05-01T10:00:00Z",
                "generation": 4,
            },
            "spec": {
                "replicas": 0,
                "selector": {"matchLabels": {"app": "web"}},
                "strategy": {"type": "RollingUpdate", "rollingUpdate": {"maxSurge": "25%", "maxUnavailable": 1}},
                "template": {
                    "metadata": {"labels": {"app": "web"}},
                    "spec": {
                        "containers": [{
                            "name": "nginx",
                            "image": "nginx:1.25",
                            "ports": [{"containerPort": 80, "protocol": "TCP"}],
                            "resources": {"limits": {"cpu": "500m", "memory": "128Mi"}},
                            "readinessProbe": {"httpGet": {"path": "/", "port": "http"}, "periodSeconds": 5},
                        }],
                        "volumes": [{"name": "cfg", "configMap": {"name": "web-config", "defaultMode": 420}}],
                        "securityContext": {"supplementalGroups": [1000, 2000], "runAsUser": -1},
                    },
                },
            },
        });
        assert_eq!(roundtrip(deploy.clone()), deploy);
    }

    #[test]
    fn lease_keeps_microseconds() {
        let lease = json!({
            "apiVersion": "coordination.k8s.io/v1",
            "kind": "Lease",
            "metadata": {"name": "node-a", "namespace": "kube-node-lease"},
            "spec": {"holderIdentity": "node-a", "leaseDurationSeconds": 40, "renewTime": "2024-05-01T10:00:00.123456Z"},
        });
        assert_eq!(roundtrip(lease.clone()), lease);
    }

    #[test]
    fn secret_data_is_raw_bytes_on_the_wire() {
        let secret = json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {"name": "s"},
            "data": {"password": "aHVudGVyMg=="},
            "type": "Opaque",
        });
        let raw = encode_body("v1", "Secret", &secret).unwrap();
        assert!(raw.windows(7).any(|w| w == b"hunter2"));
        assert_eq!(decode_body("v1", "Secret", &raw).unwrap(), secret);
    }

    #[test]
    fn quantities_accept_numbers() {
        let node = json!({
            "apiVersion": "v1",
            "kind": "Node",
            "metadata": {"name": "n"},
            "status": {"capacity": {"cpu": 4, "memory": "16Gi"}},
        });
        let back = roundtrip(node);
        assert_eq!(back["status"]["capacity"]["cpu"], "4");
        assert_eq!(back["status"]["capacity"]["memory"], "16Gi");
    }

    #[test]
    fn unknown_kinds_and_fields_are_errors() {
        let role = json!({"apiVersion": "rbac.authorization.k8s.io/v1", "kind": "Role", "metadata": {"name": "r"}});
        let err = encode_body("rbac.authorization.k8s.io/v1", "Role", &role).unwrap_err();
        assert!(matches!(err, EncodingError::UnsupportedKind { .. }), "{err}");

        let pod = json!({"apiVersion": "v1", "kind": "Pod", "metadata": {"name": "p"}, "spec": {"bogus": true}});
        match encode_body("v1", "Pod", &pod).unwrap_err() {
            EncodingError::UnsupportedField { path } => assert_eq!(path, "Pod.spec.bogus"),
            other => panic!("unexpected {other}"),
        }

        let pod = json!({"apiVersion": "v1", "kind": "Pod", "spec": {"priority": 1u64 << 40}});
        assert!(matches!(encode_body("v1", "Pod", &pod), Err(EncodingError::InvalidValue { .. })));
    }

    #[test]
    fn unknown_tags_and_truncation_are_errors() {
        // metadata (1) then an unassigned tag 9 varint
        let raw = [0x0a, 0x00, 0x48, 0x01];
        assert!(matches!(decode_body("v1", "ConfigMap", &raw), Err(EncodingError::UnsupportedField { .. })));

        // metadata claims 5 bytes, has 1
        let raw = [0x0a, 0x05, 0x0a];
        assert!(matches!(decode_body("v1", "ConfigMap", &raw), Err(EncodingError::Truncated { .. })));
    }

    #[test]
    fn packed_scalars_and_unset_times_decode() {
        // spec(2){ securityContext(14){ supplementalGroups(4) packed [1, 2] } }
        let ctx = [0x22, 0x02, 0x01, 0x02];
        let mut spec = vec![0x72, ctx.len() as u8];
        spec.extend_from_slice(&ctx);
        // metadata(1){ name(1) "p", creationTimestamp(8) {} }
        let mut raw = vec![0x0a, 0x05, 0x0a, 0x01, b'p', 0x42, 0x00];
        raw.extend_from_slice(&[0x12, spec.len() as u8]);
        raw.extend_from_slice(&spec);

        let pod = decode_body("v1", "Pod", &raw).unwrap();
        assert_eq!(pod["spec"]["securityContext"]["supplementalGroups"], json!([1, 2]));
        assert_eq!(pod["metadata"], json!({"name": "p"}));
    }
}
