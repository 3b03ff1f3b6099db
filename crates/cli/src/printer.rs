use std::io::Write;

use anyhow::{Context, Result};
use clap::ValueEnum;
use kectl_core::MediaType;
use kectl_encoding::{detect, Codec, StorageCodec};
use kectl_store::Record;
use tracing::warn;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Output {
    Json,
    Yaml,
    Key,
    None,
}

impl Output {
    /// Formats that never look at values.
    pub fn keys_only(self) -> bool {
        matches!(self, Output::Key | Output::None)
    }
}

pub struct Printer<W> {
    out: W,
    format: Output,
    codec: StorageCodec,
    printed: usize,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W, format: Output) -> Self {
        Self { out, format, codec: StorageCodec, printed: 0 }
    }

    pub fn printed(&self) -> usize {
        self.printed
    }

    pub fn print(&mut self, record: &Record) -> Result<()> {
        self.printed += 1;
        let key = record.key_str();
        let media = match self.format {
            Output::None => return Ok(()),
            Output::Key => return writeln!(self.out, "{key}").context("writing output"),
            Output::Json => MediaType::Json,
            Output::Yaml => MediaType::Yaml,
        };

        // deletions carry the old object only
        let data = match (&record.value, &record.prev_value) {
            (v, _) if !v.is_empty() => v,
            (_, Some(prev)) => prev,
            _ => return writeln!(self.out, "{key}").context("writing output"),
        };
        let body = match self.codec.convert(detect(data), media, data) {
            Ok(body) => body,
            Err(err) if err.is_unsupported() => {
                warn!(%key, error = %err, "value not printable, showing key");
                return writeln!(self.out, "{key}").context("writing output");
            }
            Err(err) => return Err(err).with_context(|| format!("decoding {key}")),
        };

        if self.format == Output::Yaml && self.printed > 1 {
            self.out.write_all(b"---\n")?;
        }
        if self.format == Output::Json {
            let value: serde_json::Value = serde_json::from_slice(&body).with_context(|| format!("decoding {key}"))?;
            serde_json::to_writer_pretty(&mut self.out, &value)?;
            self.out.write_all(b"\n")?;
        } else {
            self.out.write_all(&body)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn pod(name: &str) -> Record {
        let json = format!(r#"{{"apiVersion":"v1","kind":"Pod","metadata":{{"name":"{name}"}}}}"#);
        let value = StorageCodec.convert(MediaType::Json, MediaType::StorageBinary, json.as_bytes()).unwrap();
        Record {
            key: Bytes::from(format!("/registry/pods/default/{name}")),
            value: Bytes::from(value),
            prev_value: None,
        }
    }

    fn render(format: Output, records: &[Record]) -> String {
        let mut p = Printer::new(Vec::new(), format);
        for r in records {
            p.print(r).unwrap();
        }
        String::from_utf8(p.out).unwrap()
    }

    #[test]
    fn key_and_none() {
        let records = [pod("a"), pod("b")];
        assert_eq!(render(Output::Key, &records), "/registry/pods/default/a\n/registry/pods/default/b\n");
        assert_eq!(render(Output::None, &records), "");
    }

    #[test]
    fn json_decodes_storage_values() {
        let out = render(Output::Json, &[pod("a")]);
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["metadata"]["name"], "a");
    }

    #[test]
    fn yaml_separates_documents() {
        let out = render(Output::Yaml, &[pod("a"), pod("b")]);
        assert_eq!(out.matches("---\n").count(), 1);
        assert!(out.contains("name: b"));
    }

    #[test]
    fn kinds_without_a_schema_print_the_key() {
        let env = kectl_encoding::Envelope {
            api_version: "rbac.authorization.k8s.io/v1".into(),
            kind: "Role".into(),
            raw: vec![0x0a, 0x00],
            content_type: String::new(),
        };
        let role = Record {
            key: Bytes::from_static(b"/registry/roles/default/r"),
            value: Bytes::from(env.encode()),
            prev_value: None,
        };
        assert_eq!(render(Output::Json, &[role]), "/registry/roles/default/r\n");
    }

    #[test]
    fn deletions_print_previous_value() {
        let mut deleted = pod("gone");
        deleted.prev_value = Some(deleted.value.clone());
        deleted.value = Bytes::new();
        let out = render(Output::Yaml, &[deleted]);
        assert!(out.contains("name: gone"));
    }
}
