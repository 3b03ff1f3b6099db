//! Lazy manifest reader.
//!
//! YAML streams are split on `---` lines and parsed one document at a time;
//! JSON streams are parsed value by value. `*List` documents are flattened
//! into their items. Nothing beyond the current document is buffered.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};

use anyhow::{bail, Context, Result};
use kube::core::DynamicObject;
use serde_json::{Map, Value as Json};

type JsonStream<R> = serde_json::StreamDeserializer<'static, serde_json::de::IoRead<R>, Json>;

enum Source<R: BufRead> {
    Sniff(R),
    Json(JsonStream<R>),
    Yaml(R),
    Done,
}

/// Iterator over the objects in a manifest stream.
pub struct Documents<R: BufRead> {
    source: Source<R>,
    pending: VecDeque<DynamicObject>,
    index: usize,
}

pub fn read_documents<R: BufRead>(reader: R) -> Documents<R> {
    Documents { source: Source::Sniff(reader), pending: VecDeque::new(), index: 0 }
}

/// Open `-` (stdin) or a file path.
pub fn open_input(path: &str) -> Result<Box<dyn BufRead + Send>> {
    match path {
        "" => bail!("path is required"),
        "-" => Ok(Box::new(BufReader::new(io::stdin()))),
        path => {
            let file = File::open(path).with_context(|| format!("opening {path}"))?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

/// Skip leading whitespace and report whether the stream looks like JSON.
fn sniff_json<R: BufRead>(r: &mut R) -> io::Result<bool> {
    loop {
        let buf = r.fill_buf()?;
        if buf.is_empty() {
            return Ok(false);
        }
        let ws = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
        if ws < buf.len() {
            let first = buf[ws];
            r.consume(ws);
            return Ok(first == b'{' || first == b'[');
        }
        let n = buf.len();
        r.consume(n);
    }
}

fn is_blank(doc: &str) -> bool {
    doc.lines().all(|l| {
        let t = l.trim();
        t.is_empty() || t.starts_with('#')
    })
}

/// Next `---`-separated YAML document, or `None` at end of input.
fn read_yaml_document<R: BufRead>(r: &mut R) -> io::Result<Option<String>> {
    let mut doc = String::new();
    let mut line = String::new();
    let mut started = false;
    loop {
        line.clear();
        if r.read_line(&mut line)? == 0 {
            return Ok(started.then_some(doc));
        }
        started = true;
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed.starts_with("--- ") {
            if !is_blank(&doc) {
                return Ok(Some(doc));
            }
            doc.clear();
            if let Some(rest) = trimmed.strip_prefix("--- ") {
                doc.push_str(rest);
                doc.push('\n');
            }
            continue;
        }
        if trimmed == "..." {
            continue;
        }
        doc.push_str(&line);
    }
}

fn is_list(obj: &Map<String, Json>) -> bool {
    let kind = obj.get("kind").and_then(|k| k.as_str()).unwrap_or("");
    kind.ends_with("List") && obj.get("items").is_some_and(|i| i.is_array())
}

fn to_object(mut obj: Map<String, Json>) -> Result<DynamicObject> {
    obj.entry("metadata").or_insert_with(|| Json::Object(Map::new()));
    serde_json::from_value(Json::Object(obj)).context("decoding object")
}

impl<R: BufRead> Documents<R> {
    fn next_value(&mut self) -> Result<Option<Json>> {
        loop {
            match std::mem::replace(&mut self.source, Source::Done) {
                Source::Sniff(mut r) => {
                    self.source = if sniff_json(&mut r).context("reading input")? {
                        Source::Json(serde_json::Deserializer::from_reader(r).into_iter())
                    } else {
                        Source::Yaml(r)
                    };
                }
                Source::Json(mut stream) => match stream.next() {
                    None => return Ok(None),
                    Some(res) => {
                        let value = res.with_context(|| format!("decoding JSON document {}", self.index))?;
                        self.source = Source::Json(stream);
                        return Ok(Some(value));
                    }
                },
                Source::Yaml(mut r) => {
                    let Some(doc) = read_yaml_document(&mut r).context("reading input")? else {
                        return Ok(None);
                    };
                    self.source = Source::Yaml(r);
                    if is_blank(&doc) {
                        continue;
                    }
                    let value = serde_yaml::from_str(&doc)
                        .with_context(|| format!("decoding YAML document {}", self.index))?;
                    return Ok(Some(value));
                }
                Source::Done => return Ok(None),
            }
        }
    }

    fn enqueue(&mut self, value: Json) -> Result<()> {
        match value {
            Json::Null => Ok(()),
            Json::Array(items) => items.into_iter().try_for_each(|v| self.enqueue(v)),
            Json::Object(obj) if obj.is_empty() => Ok(()),
            Json::Object(mut obj) if is_list(&obj) => {
                let api_version = obj.get("apiVersion").cloned();
                let item_kind = obj
                    .get("kind")
                    .and_then(|k| k.as_str())
                    .and_then(|k| k.strip_suffix("List"))
                    .filter(|k| !k.is_empty())
                    .map(str::to_string);
                let Some(Json::Array(items)) = obj.remove("items") else { return Ok(()) };
                for item in items {
                    let Json::Object(mut item) = item else { continue };
                    if item.is_empty() {
                        continue;
                    }
                    // typed lists (PodList) may omit the item kind
                    if let Some(kind) = &item_kind {
                        item.entry("kind").or_insert_with(|| Json::String(kind.clone()));
                        if let Some(av) = &api_version {
                            item.entry("apiVersion").or_insert_with(|| av.clone());
                        }
                    }
                    self.pending.push_back(to_object(item)?);
                }
                Ok(())
            }
            Json::Object(obj) => {
                self.pending.push_back(to_object(obj)?);
                Ok(())
            }
            other => bail!("document {} is not an object: {}", self.index, other),
        }
    }
}

impl<R: BufRead> Iterator for Documents<R> {
    type Item = Result<DynamicObject>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(obj) = self.pending.pop_front() {
                return Some(Ok(obj));
            }
            let step = self.next_value().and_then(|v| match v {
                Some(v) => {
                    let res = self.enqueue(v);
                    self.index += 1;
                    res.map(|_| true)
                }
                None => Ok(false),
            });
            match step {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(err) => {
                    self.source = Source::Done;
                    self.pending.clear();
                    return Some(Err(err));
                }
            }
        }
    }
}
