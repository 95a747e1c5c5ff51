use crate::types::InputStream;
use async_trait::async_trait;
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::{Map, Number, Value as JsonValue};
use serde_yaml::Value as YamlValue;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("failed to read input: {0}")]
    Read(#[from] std::io::Error),
    #[error("invalid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("cannot encode as JSON: {0}")]
    Encode(String),
}

/// Stream-in, bytes-out document conversion.
///
/// Implementations append the translated document to `sink`. On error the
/// contents of `sink` are unspecified and must be discarded by the caller.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        input: InputStream,
        sink: &mut Vec<u8>,
    ) -> Result<(), TranslateError>;
}

#[async_trait]
impl<T> Translator for Box<T>
where
    T: Translator + ?Sized,
{
    async fn translate(
        &self,
        input: InputStream,
        sink: &mut Vec<u8>,
    ) -> Result<(), TranslateError> {
        (**self).translate(input, sink).await
    }
}

#[async_trait]
impl<T> Translator for Arc<T>
where
    T: Translator + ?Sized,
{
    async fn translate(
        &self,
        input: InputStream,
        sink: &mut Vec<u8>,
    ) -> Result<(), TranslateError> {
        (**self).translate(input, sink).await
    }
}

/// YAML to JSON translator.
///
/// Every document of a multi-document stream is written as one line of
/// compact JSON. The whole input is read before decoding starts.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlToJson;

#[async_trait]
impl Translator for YamlToJson {
    async fn translate(
        &self,
        input: InputStream,
        sink: &mut Vec<u8>,
    ) -> Result<(), TranslateError> {
        let source = collect_input(input).await?;
        translate_slice(&source, sink)
    }
}

async fn collect_input(input: InputStream) -> Result<Vec<u8>, std::io::Error> {
    input
        .try_fold(Vec::new(), |mut buf, chunk| async move {
            buf.extend_from_slice(&chunk);
            Ok::<_, std::io::Error>(buf)
        })
        .await
}

/// Synchronous core of [`YamlToJson`].
///
/// # Examples
///
/// ```
/// use yaml2json_core::translate::translate_slice;
///
/// let mut out = Vec::new();
/// translate_slice(b"foo: bar\nbaz:\n  - qux\n  - quux\n", &mut out).unwrap();
/// assert_eq!(out, b"{\"baz\":[\"qux\",\"quux\"],\"foo\":\"bar\"}\n");
/// ```
pub fn translate_slice(source: &[u8], sink: &mut Vec<u8>) -> Result<(), TranslateError> {
    for document in serde_yaml::Deserializer::from_slice(source) {
        let mut value = YamlValue::deserialize(document)?;
        value.apply_merge()?;
        let json = yaml_to_json(value)?;
        serde_json::to_writer(&mut *sink, &json)
            .map_err(|e| TranslateError::Encode(e.to_string()))?;
        sink.push(b'\n');
    }
    Ok(())
}

fn yaml_to_json(value: YamlValue) -> Result<JsonValue, TranslateError> {
    Ok(match value {
        YamlValue::Null => JsonValue::Null,
        YamlValue::Bool(b) => JsonValue::Bool(b),
        YamlValue::Number(n) => JsonValue::Number(number_to_json(&n)?),
        YamlValue::String(s) => JsonValue::String(s),
        YamlValue::Sequence(items) => JsonValue::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<_, _>>()?,
        ),
        YamlValue::Mapping(mapping) => {
            let mut object = Map::new();
            for (k, v) in mapping {
                object.insert(key_to_string(k)?, yaml_to_json(v)?);
            }
            JsonValue::Object(object)
        }
        YamlValue::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn number_to_json(n: &serde_yaml::Number) -> Result<Number, TranslateError> {
    if let Some(i) = n.as_i64() {
        return Ok(Number::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Ok(Number::from(u));
    }
    n.as_f64()
        .and_then(Number::from_f64)
        .ok_or_else(|| TranslateError::Encode(format!("unsupported number {n}")))
}

// JSON object keys are strings; scalar YAML keys keep their textual form.
fn key_to_string(key: YamlValue) -> Result<String, TranslateError> {
    match key {
        YamlValue::String(s) => Ok(s),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        YamlValue::Null => Ok("null".to_string()),
        YamlValue::Tagged(tagged) => key_to_string(tagged.value),
        YamlValue::Sequence(_) | YamlValue::Mapping(_) => Err(TranslateError::Encode(
            "mapping key must be a scalar".to_string(),
        )),
    }
}
