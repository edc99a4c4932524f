/*!
Codec providers: the dump/load pairs that turn one attribute into one region.

Codecs are type-erased. [`CodecProvider::dump`] receives the attribute as
`&dyn Any` and fails with [`ClassioError::ValueType`] when handed a value of
the wrong type; [`CodecProvider::load`] returns a boxed value that the record
constructor downcasts.
*/

use crate::compression::{CompressionAdapter, GzipCompressor};
use crate::{ClassioError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::any::{type_name, Any};
use std::fmt::Display;
use std::io::{Read, Write};
use std::marker::PhantomData;
use std::str::FromStr;

/// A stateless dump/load pair for one concrete type
pub trait CodecProvider: Send + Sync {
    /// Short name recorded in the container manifest
    fn name(&self) -> &str;

    /// Serialize `value` into `target`
    fn dump(&self, value: &dyn Any, target: &mut dyn Write) -> Result<()>;

    /// Deserialize a value from `source`
    fn load(&self, source: &mut dyn Read) -> Result<Box<dyn Any + Send>>;
}

fn downcast<'a, T: Any>(codec: &str, value: &'a dyn Any) -> Result<&'a T> {
    value.downcast_ref::<T>().ok_or_else(|| ClassioError::ValueType {
        codec: codec.to_string(),
        expected: type_name::<T>(),
    })
}

fn read_string(source: &mut dyn Read) -> Result<String> {
    let mut text = String::new();
    source.read_to_string(&mut text)?;
    Ok(text)
}

/// Plain UTF-8 text for `String` attributes
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl CodecProvider for TextCodec {
    fn name(&self) -> &str {
        "text"
    }

    fn dump(&self, value: &dyn Any, target: &mut dyn Write) -> Result<()> {
        let text = downcast::<String>(self.name(), value)?;
        target.write_all(text.as_bytes())?;
        Ok(())
    }

    fn load(&self, source: &mut dyn Read) -> Result<Box<dyn Any + Send>> {
        Ok(Box::new(read_string(source)?))
    }
}

/// Raw bytes for `Vec<u8>` attributes
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl CodecProvider for BytesCodec {
    fn name(&self) -> &str {
        "bytes"
    }

    fn dump(&self, value: &dyn Any, target: &mut dyn Write) -> Result<()> {
        let data = downcast::<Vec<u8>>(self.name(), value)?;
        target.write_all(data)?;
        Ok(())
    }

    fn load(&self, source: &mut dyn Read) -> Result<Box<dyn Any + Send>> {
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        Ok(Box::new(data))
    }
}

/// Numbers, booleans and chars written in their `Display` form
pub struct PrimitiveCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> PrimitiveCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for PrimitiveCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CodecProvider for PrimitiveCodec<T>
where
    T: Display + FromStr + Send + 'static,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "primitive"
    }

    fn dump(&self, value: &dyn Any, target: &mut dyn Write) -> Result<()> {
        let value = downcast::<T>(self.name(), value)?;
        write!(target, "{value}")?;
        Ok(())
    }

    fn load(&self, source: &mut dyn Read) -> Result<Box<dyn Any + Send>> {
        let text = read_string(source)?;
        // Regions hold exactly what `Display` wrote; whitespace is significant for `char`
        let value = text.parse::<T>().map_err(ClassioError::codec)?;
        Ok(Box::new(value))
    }
}

/// JSON through serde, for mappings, sequences and `serde_json::Value`
pub struct JsonCodec<T> {
    pretty: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            pretty: false,
            _marker: PhantomData,
        }
    }

    /// Indented output, easier to read when inspecting a container by hand
    pub fn pretty() -> Self {
        Self {
            pretty: true,
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CodecProvider for JsonCodec<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    fn name(&self) -> &str {
        "json"
    }

    fn dump(&self, value: &dyn Any, target: &mut dyn Write) -> Result<()> {
        let value = downcast::<T>(self.name(), value)?;
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        // Non-finite floats are written as `null`, which `T` may not accept back
        serde_json::from_slice::<T>(&encoded).map_err(|e| {
            ClassioError::codec(format!(
                "{} does not read back from its JSON form: {e}",
                type_name::<T>()
            ))
        })?;
        target.write_all(&encoded)?;
        Ok(())
    }

    fn load(&self, source: &mut dyn Read) -> Result<Box<dyn Any + Send>> {
        let value: T = serde_json::from_reader(source)?;
        Ok(Box::new(value))
    }
}

/// A schema-validated model that serializes itself
///
/// Implementing the trait is enough to make a type usable as an attribute
/// annotated with [`crate::Annotation::model`]; the default hooks write JSON.
pub trait SchemaModel: Serialize + DeserializeOwned + Send + 'static {
    /// Write the model
    fn dump_model(&self, target: &mut dyn Write) -> Result<()> {
        serde_json::to_writer(target, self)?;
        Ok(())
    }

    /// Read and validate the model
    fn load_model(source: &mut dyn Read) -> Result<Self> {
        Ok(serde_json::from_reader(source)?)
    }
}

/// Adapter calling a [`SchemaModel`]'s own hooks
pub struct ModelCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> ModelCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for ModelCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SchemaModel> CodecProvider for ModelCodec<T> {
    fn name(&self) -> &str {
        "model"
    }

    fn dump(&self, value: &dyn Any, target: &mut dyn Write) -> Result<()> {
        downcast::<T>(self.name(), value)?.dump_model(target)
    }

    fn load(&self, source: &mut dyn Read) -> Result<Box<dyn Any + Send>> {
        Ok(Box::new(T::load_model(source)?))
    }
}

/// Gzip around another codec's output
///
/// # Example
/// ```rust
/// use classio_core::codecs::{BytesCodec, Compressed};
///
/// let codec = Compressed::new(BytesCodec);
/// # let _ = codec;
/// ```
pub struct Compressed<C> {
    inner: C,
    compressor: GzipCompressor,
    name: String,
}

impl<C: CodecProvider> Compressed<C> {
    pub fn new(inner: C) -> Self {
        Self::with_compressor(inner, GzipCompressor::new())
    }

    pub fn with_compressor(inner: C, compressor: GzipCompressor) -> Self {
        let name = format!("{}+{}", inner.name(), compressor.algorithm_name());
        Self {
            inner,
            compressor,
            name,
        }
    }
}

impl<C: CodecProvider> CodecProvider for Compressed<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn dump(&self, value: &dyn Any, target: &mut dyn Write) -> Result<()> {
        let mut plain = Vec::new();
        self.inner.dump(value, &mut plain)?;
        target.write_all(&self.compressor.compress(&plain)?)?;
        Ok(())
    }

    fn load(&self, source: &mut dyn Read) -> Result<Box<dyn Any + Send>> {
        let mut packed = Vec::new();
        source.read_to_end(&mut packed)?;
        let plain = self.compressor.decompress(&packed)?;
        self.inner.load(&mut plain.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    fn dump_to_vec(codec: &dyn CodecProvider, value: &dyn Any) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        codec.dump(value, &mut out)?;
        Ok(out)
    }

    fn load_as<T: Any>(codec: &dyn CodecProvider, bytes: &[u8]) -> T {
        let mut source = bytes;
        *codec.load(&mut source).unwrap().downcast::<T>().unwrap()
    }

    #[test]
    fn test_text_codec() {
        let codec = TextCodec;
        let bytes = dump_to_vec(&codec, &"Iris data logistic regression.".to_string()).unwrap();
        assert_eq!(bytes, b"Iris data logistic regression.");
        assert_eq!(
            load_as::<String>(&codec, &bytes),
            "Iris data logistic regression."
        );
    }

    #[test]
    fn test_text_codec_rejects_invalid_utf8() {
        let mut source: &[u8] = &[0xff, 0xfe];
        assert!(matches!(TextCodec.load(&mut source), Err(ClassioError::Io(_))));
    }

    #[test]
    fn test_value_type_mismatch() {
        let err = dump_to_vec(&TextCodec, &42i64).unwrap_err();
        match err {
            ClassioError::ValueType { codec, expected } => {
                assert_eq!(codec, "text");
                assert!(expected.contains("String"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_primitive_codec() {
        let codec = PrimitiveCodec::<i64>::new();
        let bytes = dump_to_vec(&codec, &3i64).unwrap();
        assert_eq!(bytes, b"3");
        assert_eq!(load_as::<i64>(&codec, b"3"), 3);
        assert_eq!(load_as::<i64>(&codec, b"-17"), -17);

        let codec = PrimitiveCodec::<f64>::new();
        let bytes = dump_to_vec(&codec, &0.13f64).unwrap();
        assert_eq!(load_as::<f64>(&codec, &bytes), 0.13);

        let codec = PrimitiveCodec::<bool>::new();
        assert!(load_as::<bool>(&codec, b"true"));
    }

    #[test]
    fn test_primitive_codec_whitespace_char() {
        let codec = PrimitiveCodec::<char>::new();
        for sep in [' ', '\n', '\t', 'x'] {
            let bytes = dump_to_vec(&codec, &sep).unwrap();
            assert_eq!(load_as::<char>(&codec, &bytes), sep);
        }
    }

    #[test]
    fn test_primitive_codec_parse_error() {
        let codec = PrimitiveCodec::<u32>::new();
        let mut source: &[u8] = b"not a number";
        assert!(matches!(codec.load(&mut source), Err(ClassioError::Codec(_))));
    }

    #[test]
    fn test_json_codec_mapping() {
        let codec = JsonCodec::<HashMap<String, String>>::new();
        let config = HashMap::from([("a".to_string(), "1".to_string())]);
        let bytes = dump_to_vec(&codec, &config).unwrap();
        assert_eq!(bytes, br#"{"a":"1"}"#);
        assert_eq!(load_as::<HashMap<String, String>>(&codec, &bytes), config);
    }

    #[test]
    fn test_json_codec_pretty() {
        let codec = JsonCodec::<Vec<i64>>::pretty();
        let bytes = dump_to_vec(&codec, &vec![1i64, 2]).unwrap();
        assert!(bytes.contains(&b'\n'));
        assert_eq!(load_as::<Vec<i64>>(&codec, &bytes), vec![1, 2]);
    }

    #[test]
    fn test_json_codec_rejects_non_finite_floats() {
        let codec = JsonCodec::<Vec<f64>>::new();
        let mut out = Vec::new();
        match codec.dump(&vec![1.0, f64::NAN], &mut out) {
            Err(ClassioError::Codec(e)) => assert!(e.to_string().contains("read back")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(out.is_empty());

        let codec = JsonCodec::<HashMap<String, f64>>::new();
        let readings = HashMap::from([("peak".to_string(), f64::INFINITY)]);
        assert!(codec.dump(&readings, &mut out).is_err());

        let codec = JsonCodec::<Vec<f64>>::new();
        let bytes = dump_to_vec(&codec, &vec![1.5, -0.25]).unwrap();
        assert_eq!(load_as::<Vec<f64>>(&codec, &bytes), vec![1.5, -0.25]);
    }

    #[test]
    fn test_json_codec_malformed_source() {
        let codec = JsonCodec::<HashMap<String, String>>::new();
        let mut source: &[u8] = b"{\"a\":";
        assert!(matches!(codec.load(&mut source), Err(ClassioError::Json(_))));
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct StockPosition {
        ticker: String,
        balance: i64,
    }

    impl SchemaModel for StockPosition {}

    #[test]
    fn test_model_codec_uses_model_hooks() {
        let codec = ModelCodec::<StockPosition>::new();
        let position = StockPosition {
            ticker: "AAPL".to_string(),
            balance: 10,
        };
        let bytes = dump_to_vec(&codec, &position).unwrap();
        assert_eq!(load_as::<StockPosition>(&codec, &bytes), position);
    }

    #[test]
    fn test_compressed_codec() {
        let codec = Compressed::new(BytesCodec);
        assert_eq!(codec.name(), "bytes+gzip");

        let payload = b"0123456789".repeat(100);
        let bytes = dump_to_vec(&codec, &payload).unwrap();
        assert!(bytes.len() < payload.len());
        assert_eq!(load_as::<Vec<u8>>(&codec, &bytes), payload);
    }
}
