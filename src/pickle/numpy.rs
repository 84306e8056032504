//! NumPy arrays inside pickle streams.
//!
//! NumPy pickles an `ndarray` as a call to `_reconstruct` followed by a
//! `BUILD` whose state is `(version, shape, dtype, is_fortran, raw)`, or (for
//! protocol 5) as `_frombuffer(buffer, dtype, shape, order)`. Scalars go
//! through `multiarray.scalar(dtype, raw)`.

use super::{PickleError, Value};
use crate::models::Array;

/// Element type described by a `numpy.dtype` object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DType {
    kind: char,
    size: usize,
    big_endian: bool,
}

impl DType {
    fn from_value(value: &Value) -> Result<Self, PickleError> {
        let (args, state) = match value {
            Value::Object { class, args, state } if is_numpy(class, "dtype") => (args, state),
            other => {
                return Err(PickleError::Numpy(format!(
                    "expected dtype, found {}",
                    other.type_name()
                )))
            }
        };

        let code = match args.first() {
            Some(Value::String(code)) => code.as_str(),
            _ => return Err(PickleError::Numpy("dtype without type code".to_string())),
        };
        let mut chars = code.chars();
        let kind = chars
            .next()
            .ok_or_else(|| PickleError::Numpy("empty dtype code".to_string()))?;
        let size = chars
            .as_str()
            .parse::<usize>()
            .map_err(|_| PickleError::Numpy(format!("unsupported dtype {:?}", code)))?;

        // state = (version, byteorder, subarray, names, fields, elsize, alignment, flags)
        let big_endian = match state.as_deref() {
            Some(Value::Tuple(items)) => matches!(items.get(1), Some(Value::String(o)) if o == ">"),
            _ => false,
        };

        let dtype = Self {
            kind,
            size,
            big_endian,
        };
        match (kind, size) {
            ('b', 1) | ('i', 1 | 2 | 4 | 8) | ('u', 1 | 2 | 4 | 8) | ('f', 4 | 8) | ('O', _) => {
                Ok(dtype)
            }
            _ => Err(PickleError::Numpy(format!("unsupported dtype {:?}", code))),
        }
    }

    fn is_object(&self) -> bool {
        self.kind == 'O'
    }

    fn decode(&self, raw: &[u8]) -> Result<Vec<f64>, PickleError> {
        if raw.len() % self.size != 0 {
            return Err(PickleError::Numpy(format!(
                "{} bytes is not a whole number of {}-byte elements",
                raw.len(),
                self.size
            )));
        }
        raw.chunks_exact(self.size)
            .map(|chunk| self.decode_one(chunk))
            .collect()
    }

    fn decode_one(&self, chunk: &[u8]) -> Result<f64, PickleError> {
        macro_rules! read {
            ($ty:ty) => {{
                let bytes = chunk
                    .try_into()
                    .map_err(|_| PickleError::Numpy("short element".to_string()))?;
                if self.big_endian {
                    <$ty>::from_be_bytes(bytes) as f64
                } else {
                    <$ty>::from_le_bytes(bytes) as f64
                }
            }};
        }

        Ok(match (self.kind, self.size) {
            ('b', 1) => f64::from(u8::from(chunk[0] != 0)),
            ('i', 1) => read!(i8),
            ('i', 2) => read!(i16),
            ('i', 4) => read!(i32),
            ('i', 8) => read!(i64),
            ('u', 1) => read!(u8),
            ('u', 2) => read!(u16),
            ('u', 4) => read!(u32),
            ('u', 8) => read!(u64),
            ('f', 4) => read!(f32),
            ('f', 8) => read!(f64),
            (kind, size) => {
                return Err(PickleError::Numpy(format!(
                    "unsupported dtype {}{}",
                    kind, size
                )))
            }
        })
    }
}

/// Returns true when `class` names `numpy[...].<name>`.
fn is_numpy(class: &Value, name: &str) -> bool {
    matches!(class.as_global(), Some((module, n)) if n == name && module.starts_with("numpy"))
}

/// Convert a NumPy array or scalar object into an [`Array`].
///
/// Returns `Ok(None)` for values that are not NumPy objects.
pub fn to_array(value: &Value) -> Result<Option<Array>, PickleError> {
    let Value::Object { class, args, state } = value else {
        return Ok(None);
    };

    if is_numpy(class, "_reconstruct") {
        let state = state
            .as_deref()
            .ok_or_else(|| PickleError::Numpy("ndarray without state".to_string()))?;
        return reconstruct(state).map(Some);
    }

    if is_numpy(class, "_frombuffer") {
        return match args.as_slice() {
            [buffer, dtype, shape, order] => {
                let dtype = DType::from_value(dtype)?;
                let shape = shape_from_value(shape)?;
                let fortran = matches!(order, Value::String(o) if o == "F");
                let data = dtype.decode(&raw_bytes(buffer)?)?;
                build(shape, data, fortran).map(Some)
            }
            _ => Err(PickleError::Numpy("bad _frombuffer arguments".to_string())),
        };
    }

    if is_numpy(class, "scalar") {
        return match args.as_slice() {
            [dtype, raw, ..] => {
                let dtype = DType::from_value(dtype)?;
                let data = dtype.decode(&raw_bytes(raw)?)?;
                build(Vec::new(), data, false).map(Some)
            }
            _ => Err(PickleError::Numpy("bad scalar arguments".to_string())),
        };
    }

    Ok(None)
}

/// Apply an ndarray `BUILD` state.
fn reconstruct(state: &Value) -> Result<Array, PickleError> {
    let items = match state {
        Value::Tuple(items) => items.as_slice(),
        other => {
            return Err(PickleError::Numpy(format!(
                "ndarray state is {}",
                other.type_name()
            )))
        }
    };

    // Version 1 prefixes the state with an int; version 0 omits it.
    let (shape, dtype, fortran, raw) = match items {
        [_, shape, dtype, fortran, raw] | [shape, dtype, fortran, raw] => {
            (shape, dtype, fortran, raw)
        }
        _ => return Err(PickleError::Numpy("ndarray state has wrong arity".to_string())),
    };

    let shape = shape_from_value(shape)?;
    let dtype = DType::from_value(dtype)?;
    let fortran = matches!(fortran, Value::Bool(true) | Value::Int(1));

    let data = if dtype.is_object() {
        object_elements(raw)?
    } else {
        dtype.decode(&raw_bytes(raw)?)?
    };
    build(shape, data, fortran)
}

fn build(shape: Vec<usize>, data: Vec<f64>, fortran: bool) -> Result<Array, PickleError> {
    let expected: usize = shape.iter().product();
    if expected != data.len() {
        return Err(PickleError::Numpy(format!(
            "shape {:?} needs {} elements, found {}",
            shape,
            expected,
            data.len()
        )));
    }
    let data = if fortran && shape.len() > 1 {
        fortran_to_c(&shape, &data)
    } else {
        data
    };
    Array::new(shape, data).map_err(|e| PickleError::Numpy(e.to_string()))
}

/// Re-lay a column-major buffer in row-major order.
fn fortran_to_c(shape: &[usize], data: &[f64]) -> Vec<f64> {
    let mut strides = Vec::with_capacity(shape.len());
    let mut stride = 1;
    for &dim in shape {
        strides.push(stride);
        stride *= dim;
    }

    let mut out = Vec::with_capacity(data.len());
    let mut index = vec![0usize; shape.len()];
    for _ in 0..data.len() {
        let offset: usize = index.iter().zip(&strides).map(|(i, s)| i * s).sum();
        out.push(data[offset]);

        // Advance the row-major multi-index.
        for axis in (0..shape.len()).rev() {
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
    out
}

fn shape_from_value(value: &Value) -> Result<Vec<usize>, PickleError> {
    let dims = match value {
        Value::Tuple(items) | Value::List(items) => items.as_slice(),
        Value::Int(_) => std::slice::from_ref(value),
        other => {
            return Err(PickleError::Numpy(format!(
                "shape is {}",
                other.type_name()
            )))
        }
    };
    dims.iter()
        .map(|d| match d {
            Value::Int(n) => {
                usize::try_from(*n).map_err(|_| PickleError::Numpy(format!("dimension {}", n)))
            }
            other => Err(PickleError::Numpy(format!(
                "dimension is {}",
                other.type_name()
            ))),
        })
        .collect()
}

/// Raw element bytes in any of the encodings pickle protocols use.
fn raw_bytes(value: &Value) -> Result<Vec<u8>, PickleError> {
    match value {
        Value::Bytes(bytes) => Ok(bytes.clone()),
        // Python 2 `str` payloads, decoded byte-for-byte.
        Value::String(text) => latin1_bytes(text),
        Value::Object { class, args, .. } => match (class.as_global(), args.as_slice()) {
            // Protocol 2 spells `bytes` as `_codecs.encode(text, "latin1")`.
            (Some(("_codecs", "encode")), [Value::String(text), ..]) => latin1_bytes(text),
            (Some(("builtins" | "__builtin__", "bytes" | "bytearray")), []) => Ok(Vec::new()),
            (Some(("builtins" | "__builtin__", "bytearray")), [inner, ..]) => raw_bytes(inner),
            _ => Err(PickleError::Numpy(format!(
                "raw data is {}",
                value.type_name()
            ))),
        },
        other => Err(PickleError::Numpy(format!(
            "raw data is {}",
            other.type_name()
        ))),
    }
}

fn latin1_bytes(text: &str) -> Result<Vec<u8>, PickleError> {
    text.chars()
        .map(|c| {
            u8::try_from(u32::from(c))
                .map_err(|_| PickleError::Numpy("non-latin1 character in raw data".to_string()))
        })
        .collect()
}

/// Elements of an object-dtype array, pickled as a list of Python objects.
fn object_elements(raw: &Value) -> Result<Vec<f64>, PickleError> {
    let items = match raw {
        Value::List(items) | Value::Tuple(items) => items,
        other => {
            return Err(PickleError::Numpy(format!(
                "object array data is {}",
                other.type_name()
            )))
        }
    };
    items
        .iter()
        .map(|item| match item {
            Value::Int(n) => Ok(*n as f64),
            Value::Float(x) => Ok(*x),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            other => match to_array(other)? {
                Some(array) if array.data.len() == 1 => Ok(array.data[0]),
                _ => Err(PickleError::Numpy(format!(
                    "object array element is {}",
                    other.type_name()
                ))),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pickle::{fixtures, from_slice};

    fn decode_array(bytes: &[u8]) -> Array {
        let value = from_slice(bytes).unwrap();
        to_array(&value).unwrap().expect("numpy array")
    }

    #[test]
    fn test_float_scores_protocol_4() {
        let value = from_slice(fixtures::NUMPY_SCORES_P4).unwrap();
        let pred = to_array(value.get("pred").unwrap()).unwrap().unwrap();
        assert_eq!(pred.shape, vec![3, 2]);
        assert_eq!(pred.data, vec![0.9, 0.1, 0.2, 0.8, 0.4, 0.6]);

        let tgt = to_array(value.get("tgt").unwrap()).unwrap().unwrap();
        assert_eq!(tgt.shape, vec![3]);
        assert_eq!(tgt.data, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_codecs_encoded_protocol_2() {
        let value = from_slice(fixtures::NUMPY_LABELS_P2).unwrap();
        let pred = to_array(value.get("pred").unwrap()).unwrap().unwrap();
        let tgt = to_array(value.get("tgt").unwrap()).unwrap().unwrap();
        assert_eq!(pred.data, vec![0.0, 1.0, 1.0, 2.0]);
        assert_eq!(tgt.data, vec![0.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_fortran_order_is_relaid() {
        let expected = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

        let reconstructed = decode_array(fixtures::NUMPY_FORTRAN_P4);
        assert_eq!(reconstructed.shape, vec![2, 3]);
        assert_eq!(reconstructed.data, expected);

        let from_buffer = decode_array(fixtures::NUMPY_FORTRAN_P5);
        assert_eq!(from_buffer.shape, vec![2, 3]);
        assert_eq!(from_buffer.data, expected);
    }

    #[test]
    fn test_big_endian_float32() {
        let array = decode_array(fixtures::NUMPY_BIG_ENDIAN_F4);
        assert_eq!(array.data, vec![1.5, -2.0]);
    }

    #[test]
    fn test_bool_array() {
        let array = decode_array(fixtures::NUMPY_BOOL);
        assert_eq!(array.data, vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_plain_values_are_not_numpy() {
        assert!(to_array(&Value::Int(3)).unwrap().is_none());
        let value = from_slice(fixtures::DICT_P4).unwrap();
        assert!(to_array(&value).unwrap().is_none());
    }

    #[test]
    fn test_fortran_to_c_three_dims() {
        // shape (2, 2, 2), element value = 100*i + 10*j + k
        let shape = [2, 2, 2];
        let mut fortran = vec![0.0; 8];
        for i in 0..2 {
            for j in 0..2 {
                for k in 0..2 {
                    fortran[i + 2 * j + 4 * k] = (100 * i + 10 * j + k) as f64;
                }
            }
        }
        let c = fortran_to_c(&shape, &fortran);
        assert_eq!(c, vec![0.0, 1.0, 10.0, 11.0, 100.0, 101.0, 110.0, 111.0]);
    }

    #[test]
    fn test_size_mismatch_is_reported() {
        let err = build(vec![2, 2], vec![1.0; 3], false).unwrap_err();
        assert!(matches!(err, PickleError::Numpy(_)));
    }
}
