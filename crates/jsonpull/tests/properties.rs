use jsonpull::{Error, JsonReader, JsonToken, StringSource};
use quickcheck::{Arbitrary, Gen, QuickCheck};
use serde_json::{Map, Number, Value};

fn test_count(heavy: usize, light: usize) -> u64 {
    let count = if is_ci::cached() { heavy } else { light };
    count as u64
}

/// An arbitrary JSON document, rendered through serde_json so the reader is
/// checked against an independent implementation.
#[derive(Clone, Debug)]
struct Doc(Value);

impl Arbitrary for Doc {
    fn arbitrary(g: &mut Gen) -> Self {
        Doc(arbitrary_value(g, 3))
    }
}

fn arbitrary_value(g: &mut Gen, depth: usize) -> Value {
    let choice = if depth == 0 {
        u8::arbitrary(g) % 5
    } else {
        u8::arbitrary(g) % 7
    };
    match choice {
        0 => Value::Null,
        1 => Value::Bool(bool::arbitrary(g)),
        2 => Value::Number(Number::from(i64::arbitrary(g))),
        3 => match Number::from_f64(f64::arbitrary(g)) {
            Some(n) => Value::Number(n),
            None => Value::Null, // NaN or infinity
        },
        4 => Value::String(String::arbitrary(g)),
        5 => {
            let len = usize::arbitrary(g) % 4;
            Value::Array((0..len).map(|_| arbitrary_value(g, depth - 1)).collect())
        }
        _ => {
            let len = usize::arbitrary(g) % 4;
            let mut members = Map::new();
            for i in 0..len {
                let key = format!("{}-{i}", String::arbitrary(g));
                members.insert(key, arbitrary_value(g, depth - 1));
            }
            Value::Object(members)
        }
    }
}

/// Consumes exactly the tokens of `value` from the reader, comparing every
/// scalar along the way.
fn walk(reader: &mut JsonReader<StringSource>, value: &Value) -> Result<(), Error> {
    match value {
        Value::Null => reader.next_null(),
        Value::Bool(expected) => {
            assert_eq!(reader.next_bool()?, *expected);
            Ok(())
        }
        Value::Number(expected) => {
            if let Some(n) = expected.as_i64() {
                assert_eq!(reader.next_i64()?, n);
            } else {
                let n = expected.as_f64().unwrap();
                assert_eq!(reader.next_f64()?, n);
            }
            Ok(())
        }
        Value::String(expected) => {
            assert_eq!(&reader.next_string()?, expected);
            Ok(())
        }
        Value::Array(items) => {
            reader.begin_array()?;
            for item in items {
                walk(reader, item)?;
            }
            assert!(!reader.has_next()?);
            reader.end_array()
        }
        Value::Object(members) => {
            reader.begin_object()?;
            for (key, member) in members {
                assert_eq!(&reader.next_name()?, key);
                walk(reader, member)?;
            }
            assert!(!reader.has_next()?);
            reader.end_object()
        }
    }
}

/// The reader must agree with serde_json on every document serde_json can
/// produce, regardless of how the input is chunked.
#[test]
fn differential_walk_against_serde_json() {
    fn prop(doc: Doc, chunk: usize) -> bool {
        let text = doc.0.to_string();
        let chunk = 1 + chunk % 64;
        let mut reader = JsonReader::new(StringSource::with_chunk_size(&text, chunk));
        walk(&mut reader, &doc.0).unwrap();
        reader.peek().unwrap() == JsonToken::EndDocument
    }

    QuickCheck::new()
        .tests(test_count(2_000, 300))
        .quickcheck(prop as fn(Doc, usize) -> bool);
}

/// `skip_value` advances past exactly one well-formed value.
#[test]
fn skip_value_advances_by_one_value() {
    fn prop(doc: Doc) -> bool {
        let text = format!("[{}, \"sentinel\"]", doc.0);
        let mut reader = JsonReader::new(StringSource::new(&text));
        reader.begin_array().unwrap();
        reader.skip_value().unwrap();
        if reader.next_string().unwrap() != "sentinel" {
            return false;
        }
        reader.end_array().unwrap();
        reader.peek().unwrap() == JsonToken::EndDocument
    }

    QuickCheck::new()
        .tests(test_count(2_000, 300))
        .quickcheck(prop as fn(Doc) -> bool);
}

/// Every i64 round-trips through a strictly parsed document, both exactly
/// and through the double representation.
#[test]
fn i64_round_trip() {
    fn prop(n: i64) -> bool {
        let text = n.to_string();
        let mut reader = JsonReader::new(StringSource::new(&text));
        if reader.next_i64().unwrap() != n {
            return false;
        }

        let mut reader = JsonReader::new(StringSource::new(&text));
        #[allow(clippy::cast_precision_loss)]
        let expected = n as f64;
        reader.next_f64().unwrap() == expected
    }

    QuickCheck::new()
        .tests(test_count(20_000, 2_000))
        .quickcheck(prop as fn(i64) -> bool);
}

/// Finite doubles rendered in their shortest form parse back bit-for-bit.
#[test]
fn f64_round_trip() {
    fn prop(n: f64) -> bool {
        if !n.is_finite() {
            return true;
        }
        let text = format!("{n:?}");
        let mut reader = JsonReader::new(StringSource::new(&text));
        reader.next_f64().unwrap().to_bits() == n.to_bits()
    }

    QuickCheck::new()
        .tests(test_count(20_000, 2_000))
        .quickcheck(prop as fn(f64) -> bool);
}

/// Tokenization is independent of how the source chunks its reads.
#[test]
fn chunking_does_not_change_tokens() {
    let text = r#"{"names": ["Alpha", "beta\n"], "count": 2, "ratio": -12.5e-1, "ok": true, "missing": null}"#;
    for chunk in 1..=8 {
        let mut r = JsonReader::new(StringSource::with_chunk_size(text, chunk));
        r.begin_object().unwrap();
        assert_eq!(r.next_name().unwrap(), "names");
        r.begin_array().unwrap();
        assert_eq!(r.next_string().unwrap(), "Alpha");
        assert_eq!(r.next_string().unwrap(), "beta\n");
        r.end_array().unwrap();
        assert_eq!(r.next_name().unwrap(), "count");
        assert_eq!(r.next_i64().unwrap(), 2);
        assert_eq!(r.next_name().unwrap(), "ratio");
        assert_eq!(r.next_f64().unwrap(), -1.25);
        assert_eq!(r.next_name().unwrap(), "ok");
        assert!(r.next_bool().unwrap());
        assert_eq!(r.next_name().unwrap(), "missing");
        r.next_null().unwrap();
        r.end_object().unwrap();
        assert_eq!(r.peek().unwrap(), JsonToken::EndDocument);
    }
}
