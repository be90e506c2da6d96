use jsonpull::{Error, JsonReader, JsonToken, StringSource};

fn lenient(text: &str) -> JsonReader<StringSource> {
    let mut r = JsonReader::new(StringSource::new(text));
    r.set_lenient(true);
    r
}

fn strict(text: &str) -> JsonReader<StringSource> {
    JsonReader::new(StringSource::new(text))
}

#[test]
fn non_execute_prefix_with_unquoted_names() {
    let mut r = lenient(")]}'\n{a:1,b:2,}");
    r.begin_object().unwrap();
    assert_eq!(r.peek().unwrap(), JsonToken::Name);
    assert_eq!(r.next_name().unwrap(), "a");
    assert_eq!(r.next_i64().unwrap(), 1);
    assert_eq!(r.next_name().unwrap(), "b");
    assert_eq!(r.next_i64().unwrap(), 2);
    assert!(!r.has_next().unwrap());
    r.end_object().unwrap();
    assert_eq!(r.peek().unwrap(), JsonToken::EndDocument);
}

#[test]
fn strict_rejects_the_non_execute_prefix() {
    let mut r = strict(")]}'\n{}");
    assert!(matches!(r.peek().unwrap_err(), Error::Malformed { .. }));
}

#[test]
fn comments_are_whitespace() {
    let mut r = lenient("[// line\n1, /* block */ 2, # hash\n3]");
    r.begin_array().unwrap();
    assert_eq!(r.next_i64().unwrap(), 1);
    assert_eq!(r.next_i64().unwrap(), 2);
    assert_eq!(r.next_i64().unwrap(), 3);
    r.end_array().unwrap();
}

#[test]
fn block_comments_do_not_nest() {
    let mut r = lenient("[/* outer /* inner */ 1]");
    r.begin_array().unwrap();
    assert_eq!(r.next_i64().unwrap(), 1);
    r.end_array().unwrap();
}

#[test]
fn unterminated_comment_fails() {
    let mut r = lenient("[/* no end");
    r.begin_array().unwrap();
    let err = r.peek().unwrap_err();
    assert!(err.is_unexpected_eof());
    assert!(err.to_string().contains("Unterminated comment"));
}

#[test]
fn strict_rejects_comments() {
    let mut r = strict("[// nope\n1]");
    r.begin_array().unwrap();
    assert!(matches!(r.peek().unwrap_err(), Error::Malformed { .. }));
}

#[test]
fn single_quoted_strings_and_names() {
    let mut r = lenient("{'a': 'one'}");
    r.begin_object().unwrap();
    assert_eq!(r.next_name().unwrap(), "a");
    assert_eq!(r.next_string().unwrap(), "one");
    r.end_object().unwrap();

    let mut r = strict("['a']");
    r.begin_array().unwrap();
    assert!(matches!(r.peek().unwrap_err(), Error::Malformed { .. }));
}

#[test]
fn unquoted_strings() {
    let mut r = lenient("[hello, world]");
    r.begin_array().unwrap();
    assert_eq!(r.next_string().unwrap(), "hello");
    assert_eq!(r.next_string().unwrap(), "world");
    r.end_array().unwrap();
}

#[test]
fn semicolons_separate_elements_and_members() {
    let mut r = lenient("[1; 2]");
    r.begin_array().unwrap();
    assert_eq!(r.next_i64().unwrap(), 1);
    assert_eq!(r.next_i64().unwrap(), 2);
    r.end_array().unwrap();

    let mut r = lenient("{a:1; b:2}");
    r.begin_object().unwrap();
    assert_eq!(r.next_name().unwrap(), "a");
    assert_eq!(r.next_i64().unwrap(), 1);
    assert_eq!(r.next_name().unwrap(), "b");
    assert_eq!(r.next_i64().unwrap(), 2);
    r.end_object().unwrap();
}

#[test]
fn arrow_separators_between_names_and_values() {
    let mut r = lenient("{a=1, b=>2}");
    r.begin_object().unwrap();
    assert_eq!(r.next_name().unwrap(), "a");
    assert_eq!(r.next_i64().unwrap(), 1);
    assert_eq!(r.next_name().unwrap(), "b");
    assert_eq!(r.next_i64().unwrap(), 2);
    r.end_object().unwrap();
}

#[test]
fn omitted_array_values_read_as_null() {
    let mut r = lenient("[,,]");
    r.begin_array().unwrap();
    r.next_null().unwrap();
    r.next_null().unwrap();
    r.next_null().unwrap();
    r.end_array().unwrap();

    let mut r = lenient("[1,,2]");
    r.begin_array().unwrap();
    assert_eq!(r.next_i64().unwrap(), 1);
    r.next_null().unwrap();
    assert_eq!(r.next_i64().unwrap(), 2);
    r.end_array().unwrap();
}

#[test]
fn strict_rejects_omitted_array_values() {
    let mut r = strict("[1,,2]");
    r.begin_array().unwrap();
    r.next_i64().unwrap();
    assert!(matches!(r.peek().unwrap_err(), Error::Malformed { .. }));
}

#[test]
fn nan_and_infinities_parse_in_lenient_mode() {
    let mut r = lenient("[NaN, Infinity, -Infinity]");
    r.begin_array().unwrap();
    assert!(r.next_f64().unwrap().is_nan());
    assert_eq!(r.next_f64().unwrap(), f64::INFINITY);
    assert_eq!(r.next_f64().unwrap(), f64::NEG_INFINITY);
    r.end_array().unwrap();
}

#[test]
fn strict_rejects_non_finite_numbers() {
    let mut r = strict("[NaN]");
    r.begin_array().unwrap();
    assert!(matches!(r.peek().unwrap_err(), Error::Malformed { .. }));

    // Even when quoted, a non-finite double is rejected in strict mode.
    let mut r = strict("[\"NaN\"]");
    r.begin_array().unwrap();
    let err = r.next_f64().unwrap_err();
    assert!(err.to_string().contains("JSON forbids NaN"));
}

#[test]
fn quoted_nan_parses_in_lenient_mode() {
    let mut r = lenient("[\"NaN\"]");
    r.begin_array().unwrap();
    assert!(r.next_f64().unwrap().is_nan());
    r.end_array().unwrap();
}

#[test]
fn multiple_top_level_values() {
    let mut r = lenient("{} [] true");
    r.begin_object().unwrap();
    r.end_object().unwrap();
    r.begin_array().unwrap();
    r.end_array().unwrap();
    assert!(r.next_bool().unwrap());
    assert_eq!(r.peek().unwrap(), JsonToken::EndDocument);
}

#[test]
fn keywords_match_case_insensitively_only_when_lenient() {
    let mut r = lenient("[TRUE, False, NULL]");
    r.begin_array().unwrap();
    assert!(r.next_bool().unwrap());
    assert!(!r.next_bool().unwrap());
    r.next_null().unwrap();
    r.end_array().unwrap();

    let mut r = strict("[TRUE]");
    r.begin_array().unwrap();
    assert!(matches!(r.peek().unwrap_err(), Error::Malformed { .. }));
}

#[test]
fn keyword_prefixes_are_not_keywords() {
    let mut r = lenient("[truest, nullsoft]");
    r.begin_array().unwrap();
    assert_eq!(r.peek().unwrap(), JsonToken::String);
    assert_eq!(r.next_string().unwrap(), "truest");
    assert_eq!(r.next_string().unwrap(), "nullsoft");
    r.end_array().unwrap();
}

#[test]
fn oversized_number_literal_becomes_a_string() {
    let digits = "123456789".repeat(250);
    let text = format!("[{digits}]");

    let mut r = lenient(&text);
    r.begin_array().unwrap();
    assert_eq!(r.peek().unwrap(), JsonToken::String);
    assert_eq!(r.next_string().unwrap(), digits);
    r.end_array().unwrap();

    let mut r = strict(&text);
    r.begin_array().unwrap();
    assert!(matches!(r.peek().unwrap_err(), Error::Malformed { .. }));
}

#[test]
fn strict_errors_suggest_lenient_mode() {
    let mut r = strict("{a: 1}");
    r.begin_object().unwrap();
    let err = r.peek().unwrap_err();
    assert!(err.to_string().contains("set_lenient"), "got: {err}");
}
