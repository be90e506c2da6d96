use jsonpull::{ConcurrentModification, OrderedMap};

#[test]
fn iteration_follows_insertion_order() {
    let mut map = OrderedMap::new();
    map.insert(String::from("b"), 2);
    map.insert(String::from("a"), 1);
    map.insert(String::from("c"), 3);
    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    assert_eq!(keys, ["b", "a", "c"]);

    map.remove(&String::from("a"));
    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    assert_eq!(keys, ["b", "c"]);

    // Push the map through a resize; the surviving order must still be the
    // insertion sequence minus removals.
    for i in 0..20 {
        map.insert(format!("k{i}"), 0);
    }
    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    let mut expected = vec!["b", "c"];
    let extra: Vec<String> = (0..20).map(|i| format!("k{i}")).collect();
    expected.extend(extra.iter().map(String::as_str));
    assert_eq!(keys, expected);
}

#[test]
fn insert_returns_the_previous_value_and_keeps_order() {
    let mut map = OrderedMap::new();
    assert_eq!(map.insert("a", 1), None);
    assert_eq!(map.insert("b", 2), None);
    assert_eq!(map.insert("a", 10), Some(1));
    assert_eq!(map.get(&"a"), Some(&10));
    let entries: Vec<(&str, i32)> = map.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(entries, [("a", 10), ("b", 2)]);
}

#[test]
fn lookup_and_removal() {
    let mut map = OrderedMap::new();
    for i in 0..50u32 {
        map.insert(i, i * 10);
    }
    assert_eq!(map.len(), 50);
    assert!(map.contains_key(&7));
    assert_eq!(map.get(&7), Some(&70));
    assert_eq!(map.remove(&7), Some(70));
    assert_eq!(map.remove(&7), None);
    assert!(!map.contains_key(&7));
    assert_eq!(map.len(), 49);
}

#[test]
fn get_mut_updates_in_place() {
    let mut map = OrderedMap::new();
    map.insert("hits", 0);
    if let Some(hits) = map.get_mut(&"hits") {
        *hits += 1;
    }
    assert_eq!(map.get(&"hits"), Some(&1));
}

#[test]
fn len_and_clear() {
    let mut map: OrderedMap<u32, u32> = (0..40).map(|i| (i, i)).collect();
    assert_eq!(map.len(), 40);
    assert!(!map.is_empty());
    map.clear();
    assert!(map.is_empty());
    assert_eq!(map.iter().count(), 0);
    map.insert(1, 1);
    assert_eq!(map.len(), 1);
}

#[test]
fn iterators_are_exact_size() {
    let map: OrderedMap<u32, u32> = (0..10).map(|i| (i, i)).collect();
    assert_eq!(map.iter().len(), 10);
    assert_eq!(map.keys().len(), 10);
    assert_eq!(map.values().len(), 10);
    let values: Vec<u32> = map.values().copied().collect();
    assert_eq!(values, (0..10).collect::<Vec<_>>());
}

#[test]
fn cursor_sees_a_quiescent_map() {
    let mut map = OrderedMap::new();
    map.insert("a", 1);
    map.insert("b", 2);

    let mut cursor = map.cursor();
    assert_eq!(cursor.next(&map).unwrap(), Some((&"a", &1)));
    assert_eq!(cursor.next(&map).unwrap(), Some((&"b", &2)));
    assert_eq!(cursor.next(&map).unwrap(), None);
}

#[test]
fn cursor_detects_insertion() {
    let mut map = OrderedMap::new();
    map.insert("a", 1);
    let mut cursor = map.cursor();
    map.insert("b", 2);
    assert_eq!(cursor.next(&map), Err(ConcurrentModification));
}

#[test]
fn cursor_detects_removal() {
    let mut map = OrderedMap::new();
    map.insert("a", 1);
    map.insert("b", 2);
    let mut cursor = map.cursor();
    assert_eq!(cursor.next(&map).unwrap(), Some((&"a", &1)));
    map.remove(&"a");
    assert_eq!(cursor.next(&map), Err(ConcurrentModification));
}

#[test]
fn cursor_survives_value_replacement() {
    let mut map = OrderedMap::new();
    map.insert("a", 1);
    let mut cursor = map.cursor();
    map.insert("a", 2);
    assert_eq!(cursor.next(&map).unwrap(), Some((&"a", &2)));
}

#[test]
fn growth_preserves_every_entry() {
    // Crossing the 3/4 threshold repeatedly exercises the bucket split.
    let mut map = OrderedMap::new();
    for i in 0..1000u32 {
        map.insert(format!("key-{i}"), i);
    }
    assert_eq!(map.len(), 1000);
    for i in 0..1000u32 {
        assert_eq!(map.get(&format!("key-{i}")), Some(&i));
    }
    let expected: Vec<String> = (0..1000).map(|i| format!("key-{i}")).collect();
    assert!(map.keys().eq(expected.iter()));
}

#[test]
fn debug_renders_as_a_map() {
    let mut map = OrderedMap::new();
    map.insert("a", 1);
    assert_eq!(format!("{map:?}"), r#"{"a": 1}"#);
}
