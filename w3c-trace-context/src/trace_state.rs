use crate::error::TraceStateError;
use crate::tc_debug;
use std::collections::{HashSet, VecDeque};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Maximum number of list members a `TraceState` holds.
pub const MAX_LIST_MEMBERS: usize = 32;

const MAX_SIMPLE_KEY_LEN: usize = 256;
const MAX_TENANT_ID_LEN: usize = 241;
const MAX_SYSTEM_ID_LEN: usize = 14;
const MAX_VALUE_LEN: usize = 256;

// List members longer than this are the first to go when a header has to be
// shortened, see https://www.w3.org/TR/trace-context/#tracestate-limits
const LARGE_MEMBER_LEN: usize = 128;

/// TraceState carries system-specific configuration data, represented as a list
/// of key-value pairs. TraceState allows multiple tracing systems to
/// participate in the same trace.
///
/// The list is ordered: the first member is the most recently written one.
/// Keys are unique and the list never holds more than [`MAX_LIST_MEMBERS`]
/// members.
///
/// Please review the [W3C specification] for details on this field.
///
/// [W3C specification]: https://www.w3.org/TR/trace-context/#tracestate-header
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct TraceState(VecDeque<(String, String)>);

impl TraceState {
    /// The default `TraceState`, as a constant
    pub const NONE: TraceState = TraceState(VecDeque::new());

    /// Validates that the given `TraceState` list-member key is valid per the [W3 Spec].
    ///
    /// [W3 Spec]: https://www.w3.org/TR/trace-context/#key
    fn valid_key(key: &str) -> bool {
        match key.split_once('@') {
            None => valid_key_segment(key, MAX_SIMPLE_KEY_LEN, true),
            Some((tenant, system)) => {
                valid_key_segment(tenant, MAX_TENANT_ID_LEN, true)
                    && valid_key_segment(system, MAX_SYSTEM_ID_LEN, false)
            }
        }
    }

    /// Validates that the given `TraceState` list-member value is valid per the [W3 Spec].
    ///
    /// [W3 Spec]: https://www.w3.org/TR/trace-context/#value
    fn valid_value(value: &str) -> bool {
        let bytes = value.as_bytes();
        match (bytes.first(), bytes.last()) {
            (Some(b' '), _) | (_, Some(b' ')) | (None, _) => return false,
            _ => {}
        }

        bytes.len() <= MAX_VALUE_LEN
            && bytes
                .iter()
                .all(|&b| (0x20..=0x7e).contains(&b) && b != b',' && b != b'=')
    }

    /// Parses a `tracestate` header value.
    ///
    /// Parsing never fails. List members that are malformed, whose key was
    /// already seen, or that exceed the [`MAX_LIST_MEMBERS`] limit are dropped
    /// and the remaining members keep their order.
    ///
    /// # Examples
    ///
    /// ```
    /// use w3c_trace_context::TraceState;
    ///
    /// let trace_state = TraceState::from_header("rojo=00f067aa0ba902b7, bad key=1,congo=t61rcWkgMzE");
    ///
    /// assert_eq!(trace_state.len(), 2);
    /// assert_eq!(trace_state.header().as_deref(), Some("rojo=00f067aa0ba902b7,congo=t61rcWkgMzE"));
    /// ```
    pub fn from_header(header: &str) -> Self {
        let mut members: VecDeque<(String, String)> = VecDeque::new();

        for list_member in header.split(',') {
            let list_member = list_member.trim_matches(|c| c == ' ' || c == '\t');
            if list_member.is_empty() {
                continue;
            }

            let Some((key, value)) = list_member.split_once('=') else {
                tc_debug!(
                    name: "TraceState.Parse.DroppedMember",
                    reason = "missing '=' separator",
                    member = list_member,
                );
                continue;
            };

            if !TraceState::valid_key(key) {
                tc_debug!(name: "TraceState.Parse.DroppedMember", reason = "invalid key", member = list_member);
                continue;
            }
            if !TraceState::valid_value(value) {
                tc_debug!(name: "TraceState.Parse.DroppedMember", reason = "invalid value", member = list_member);
                continue;
            }
            if members.iter().any(|(k, _)| k == key) {
                tc_debug!(name: "TraceState.Parse.DroppedMember", reason = "duplicate key", member = list_member);
                continue;
            }
            if members.len() == MAX_LIST_MEMBERS {
                tc_debug!(
                    name: "TraceState.Parse.Truncated",
                    max_list_members = MAX_LIST_MEMBERS,
                );
                break;
            }

            members.push_back((key.to_owned(), value.to_owned()));
        }

        TraceState(members)
    }

    /// Creates a new `TraceState` from the given key-value collection.
    ///
    /// Unlike [`TraceState::from_header`] this is strict: any invalid key or
    /// value is an error, as is a list with more than [`MAX_LIST_MEMBERS`]
    /// distinct keys. When a key repeats, its first occurrence is kept.
    ///
    /// # Examples
    ///
    /// ```
    /// use w3c_trace_context::TraceState;
    ///
    /// let kvs = vec![("foo", "bar"), ("apple", "banana")];
    /// let trace_state = TraceState::from_key_value(kvs);
    ///
    /// assert!(trace_state.is_ok());
    /// assert_eq!(trace_state.unwrap().header(), Some(String::from("foo=bar,apple=banana")))
    /// ```
    pub fn from_key_value<T, K, V>(trace_state: T) -> Result<Self, TraceStateError>
    where
        T: IntoIterator<Item = (K, V)>,
        K: ToString,
        V: ToString,
    {
        let mut ordered_data: VecDeque<(String, String)> = VecDeque::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (key, value) in trace_state {
            let (key, value) = (key.to_string(), value.to_string());
            if !TraceState::valid_key(key.as_str()) {
                return Err(TraceStateError::InvalidKey(key));
            }
            if !TraceState::valid_value(value.as_str()) {
                return Err(TraceStateError::InvalidValue(value));
            }
            if !seen.insert(key.clone()) {
                continue;
            }
            if ordered_data.len() < MAX_LIST_MEMBERS {
                ordered_data.push_back((key, value));
            }
        }

        if seen.len() > MAX_LIST_MEMBERS {
            return Err(TraceStateError::TooManyEntries(seen.len()));
        }

        Ok(TraceState(ordered_data))
    }

    /// Retrieves a value for a given key from the `TraceState` if it exists.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find_map(|(k, v)| if k == key { Some(v.as_str()) } else { None })
    }

    /// Sets the value for `key` and moves the member to the front of the list.
    ///
    /// If the key or value are invalid per the [W3 Spec] an `Err` is returned
    /// and the `TraceState` is left untouched. When a new key would grow the
    /// list past [`MAX_LIST_MEMBERS`], the last (oldest) member is evicted.
    ///
    /// # Examples
    ///
    /// ```
    /// use w3c_trace_context::TraceState;
    ///
    /// let mut trace_state = TraceState::from_header("rojo=1,congo=2");
    /// trace_state.insert("congo", "3").unwrap();
    ///
    /// assert_eq!(trace_state.header().as_deref(), Some("congo=3,rojo=1"));
    /// ```
    ///
    /// [W3 Spec]: https://www.w3.org/TR/trace-context/#mutating-the-tracestate-field
    pub fn insert<K, V>(&mut self, key: K, value: V) -> Result<(), TraceStateError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let (key, value) = (key.into(), value.into());
        if !TraceState::valid_key(key.as_str()) {
            return Err(TraceStateError::InvalidKey(key));
        }
        if !TraceState::valid_value(value.as_str()) {
            return Err(TraceStateError::InvalidValue(value));
        }

        self.remove(&key);
        if self.0.len() == MAX_LIST_MEMBERS {
            if let Some((evicted, _)) = self.0.pop_back() {
                tc_debug!(name: "TraceState.Insert.Evicted", key = evicted.as_str());
            }
        }
        self.0.push_front((key, value));

        Ok(())
    }

    /// Removes the member for `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.0.iter().position(|(k, _)| k == key)?;
        self.0.remove(index).map(|(_, value)| value)
    }

    /// Number of list members.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no list members.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the list members in propagation order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterates over the keys in propagation order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    /// Creates a new `TraceState` header string, delimiting each key and value with a `=` and each
    /// entry with a `,`.
    ///
    /// Returns `None` for an empty `TraceState`: the header should then be
    /// omitted rather than sent empty.
    pub fn header(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.to_string())
        }
    }

    /// Like [`TraceState::header`], but drops list members until the header
    /// fits in `max_len` bytes.
    ///
    /// Members longer than 128 characters are dropped first, starting from
    /// the end of the list; after that members are dropped from the end.
    pub fn header_with_max_len(&self, max_len: usize) -> Option<String> {
        let member_len = |(k, v): &&(String, String)| k.len() + 1 + v.len();
        let mut members: Vec<&(String, String)> = self.0.iter().collect();
        let header_len = |members: &[&(String, String)]| {
            members.iter().map(member_len).sum::<usize>() + members.len().saturating_sub(1)
        };

        while header_len(&members) > max_len {
            match members.iter().rposition(|m| member_len(m) > LARGE_MEMBER_LEN) {
                Some(index) => {
                    members.remove(index);
                }
                None => {
                    members.pop();
                }
            }
        }

        if members.len() < self.0.len() {
            tc_debug!(
                name: "TraceState.Header.Truncated",
                dropped = self.0.len() - members.len(),
                max_len = max_len,
            );
        }

        TraceState(members.into_iter().cloned().collect()).header()
    }
}

fn valid_key_segment(segment: &str, max_len: usize, digit_start: bool) -> bool {
    let bytes = segment.as_bytes();
    let allowed_special = |b: u8| b == b'_' || b == b'-' || b == b'*' || b == b'/';

    match bytes.first() {
        Some(b) if b.is_ascii_lowercase() || (digit_start && b.is_ascii_digit()) => {}
        _ => return false,
    }

    bytes.len() <= max_len
        && bytes
            .iter()
            .all(|&b| b.is_ascii_lowercase() || b.is_ascii_digit() || allowed_special(b))
}

impl fmt::Display for TraceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

impl FromStr for TraceState {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TraceState::from_header(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rustfmt::skip]
    fn trace_state_test_data() -> Vec<(TraceState, &'static str, &'static str)> {
        vec![
            (TraceState::from_key_value(vec![("foo", "bar")]).unwrap(), "foo=bar", "foo"),
            (TraceState::from_key_value(vec![("foo", "baz"), ("apple", "banana")]).unwrap(), "foo=baz,apple=banana", "apple"),
            (TraceState::from_key_value(vec![("foo", "bar"), ("apple", "banana")]).unwrap(), "foo=bar,apple=banana", "apple"),
        ]
    }

    #[test]
    fn test_trace_state() {
        for (mut trace_state, header, key) in trace_state_test_data() {
            assert_eq!(trace_state.header().unwrap(), header);

            let new_value = format!("{}-{}", trace_state.get(key).unwrap(), "test");
            trace_state.insert(key, new_value.clone()).unwrap();

            let updated = format!("{}={}", key, new_value);
            assert_eq!(trace_state.header().unwrap().find(&updated), Some(0));

            assert_eq!(trace_state.remove(key), Some(new_value));
            assert!(trace_state.get(key).is_none());
        }
    }

    #[rstest]
    #[case("123", true)]
    #[case("bar", true)]
    #[case("foo@bar", true)]
    #[case("foo_-*/bar", true)]
    #[case("tenant1@system", true)]
    #[case("0tenant@system", true)]
    #[case("foo@0123456789abcdef", false)]
    #[case("foo@abcdefghijklmn0", false)]
    #[case("foo@abcdefghijklm", true)]
    #[case("foo@012345678", false)]
    #[case("foo@", false)]
    #[case("@bar", false)]
    #[case("foo@bar@baz", false)]
    #[case("", false)]
    #[case("_foo", false)]
    #[case("FOO@BAR", false)]
    #[case("Foo", false)]
    #[case("foo bar", false)]
    #[case("你好", false)]
    fn test_trace_state_key(#[case] key: &str, #[case] expected: bool) {
        assert_eq!(TraceState::valid_key(key), expected, "test key: {:?}", key);
    }

    #[test]
    fn test_trace_state_key_lengths() {
        assert!(TraceState::valid_key(&"a".repeat(256)));
        assert!(!TraceState::valid_key(&"a".repeat(257)));
        assert!(TraceState::valid_key(&format!("{}@{}", "t".repeat(241), "s".repeat(14))));
        assert!(!TraceState::valid_key(&format!("{}@{}", "t".repeat(242), "s")));
        assert!(!TraceState::valid_key(&format!("{}@{}", "t", "s".repeat(15))));
    }

    #[rstest]
    #[case("bar", true)]
    #[case("t61rcWkgMzE", true)]
    #[case("a b", true)]
    #[case("!~", true)]
    #[case("", false)]
    #[case(" bar", false)]
    #[case("bar ", false)]
    #[case("b=r", false)]
    #[case("b,r", false)]
    #[case("b\tr", false)]
    #[case("b\u{7f}r", false)]
    #[case("bär", false)]
    fn test_trace_state_value(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(TraceState::valid_value(value), expected, "test value: {:?}", value);
    }

    #[test]
    fn test_trace_state_value_length() {
        assert!(TraceState::valid_value(&"v".repeat(256)));
        assert!(!TraceState::valid_value(&"v".repeat(257)));
    }

    #[test]
    fn parse_keeps_order_and_serializes_back() {
        let header = "foo=bar,tenant1@system=1,tenant2@system=2";
        let trace_state = TraceState::from_header(header);

        assert_eq!(
            trace_state.iter().collect::<Vec<_>>(),
            vec![("foo", "bar"), ("tenant1@system", "1"), ("tenant2@system", "2")]
        );
        assert_eq!(trace_state.header().as_deref(), Some(header));
    }

    #[test]
    fn parse_trims_optional_whitespace_and_skips_empty_members() {
        let trace_state = TraceState::from_header(" foo=bar ,\t,, congo=t61rcWkgMzE\t");
        assert_eq!(trace_state.header().as_deref(), Some("foo=bar,congo=t61rcWkgMzE"));
    }

    #[rstest]
    #[case("foo=bar,baz=b=q,rojo=1", "foo=bar,rojo=1")]
    #[case("foo=bar,malformed,rojo=1", "foo=bar,rojo=1")]
    #[case("=value1,key2=value2,=value3", "key2=value2")]
    #[case("key1=value1,key2=", "key1=value1")]
    #[case("Key=value,key=value", "key=value")]
    #[case("key=val\x00ue,ok=1", "ok=1")]
    #[case("café=bücher,ok=1", "ok=1")]
    fn parse_drops_only_malformed_members(#[case] header: &str, #[case] expected: &str) {
        assert_eq!(TraceState::from_header(header).header().as_deref(), Some(expected));
    }

    #[test]
    fn parse_keeps_first_duplicate() {
        let trace_state = TraceState::from_header("foo=1,bar=2,foo=3");
        assert_eq!(trace_state.header().as_deref(), Some("foo=1,bar=2"));
    }

    #[test]
    fn parse_caps_list_members() {
        let header = (0..40).map(|i| format!("k{}=v{}", i, i)).collect::<Vec<_>>().join(",");
        let trace_state = TraceState::from_header(&header);

        assert_eq!(trace_state.len(), MAX_LIST_MEMBERS);
        let expected = (0..32).map(|i| format!("k{}", i)).collect::<Vec<_>>();
        assert_eq!(trace_state.keys().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn parse_caps_after_deduplication() {
        let mut members = vec!["k0=dup".to_string()];
        members.extend((0..32).map(|i| format!("k{}=v{}", i, i)));
        let trace_state = TraceState::from_header(&members.join(","));

        assert_eq!(trace_state.len(), 32);
        assert_eq!(trace_state.get("k0"), Some("dup"));
        assert_eq!(trace_state.get("k31"), Some("v31"));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case(",,,")]
    #[case("garbage")]
    #[case("FOO=BAR")]
    fn parse_empty_or_invalid_yields_empty(#[case] header: &str) {
        let trace_state: TraceState = header.parse().unwrap();
        assert!(trace_state.is_empty());
        assert_eq!(trace_state.header(), None);
        assert_eq!(trace_state, TraceState::NONE);
    }

    #[test]
    fn insert_moves_existing_key_to_front() {
        let mut trace_state = TraceState::from_header("bar=1,foo=old,baz=2");
        trace_state.insert("foo", "newval").unwrap();
        assert_eq!(trace_state.header().as_deref(), Some("foo=newval,bar=1,baz=2"));

        trace_state.insert("qux", "3").unwrap();
        assert_eq!(trace_state.header().as_deref(), Some("qux=3,foo=newval,bar=1,baz=2"));
    }

    #[test]
    fn insert_rejects_invalid_and_leaves_state_untouched() {
        let mut trace_state = TraceState::from_header("foo=bar");

        assert_eq!(
            trace_state.insert("Foo", "x"),
            Err(TraceStateError::InvalidKey("Foo".to_string()))
        );
        assert_eq!(
            trace_state.insert("foo", "a=b"),
            Err(TraceStateError::InvalidValue("a=b".to_string()))
        );
        assert_eq!(trace_state.header().as_deref(), Some("foo=bar"));
    }

    #[test]
    fn insert_evicts_oldest_when_full() {
        let header = (0..32).map(|i| format!("k{}=v", i)).collect::<Vec<_>>().join(",");
        let mut trace_state = TraceState::from_header(&header);

        trace_state.insert("new", "v").unwrap();
        assert_eq!(trace_state.len(), 32);
        assert_eq!(trace_state.keys().next(), Some("new"));
        assert!(trace_state.get("k31").is_none());

        // Updating an existing key in a full list evicts nothing.
        trace_state.insert("k5", "w").unwrap();
        assert_eq!(trace_state.len(), 32);
        assert!(trace_state.get("k30").is_some());
    }

    #[test]
    fn remove_missing_key_is_noop() {
        let mut trace_state = TraceState::from_header("foo=bar");
        assert_eq!(trace_state.remove("nope"), None);
        assert_eq!(trace_state.len(), 1);
    }

    #[test]
    fn from_key_value_is_strict() {
        assert_eq!(
            TraceState::from_key_value(vec![("foo", "bar"), ("b@d@", "x")]),
            Err(TraceStateError::InvalidKey("b@d@".to_string()))
        );
        assert_eq!(
            TraceState::from_key_value(vec![("foo", "")]),
            Err(TraceStateError::InvalidValue(String::new()))
        );

        let too_many = (0..33).map(|i| (format!("k{}", i), "v"));
        assert_eq!(
            TraceState::from_key_value(too_many),
            Err(TraceStateError::TooManyEntries(33))
        );

        let repeated_past_cap = (0..32)
            .map(|i| (format!("k{}", i), "v"))
            .chain([("x".to_string(), "v"), ("x".to_string(), "v")]);
        assert_eq!(
            TraceState::from_key_value(repeated_past_cap),
            Err(TraceStateError::TooManyEntries(33))
        );

        let repeated_within_cap = (0..32)
            .map(|i| (format!("k{}", i), "v"))
            .chain([("k0".to_string(), "w")]);
        let trace_state = TraceState::from_key_value(repeated_within_cap).unwrap();
        assert_eq!(trace_state.len(), 32);
        assert_eq!(trace_state.get("k0"), Some("v"));
    }

    #[test]
    fn header_with_max_len_drops_large_members_first() {
        let large = "l".repeat(130);
        let trace_state = TraceState::from_key_value(vec![
            ("a", "1"),
            ("big", large.as_str()),
            ("b", "2"),
        ])
        .unwrap();

        assert_eq!(trace_state.header_with_max_len(512), trace_state.header());
        assert_eq!(trace_state.header_with_max_len(20).as_deref(), Some("a=1,b=2"));
        assert_eq!(trace_state.header_with_max_len(4).as_deref(), Some("a=1"));
        assert_eq!(trace_state.header_with_max_len(2), None);
    }
}
