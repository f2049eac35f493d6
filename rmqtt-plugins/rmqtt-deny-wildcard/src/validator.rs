use std::fmt;

/// Reason string sent back with the SUBACK of a rejected subscription.
pub const REASON_STRING: &str = "Root wildcard subscriptions are not supported.";

/// Characters a root level may not consist of exclusively. The level separator is
/// included so that `#/+`, `+/#` and `+/+` are caught as well as a bare `#`.
pub const WILDCARD_CHARS: [char; 3] = ['#', '/', '+'];

const SHARE_PREFIX: &str = "$share/";
const EXPIRED_PREFIX: &str = "$expired/";
const DROPPED_PREFIX: &str = "$dropped/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted,
    Rejected { reason: &'static str },
}

impl ValidationOutcome {
    #[inline]
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted)
    }

    #[inline]
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            ValidationOutcome::Accepted => None,
            ValidationOutcome::Rejected { reason } => Some(*reason),
        }
    }
}

/// Which root a denied topic filter was caught on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    Plain,
    Shared,
    Expired,
    Dropped,
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Root::Plain => "plain",
            Root::Shared => "shared",
            Root::Expired => "expired",
            Root::Dropped => "dropped",
        };
        f.write_str(s)
    }
}

/// True when every character of `s` is a wildcard or separator. Vacuously true for "".
#[inline]
pub fn is_wildcard_only(s: &str) -> bool {
    s.chars().all(|c| WILDCARD_CHARS.contains(&c))
}

#[inline]
fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

/// `$share/<group>/<rest>` yields `<rest>`; the group ends at the first `/` and may be empty.
/// A group spanning a line terminator does not form a shared subscription.
#[inline]
fn shared_topic(topic_filter: &str) -> Option<&str> {
    let (group, rest) = topic_filter.strip_prefix(SHARE_PREFIX)?.split_once('/')?;
    if group.contains(is_line_terminator) {
        None
    } else {
        Some(rest)
    }
}

/// Returns the root the filter is denied on, or `None` if the subscription may proceed.
///
/// Rules are checked in order and the first denial wins: the shared subscription
/// prefix, `$expired/`, `$dropped/`, then the whole filter. A `$share/` filter
/// without a second separator is not a shared subscription and falls through.
pub fn denied_root(topic_filter: &str) -> Option<Root> {
    if let Some(rest) = shared_topic(topic_filter) {
        if is_wildcard_only(rest) {
            return Some(Root::Shared);
        }
    }
    if let Some(rest) = topic_filter.strip_prefix(EXPIRED_PREFIX) {
        if is_wildcard_only(rest) {
            return Some(Root::Expired);
        }
    }
    if let Some(rest) = topic_filter.strip_prefix(DROPPED_PREFIX) {
        if is_wildcard_only(rest) {
            return Some(Root::Dropped);
        }
    }
    if is_wildcard_only(topic_filter) {
        return Some(Root::Plain);
    }
    None
}

#[inline]
pub fn validate(topic_filter: &str) -> ValidationOutcome {
    match denied_root(topic_filter) {
        Some(_) => ValidationOutcome::Rejected { reason: REASON_STRING },
        None => ValidationOutcome::Accepted,
    }
}

/// Decides whether a client may subscribe to a topic filter.
pub trait SubscriptionAuthorizer: Send + Sync {
    fn authorize(&self, topic_filter: &str, client_id: &str) -> ValidationOutcome;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DenyWildcardAuthorizer;

impl SubscriptionAuthorizer for DenyWildcardAuthorizer {
    #[inline]
    fn authorize(&self, topic_filter: &str, client_id: &str) -> ValidationOutcome {
        match denied_root(topic_filter) {
            Some(root) => {
                log::debug!(
                    "Client {} tried to subscribe to a denied {} root wildcard topic filter '{}'",
                    client_id,
                    root,
                    topic_filter
                );
                ValidationOutcome::Rejected { reason: REASON_STRING }
            }
            None => ValidationOutcome::Accepted,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use once_cell::sync::{Lazy, OnceCell};

    use super::*;

    const REJECTED: ValidationOutcome = ValidationOutcome::Rejected { reason: REASON_STRING };

    fn assert_rejected(tfs: &[&str]) {
        for tf in tfs {
            assert_eq!(validate(tf), REJECTED, "{:?} should be rejected", tf);
        }
    }

    fn assert_accepted(tfs: &[&str]) {
        for tf in tfs {
            assert_eq!(validate(tf), ValidationOutcome::Accepted, "{:?} should be accepted", tf);
        }
    }

    #[test]
    fn test_root_wildcards() {
        assert_rejected(&["#", "+", "#/", "+/", "#/+", "+/#", "+/+", "/#", "/+", "/", "//", ""]);
    }

    #[test]
    fn test_non_root_wildcards() {
        assert_accepted(&["topic", "topic/#", "topic/+", "+/topic", "+/topic/#", "a", "/a/#", "+/+/x"]);
    }

    #[test]
    fn test_shared() {
        assert_rejected(&["$share/group/#", "$share/group/+/#", "$share/group/+/+", "$share/group//#"]);
        assert_rejected(&["$share/group/", "$share//#", "$share//"]);
        assert_accepted(&["$share/group/topic/#", "$share/group/+/topic/#"]);
        assert_eq!(denied_root("$share/group/#"), Some(Root::Shared));
    }

    #[test]
    fn test_shared_without_group_separator() {
        //no `<group>/<rest>` shape, the whole filter is checked instead
        assert_accepted(&["$share/onlyonepart", "$share/#"]);
        assert_eq!(shared_topic("$share/onlyonepart"), None);
        assert_eq!(shared_topic("$share/g/a/b"), Some("a/b"));
    }

    #[test]
    fn test_expired_and_dropped() {
        assert_rejected(&["$expired/#", "$expired/+/+", "$expired/", "$dropped/#", "$dropped/+/+", "$dropped/"]);
        assert_accepted(&["$expired/topic/+", "$dropped/topic/+", "$expired", "$dropped", "$SYS/#"]);
        assert_eq!(denied_root("$expired/#"), Some(Root::Expired));
        assert_eq!(denied_root("$dropped/+"), Some(Root::Dropped));
        assert_eq!(denied_root("+/+"), Some(Root::Plain));
        assert_eq!(denied_root("topic/#"), None);
    }

    #[test]
    fn test_outcome() {
        assert!(validate("topic/#").is_accepted());
        assert_eq!(validate("topic/#").reason(), None);
        assert!(!validate("#").is_accepted());
        assert_eq!(validate("#").reason(), Some("Root wildcard subscriptions are not supported."));
    }

    #[test]
    fn test_non_ascii() {
        assert_accepted(&["température/#", "$share/g/数据/+", "\n", "# "]);
    }

    #[test]
    fn test_shared_group_with_line_terminator() {
        for group in ["g\n", "\r", "a\u{85}b", "g\u{2028}", "\u{2029}g", "g\r\n"] {
            let tf = format!("$share/{}/#", group);
            assert_eq!(shared_topic(&tf), None, "{:?}", tf);
            assert_eq!(validate(&tf), ValidationOutcome::Accepted, "{:?}", tf);
        }
        //terminators after the group are part of the topic
        assert_eq!(shared_topic("$share/g/#\n"), Some("#\n"));
        assert_accepted(&["$share/g/#\n"]);
        assert_rejected(&["$share/g\t/#", "$share/g /+"]);
    }

    fn filters(alphabet: &[char], max_len: usize) -> Vec<String> {
        let mut all = vec![String::new()];
        let mut last = vec![String::new()];
        for _ in 0..max_len {
            let next = last
                .iter()
                .flat_map(|prefix| {
                    alphabet.iter().map(move |c| {
                        let mut s = prefix.clone();
                        s.push(*c);
                        s
                    })
                })
                .collect::<Vec<_>>();
            all.extend(next.iter().cloned());
            last = next;
        }
        all
    }

    #[test]
    fn test_exhaustive_short_filters() {
        let all = filters(&['#', '/', '+', 'a'], 6);
        assert_eq!(all.len(), (0..=6).map(|n| 4usize.pow(n)).sum::<usize>());
        for tf in &all {
            let expected = if tf.contains('a') { ValidationOutcome::Accepted } else { REJECTED };
            assert_eq!(validate(tf), expected, "{:?}", tf);
        }
    }

    #[test]
    fn test_exhaustive_prefixed_filters() {
        for rest in filters(&['#', '/', '+', 'a'], 4) {
            let expected = if rest.contains('a') { ValidationOutcome::Accepted } else { REJECTED };
            assert_eq!(validate(&format!("$expired/{}", rest)), expected, "$expired/{:?}", rest);
            assert_eq!(validate(&format!("$dropped/{}", rest)), expected, "$dropped/{:?}", rest);
            assert_eq!(validate(&format!("$share/g/{}", rest)), expected, "$share/g/{:?}", rest);
        }
    }

    #[test]
    fn test_idempotent() {
        let authorizer = DenyWildcardAuthorizer;
        for tf in ["#", "topic/#", "$share/group/#", "$expired/topic/+", "$share/onlyonepart"] {
            let first = authorizer.authorize(tf, "client");
            for _ in 0..3 {
                assert_eq!(authorizer.authorize(tf, "client"), first);
                assert_eq!(validate(tf), first);
            }
        }
    }

    #[test]
    fn test_concurrent_authorize() {
        let tfs = filters(&['#', '/', '+', 'a', '$'], 4);
        let expected = tfs.iter().map(|tf| validate(tf)).collect::<Vec<_>>();
        let authorizer = DenyWildcardAuthorizer;
        std::thread::scope(|s| {
            for n in 0..8 {
                let (tfs, expected, authorizer) = (&tfs, &expected, &authorizer);
                s.spawn(move || {
                    let client_id = format!("client-{}", n);
                    for (tf, want) in tfs.iter().zip(expected.iter()) {
                        assert_eq!(authorizer.authorize(tf, &client_id), *want);
                    }
                });
            }
        });
    }

    struct CaptureLogger;

    static CAPTURED: Lazy<Mutex<Vec<(log::Level, String)>>> = Lazy::new(|| Mutex::new(Vec::new()));
    static CAPTURE_INIT: OnceCell<()> = OnceCell::new();

    impl log::Log for CaptureLogger {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, r: &log::Record) {
            if let Ok(mut lines) = CAPTURED.lock() {
                lines.push((r.level(), r.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    fn captured(client_id: &str) -> Vec<(log::Level, String)> {
        CAPTURE_INIT.get_or_init(|| {
            static LOGGER: CaptureLogger = CaptureLogger;
            let _ = log::set_logger(&LOGGER);
            log::set_max_level(log::LevelFilter::Debug);
        });
        let lines = CAPTURED.lock().map(|lines| lines.clone()).unwrap_or_default();
        lines.into_iter().filter(|(_, msg)| msg.contains(client_id)).collect()
    }

    #[test]
    fn test_rejection_is_logged() {
        let _ = captured("");
        let authorizer = DenyWildcardAuthorizer;

        assert_eq!(authorizer.authorize("$share/group/#", "log-client-1"), REJECTED);
        let lines = captured("log-client-1");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, log::Level::Debug);
        assert!(lines[0].1.contains("'$share/group/#'"), "{}", lines[0].1);
        assert!(lines[0].1.contains("shared"), "{}", lines[0].1);

        assert_eq!(authorizer.authorize("topic/#", "log-client-2"), ValidationOutcome::Accepted);
        assert!(captured("log-client-2").is_empty());
    }

    #[test]
    fn test_authorizer_is_zero_sized() {
        fn assert_send_sync<T: Send + Sync + Copy>() {}
        assert_send_sync::<DenyWildcardAuthorizer>();
        assert_eq!(std::mem::size_of::<DenyWildcardAuthorizer>(), 0);
    }
}
