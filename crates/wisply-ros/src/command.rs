// Command sentences and reply records
//
// A `Command` is a request sentence under construction: the command path
// plus `=key=value` attribute words and `?key=value` print filters. A
// `Record` is the attribute map carried by one `!re` (or `!done`) reply.

use indexmap::IndexMap;

use crate::error::Error;

// ── Command ─────────────────────────────────────────────────────────

/// A request sentence under construction.
///
/// ```
/// use wisply_ros::Command;
///
/// let cmd = Command::new("/ppp/secret/set")
///     .attr(".id", "*1A")
///     .attr("profile", "ISOLIR");
/// ```
#[derive(Debug, Clone)]
pub struct Command {
    words: Vec<String>,
}

impl Command {
    /// Start a command for the given path (e.g. `/ppp/secret/print`).
    pub fn new(path: &str) -> Self {
        Self {
            words: vec![path.to_owned()],
        }
    }

    /// Add an `=key=value` attribute word.
    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.words.push(format!("={key}={value}"));
        self
    }

    /// Add a `?key=value` print filter word (server-side narrowing).
    pub fn filter(mut self, key: &str, value: &str) -> Self {
        self.words.push(format!("?{key}={value}"));
        self
    }

    /// The command path (first word).
    pub fn path(&self) -> &str {
        &self.words[0]
    }

    pub(crate) fn words(&self) -> &[String] {
        &self.words
    }
}

// ── Record ──────────────────────────────────────────────────────────

/// Attribute map from one reply sentence, in device order.
#[derive(Debug, Clone, Default)]
pub struct Record {
    attrs: IndexMap<String, String>,
}

impl Record {
    /// Parse the `=key=value` words of a reply sentence. Words that are
    /// not attributes (`.tag=` bookkeeping) are ignored.
    pub(crate) fn from_words<S: AsRef<str>>(words: &[S]) -> Self {
        let mut attrs = IndexMap::new();
        for word in words {
            let word = word.as_ref();
            if let Some(rest) = word.strip_prefix('=') {
                if let Some((key, value)) = rest.split_once('=') {
                    attrs.insert(key.to_owned(), value.to_owned());
                }
            }
        }
        Self { attrs }
    }

    /// Look up an attribute by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Look up an attribute that the protocol guarantees to be present.
    pub fn require(&self, key: &str) -> Result<&str, Error> {
        self.get(key)
            .ok_or_else(|| Error::Protocol(format!("reply is missing required attribute '{key}'")))
    }

    /// The internal item id (`.id`), required for follow-up writes.
    pub fn id(&self) -> Result<&str, Error> {
        self.require(".id")
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// `true` if the reply carried no attributes.
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

// ── Reply ───────────────────────────────────────────────────────────

/// One decoded reply sentence.
#[derive(Debug)]
pub(crate) enum Reply {
    /// `!re` -- one data row.
    Data(Record),
    /// `!done` -- end of the reply, possibly carrying `=ret=`.
    Done(Record),
    /// `!trap` -- command-level error.
    Trap(Record),
    /// `!fatal` -- the device is closing the connection.
    Fatal(String),
}

impl Reply {
    pub(crate) fn parse(words: &[String]) -> Result<Self, Error> {
        let (first, rest) = words
            .split_first()
            .ok_or_else(|| Error::Protocol("empty reply sentence".into()))?;
        match first.as_str() {
            "!re" => Ok(Self::Data(Record::from_words(rest))),
            "!done" => Ok(Self::Done(Record::from_words(rest))),
            "!trap" => Ok(Self::Trap(Record::from_words(rest))),
            "!fatal" => Ok(Self::Fatal(rest.join(" "))),
            other => Err(Error::Protocol(format!("unknown reply word '{other}'"))),
        }
    }
}

impl Record {
    /// The trap message, or a placeholder when the device sent none.
    pub(crate) fn trap_message(&self) -> String {
        self.get("message")
            .unwrap_or("no message given")
            .to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_words() {
        let cmd = Command::new("/ppp/secret/print").filter("name", "alice");
        assert_eq!(cmd.words(), &["/ppp/secret/print", "?name=alice"]);
        assert_eq!(cmd.path(), "/ppp/secret/print");
    }

    #[test]
    fn record_parses_attributes_in_order() {
        let words = ["=.id=*1", "=name=alice", "=profile=10M", ".tag=3"];
        let record = Record::from_words(&words);
        assert_eq!(record.id().unwrap(), "*1");
        assert_eq!(record.get("name"), Some("alice"));
        assert_eq!(record.get("profile"), Some("10M"));
        assert_eq!(record.get("tag"), None);
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn record_keeps_values_containing_equals() {
        let words = ["=comment=rate=burst capable"];
        let record = Record::from_words(&words);
        assert_eq!(record.get("comment"), Some("rate=burst capable"));
    }

    #[test]
    fn reply_classification() {
        let data = Reply::parse(&["!re".into(), "=name=alice".into()]).unwrap();
        assert!(matches!(data, Reply::Data(_)));

        let done = Reply::parse(&["!done".into()]).unwrap();
        assert!(matches!(done, Reply::Done(_)));

        let trap = Reply::parse(&["!trap".into(), "=message=failure".into()]).unwrap();
        match trap {
            Reply::Trap(record) => assert_eq!(record.trap_message(), "failure"),
            other => panic!("expected trap, got {other:?}"),
        }

        let err = Reply::parse(&["!bogus".into()]).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
