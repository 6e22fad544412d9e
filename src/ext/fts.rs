//! Full-text search commands (FT.*).

use bytes::Bytes;

use crate::backend::Reply;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::value::Value;

/// Result paging and shaping for FT.SEARCH.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    /// Return document IDs only.
    pub nocontent: bool,
    /// Include relevance scores.
    pub withscores: bool,
    pub offset: u64,
    pub limit: u64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            nocontent: false,
            withscores: false,
            offset: 0,
            limit: 10,
        }
    }
}

/// Full-text search handle, borrowed from a session.
pub struct Fts<'a> {
    session: &'a mut Session,
}

impl<'a> Fts<'a> {
    pub(crate) fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    /// Create an index over keys with the given prefix. Schema entries are
    /// (field, type) pairs, e.g. `("title", "TEXT")`.
    pub fn create(
        &mut self,
        index: &str,
        schema: &[(&str, &str)],
        prefix: Option<&str>,
    ) -> Result<()> {
        let mut args = vec![Value::from(index), Value::from("ON"), Value::from("HASH")];
        if let Some(prefix) = prefix {
            args.extend([Value::from("PREFIX"), Value::from("1"), Value::from(prefix)]);
        }
        args.push(Value::from("SCHEMA"));
        for (field, ftype) in schema {
            args.push(Value::from(*field));
            args.push(Value::from(*ftype));
        }
        self.session.raw_command("FT.CREATE", &args)?;
        Ok(())
    }

    /// Query an index. The reply layout depends on the options: a count
    /// followed by IDs, optionally interleaved with scores and documents.
    pub fn search(&mut self, index: &str, query: &str, opts: SearchOptions) -> Result<Reply> {
        let mut args = vec![Value::from(index), Value::from(query)];
        if opts.nocontent {
            args.push(Value::from("NOCONTENT"));
        }
        if opts.withscores {
            args.push(Value::from("WITHSCORES"));
        }
        args.extend([
            Value::from("LIMIT"),
            Value::Int(opts.offset as i64),
            Value::Int(opts.limit as i64),
        ]);
        self.session.raw_command("FT.SEARCH", &args)
    }

    /// Drop an index, optionally deleting the indexed documents too.
    pub fn dropindex(&mut self, index: &str, delete_docs: bool) -> Result<()> {
        let mut args = vec![Value::from(index)];
        if delete_docs {
            args.push(Value::from("DD"));
        }
        self.session.raw_command("FT.DROPINDEX", &args)?;
        Ok(())
    }

    /// Index metadata as attribute/value pairs.
    pub fn info(&mut self, index: &str) -> Result<Vec<(String, Bytes)>> {
        let reply = self.session.raw_command("FT.INFO", &[Value::from(index)])?;
        let Reply::Array(items) = reply else {
            return Err(Error::Protocol(format!(
                "unexpected reply shape: {:?}",
                reply
            )));
        };
        if items.len() % 2 != 0 {
            return Err(Error::Protocol("odd-length info reply".to_string()));
        }
        let mut out = Vec::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let (Some(attr), Some(value)) = (iter.next(), iter.next()) {
            let attr = match attr {
                Reply::Bulk(b) => String::from_utf8_lossy(&b).into_owned(),
                Reply::Simple(s) => s,
                other => {
                    return Err(Error::Protocol(format!(
                        "unexpected reply shape: {:?}",
                        other
                    )))
                }
            };
            let value = match value {
                Reply::Bulk(b) => b,
                Reply::Simple(s) => Bytes::from(s),
                Reply::Int(n) => Bytes::from(n.to_string()),
                other => {
                    return Err(Error::Protocol(format!(
                        "unexpected reply shape: {:?}",
                        other
                    )))
                }
            };
            out.push((attr, value));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_backend_reports_unknown_command() {
        let mut session = Session::open(":memory:").unwrap();
        let result = session
            .fts()
            .create("idx", &[("title", "TEXT")], Some("doc:"));
        assert!(matches!(result, Err(Error::UnknownCommand(_))));
        let result = session.fts().search("idx", "hello", SearchOptions::default());
        assert!(matches!(result, Err(Error::UnknownCommand(_))));
    }
}
