//! Vector-set commands (V*).

use crate::backend::Reply;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::value::Value;

/// Vector-set handle, borrowed from a session.
pub struct VectorSet<'a> {
    session: &'a mut Session,
}

impl<'a> VectorSet<'a> {
    pub(crate) fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    /// Add an element with its vector, optionally attaching a JSON
    /// attribute payload. The vector must be non-empty.
    pub fn add(
        &mut self,
        key: &str,
        element: &str,
        vector: &[f64],
        attributes: Option<&str>,
    ) -> Result<()> {
        let mut args = values_form(key, vector)?;
        args.push(Value::from(element));
        if let Some(json) = attributes {
            args.extend([Value::from("SETATTR"), Value::from(json)]);
        }
        self.session.raw_command("VADD", &args)?;
        Ok(())
    }

    /// Nearest neighbours of a query vector. With `withscores`, elements
    /// interleave with their distances.
    pub fn sim(
        &mut self,
        key: &str,
        vector: &[f64],
        count: u64,
        withscores: bool,
    ) -> Result<Reply> {
        let mut args = values_form(key, vector)?;
        args.extend([Value::from("COUNT"), Value::Int(count as i64)]);
        if withscores {
            args.push(Value::from("WITHSCORES"));
        }
        self.session.raw_command("VSIM", &args)
    }

    /// Remove an element, returning how many were removed.
    pub fn rem(&mut self, key: &str, element: &str) -> Result<i64> {
        match self
            .session
            .raw_command("VREM", &[Value::from(key), Value::from(element)])?
        {
            Reply::Int(n) => Ok(n),
            other => Err(Error::Protocol(format!(
                "unexpected reply shape: {:?}",
                other
            ))),
        }
    }

    /// Number of elements in the vector set.
    pub fn card(&mut self, key: &str) -> Result<i64> {
        match self.session.raw_command("VCARD", &[Value::from(key)])? {
            Reply::Int(n) => Ok(n),
            other => Err(Error::Protocol(format!(
                "unexpected reply shape: {:?}",
                other
            ))),
        }
    }
}

/// `key VALUES n v1 .. vn` prefix shared by VADD and VSIM.
fn values_form(key: &str, vector: &[f64]) -> Result<Vec<Value>> {
    if vector.is_empty() {
        return Err(Error::Protocol("vector must be non-empty".to_string()));
    }
    let mut args = vec![
        Value::from(key),
        Value::from("VALUES"),
        Value::Int(vector.len() as i64),
    ];
    args.extend(vector.iter().map(|v| Value::Float(*v)));
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_vector_rejected_before_dispatch() {
        let mut session = Session::open(":memory:").unwrap();
        let result = session.vector().add("vs", "e1", &[], None);
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[test]
    fn test_unsupported_backend_reports_unknown_command() {
        let mut session = Session::open(":memory:").unwrap();
        let result = session.vector().add("vs", "e1", &[0.1, 0.2], None);
        assert!(matches!(result, Err(Error::UnknownCommand(_))));
    }
}
