//! Geospatial commands (GEO*).

use crate::backend::Reply;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::value::Value;

/// Shaping options for GEOSEARCH.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoSearchOptions {
    pub count: Option<u64>,
    /// Include distances from the search center.
    pub withdist: bool,
    /// Include member coordinates.
    pub withcoord: bool,
}

/// Geospatial handle, borrowed from a session.
pub struct Geo<'a> {
    session: &'a mut Session,
}

impl<'a> Geo<'a> {
    pub(crate) fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    /// Add (longitude, latitude, member) points, returning how many were
    /// newly added.
    pub fn add(&mut self, key: &str, points: &[(f64, f64, &str)]) -> Result<i64> {
        let mut args = vec![Value::from(key)];
        for (lon, lat, member) in points {
            args.push(Value::Float(*lon));
            args.push(Value::Float(*lat));
            args.push(Value::from(*member));
        }
        match self.session.raw_command("GEOADD", &args)? {
            Reply::Int(n) => Ok(n),
            other => Err(Error::Protocol(format!(
                "unexpected reply shape: {:?}",
                other
            ))),
        }
    }

    /// Members within `radius` of a center point. `unit` is one of
    /// m, km, mi, ft.
    pub fn search(
        &mut self,
        key: &str,
        longitude: f64,
        latitude: f64,
        radius: f64,
        unit: &str,
        opts: GeoSearchOptions,
    ) -> Result<Reply> {
        let mut args = vec![
            Value::from(key),
            Value::from("FROMLONLAT"),
            Value::Float(longitude),
            Value::Float(latitude),
            Value::from("BYRADIUS"),
            Value::Float(radius),
            Value::from(unit.to_ascii_uppercase()),
        ];
        if let Some(count) = opts.count {
            args.extend([Value::from("COUNT"), Value::Int(count as i64)]);
        }
        if opts.withdist {
            args.push(Value::from("WITHDIST"));
        }
        if opts.withcoord {
            args.push(Value::from("WITHCOORD"));
        }
        self.session.raw_command("GEOSEARCH", &args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_backend_reports_unknown_command() {
        let mut session = Session::open(":memory:").unwrap();
        let result = session.geo().add("points", &[(13.361389, 38.115556, "Palermo")]);
        assert!(matches!(result, Err(Error::UnknownCommand(_))));
        let result = session.geo().search(
            "points",
            15.0,
            37.0,
            200.0,
            "km",
            GeoSearchOptions::default(),
        );
        assert!(matches!(result, Err(Error::UnknownCommand(_))));
    }
}
