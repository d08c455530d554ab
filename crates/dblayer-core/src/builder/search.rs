//! Full-text and geographic search expressions.

use super::value::SqlValue;
use super::writer::SqlWriter;
use crate::dialect::Dialect;
use crate::error::{BuildError, Result};

/// Mean Earth radius in metres, used by the haversine fallback.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Escapes `%`, `_` and the escape character itself for `LIKE ... ESCAPE '\'`.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Full-text search over a set of columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSearch {
    pub columns: Vec<String>,
    pub term: String,
}

impl TextSearch {
    fn check(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(BuildError::invalid("search requires at least one column"));
        }
        Ok(())
    }

    /// Postgres document expression over all columns.
    fn tsvector(&self, w: &SqlWriter) -> Result<String> {
        let dialect = w.dialect();
        let mut parts = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            parts.push(format!("coalesce({}, '')", dialect.identifier(column)?));
        }
        Ok(format!("to_tsvector('simple', {})", parts.join(" || ' ' || ")))
    }

    pub(crate) fn write_rank(&self, w: &mut SqlWriter) -> Result<()> {
        self.check()?;
        match w.dialect() {
            Dialect::MySql => self.write_match(w),
            Dialect::Postgres => {
                let doc = self.tsvector(w)?;
                w.push("ts_rank(").push(&doc).push(", plainto_tsquery('simple', ");
                w.push_arg(SqlValue::Text(self.term.clone()));
                w.push("))");
                Ok(())
            }
            // No FTS table is assumed, so every row ranks equally.
            Dialect::Sqlite => {
                w.push("0");
                Ok(())
            }
        }
    }

    pub(crate) fn write_filter(&self, w: &mut SqlWriter) -> Result<()> {
        self.check()?;
        match w.dialect() {
            Dialect::MySql => self.write_match(w),
            Dialect::Postgres => {
                let doc = self.tsvector(w)?;
                w.push(&doc).push(" @@ plainto_tsquery('simple', ");
                w.push_arg(SqlValue::Text(self.term.clone()));
                w.push(")");
                Ok(())
            }
            Dialect::Sqlite => {
                let pattern = format!("%{}%", escape_like(&self.term));
                w.push("(");
                for (i, column) in self.columns.iter().enumerate() {
                    if i > 0 {
                        w.push(" OR ");
                    }
                    w.push_identifier(column)?;
                    w.push(" LIKE ");
                    w.push_arg(SqlValue::Text(pattern.clone()));
                    w.push(" ESCAPE '\\'");
                }
                w.push(")");
                Ok(())
            }
        }
    }

    fn write_match(&self, w: &mut SqlWriter) -> Result<()> {
        w.push("MATCH(");
        w.push_identifier_list(&self.columns)?;
        w.push(") AGAINST(");
        w.push_arg(SqlValue::Text(self.term.clone()));
        w.push(" IN NATURAL LANGUAGE MODE)");
        Ok(())
    }
}

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Where a row keeps its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoColumn {
    /// A native spatial POINT column.
    Point(String),
    /// Separate latitude and longitude columns, in degrees.
    LatLng { lat: String, lng: String },
}

/// A radius search around a point.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoSearch {
    pub column: GeoColumn,
    pub point: GeoPoint,
    pub radius_m: f64,
}

impl GeoSearch {
    /// Writes the distance, in metres, between the row and the search point.
    pub(crate) fn write_distance(&self, w: &mut SqlWriter) -> Result<()> {
        if !self.radius_m.is_finite() || self.radius_m < 0.0 {
            return Err(BuildError::invalid(format!(
                "geo radius must be a non-negative number, got {}",
                self.radius_m
            )));
        }
        match &self.column {
            GeoColumn::Point(column) => match w.dialect() {
                Dialect::MySql => {
                    w.push("ST_Distance_Sphere(");
                    w.push_identifier(column)?;
                    w.push(", POINT(");
                    self.write_lng_lat(w);
                    w.push("))");
                    Ok(())
                }
                Dialect::Postgres => {
                    w.push("ST_DistanceSphere(");
                    w.push_identifier(column)?;
                    w.push("::geometry, ST_SetSRID(ST_MakePoint(");
                    self.write_lng_lat(w);
                    w.push("), 4326))");
                    Ok(())
                }
                dialect @ Dialect::Sqlite => Err(BuildError::Unsupported {
                    dialect,
                    feature: "spatial POINT columns",
                }),
            },
            GeoColumn::LatLng { lat, lng } => {
                let dialect = w.dialect();
                let lat = dialect.identifier(lat)?;
                let lng = dialect.identifier(lng)?;
                w.push(&format!("({EARTH_RADIUS_M} * 2 * ASIN(SQRT(POWER(SIN(RADIANS({lat} - "));
                w.push_arg(SqlValue::Float(self.point.lat));
                w.push(") / 2), 2) + COS(RADIANS(");
                w.push_arg(SqlValue::Float(self.point.lat));
                w.push(&format!(
                    ")) * COS(RADIANS({lat})) * POWER(SIN(RADIANS({lng} - "
                ));
                w.push_arg(SqlValue::Float(self.point.lng));
                w.push(") / 2), 2))))");
                Ok(())
            }
        }
    }

    fn write_lng_lat(&self, w: &mut SqlWriter) {
        w.push_arg(SqlValue::Float(self.point.lng));
        w.push(", ");
        w.push_arg(SqlValue::Float(self.point.lat));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::QuerySpec;

    #[test]
    fn test_mysql_fulltext() {
        let stmt = QuerySpec::new("articles")
            .search(&["title", "body"], "database")
            .order_by_desc("search_rank")
            .to_select(Dialect::MySql)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT *, MATCH(`title`, `body`) AGAINST(? IN NATURAL LANGUAGE MODE) AS search_rank \
             FROM `articles` WHERE MATCH(`title`, `body`) AGAINST(? IN NATURAL LANGUAGE MODE) \
             ORDER BY `search_rank` DESC"
        );
        assert_eq!(stmt.args.len(), 2);
    }

    #[test]
    fn test_postgres_fulltext() {
        let stmt = QuerySpec::new("articles")
            .search(&["title"], "database")
            .to_select(Dialect::Postgres)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT *, ts_rank(to_tsvector('simple', coalesce(\"title\", '')), \
             plainto_tsquery('simple', $1)) AS search_rank FROM \"articles\" \
             WHERE to_tsvector('simple', coalesce(\"title\", '')) @@ plainto_tsquery('simple', $2)"
        );
    }

    #[test]
    fn test_sqlite_fulltext_falls_back_to_like() {
        let stmt = QuerySpec::new("articles")
            .search(&["title", "body"], "db")
            .to_select(Dialect::Sqlite)
            .unwrap();
        assert!(stmt
            .sql
            .contains(r#"("title" LIKE ? ESCAPE '\' OR "body" LIKE ? ESCAPE '\')"#));
        assert_eq!(stmt.args[0], SqlValue::Text(String::from("%db%")));
    }

    #[test]
    fn test_sqlite_like_escapes_wildcards() {
        let stmt = QuerySpec::new("articles")
            .search(&["title"], r"100%_\x")
            .to_select(Dialect::Sqlite)
            .unwrap();
        assert_eq!(stmt.args[0], SqlValue::Text(String::from(r"%100\%\_\\x%")));
    }

    #[test]
    fn test_search_without_columns() {
        let err = QuerySpec::new("articles")
            .search(&[], "db")
            .to_select(Dialect::MySql)
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidArgument(_)));
    }

    #[test]
    fn test_geo_point_native() {
        let spec = QuerySpec::new("stores").geo_search(
            GeoColumn::Point(String::from("location")),
            GeoPoint::new(55.75, 37.61),
            5000.0,
        );
        let mysql = spec.to_select(Dialect::MySql).unwrap();
        assert!(mysql
            .sql
            .contains("ST_Distance_Sphere(`location`, POINT(?, ?)) AS distance"));
        assert!(mysql.sql.ends_with("ST_Distance_Sphere(`location`, POINT(?, ?)) <= ?"));
        assert_eq!(mysql.args[0], SqlValue::Float(37.61));
        assert_eq!(mysql.args.len(), 5);

        let pg = spec.to_select(Dialect::Postgres).unwrap();
        assert!(pg.sql.contains("ST_DistanceSphere(\"location\"::geometry"));
        assert!(pg.sql.ends_with("<= $5"));
    }

    #[test]
    fn test_geo_point_unsupported_on_sqlite() {
        let err = QuerySpec::new("stores")
            .geo_search(
                GeoColumn::Point(String::from("location")),
                GeoPoint::new(0.0, 0.0),
                10.0,
            )
            .to_select(Dialect::Sqlite)
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Unsupported {
                dialect: Dialect::Sqlite,
                ..
            }
        ));
    }

    #[test]
    fn test_geo_haversine_everywhere() {
        let spec = QuerySpec::new("stores").geo_search(
            GeoColumn::LatLng {
                lat: String::from("lat"),
                lng: String::from("lng"),
            },
            GeoPoint::new(48.85, 2.35),
            1000.0,
        );
        for dialect in Dialect::ALL {
            let stmt = spec.to_select(dialect).unwrap();
            assert!(stmt.sql.contains("ASIN(SQRT("));
            assert!(stmt.sql.contains(" AS distance"));
            assert_eq!(stmt.args.len(), 7);
        }
    }

    #[test]
    fn test_negative_radius() {
        let err = QuerySpec::new("stores")
            .geo_search(
                GeoColumn::LatLng {
                    lat: String::from("lat"),
                    lng: String::from("lng"),
                },
                GeoPoint::new(0.0, 0.0),
                -1.0,
            )
            .to_select(Dialect::MySql)
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidArgument(_)));
    }
}
