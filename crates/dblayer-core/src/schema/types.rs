//! Column data types.

/// A portable column type, mapped to a concrete type per dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    /// Small integer (2 bytes).
    Smallint,
    /// Integer (4 bytes).
    Integer,
    /// Big integer (8 bytes).
    Bigint,
    /// Real (4-byte float).
    Real,
    /// Double precision (8-byte float).
    Double,
    /// Decimal with precision and scale.
    Decimal { precision: u16, scale: u16 },
    /// Fixed-length character string.
    Char(u32),
    /// Variable-length character string.
    Varchar(u32),
    /// Text (variable length, no limit).
    Text,
    /// Binary large object.
    Blob,
    Date,
    Time,
    Timestamp,
    Datetime,
    Boolean,
    /// JSON document (`JSONB` on Postgres, text on SQLite).
    Json,
    /// Enumerated string (native on MySQL only).
    Enum(Vec<String>),
    /// A type name passed through as written.
    Custom(String),
}

impl DataType {
    /// Resolves a loose type name such as `varchar` or `int`.
    ///
    /// `length` is used as the string length or the decimal precision.
    /// Unrecognized names become [`DataType::Custom`], keeping the length.
    #[must_use]
    pub fn from_name(name: &str, length: Option<u32>) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "smallint" | "tinyint" => Self::Smallint,
            "int" | "integer" | "mediumint" => Self::Integer,
            "bigint" => Self::Bigint,
            "real" | "float" => Self::Real,
            "double" | "double precision" => Self::Double,
            "decimal" | "numeric" => Self::Decimal {
                precision: length.and_then(|l| u16::try_from(l).ok()).unwrap_or(10),
                scale: 2,
            },
            "char" => Self::Char(length.unwrap_or(1)),
            "varchar" | "string" => Self::Varchar(length.unwrap_or(255)),
            "text" | "mediumtext" | "longtext" | "tinytext" => Self::Text,
            "blob" | "binary" | "varbinary" | "bytea" | "longblob" => Self::Blob,
            "date" => Self::Date,
            "time" => Self::Time,
            "timestamp" => Self::Timestamp,
            "datetime" => Self::Datetime,
            "bool" | "boolean" => Self::Boolean,
            "json" | "jsonb" => Self::Json,
            _ => {
                let upper = name.trim().to_ascii_uppercase();
                Self::Custom(match length {
                    Some(n) => format!("{upper}({n})"),
                    None => upper,
                })
            }
        }
    }

    /// Returns `true` for integer and floating point types.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Smallint
                | Self::Integer
                | Self::Bigint
                | Self::Real
                | Self::Double
                | Self::Decimal { .. }
        )
    }
}
