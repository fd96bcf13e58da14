//! Utility functions for couchmesh

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Port every CouchDB instance listens on
pub const COUCHDB_PORT: u16 = 5984;

/// Percent-encoding set for database names in URL paths
const DB_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b'/')
    .add(b'%')
    .add(b' ')
    .add(b'?')
    .add(b'#')
    .add(b'+');

/// URL of `db` on a CouchDB instance reachable at `host`
pub fn database_url(host: &str, port: u16, db: &str) -> String {
    format!(
        "http://{}:{}/{}",
        host,
        port,
        utf8_percent_encode(db, DB_ENCODE_SET)
    )
}

/// Parse duration string (e.g., "30s", "5m", "1h", "7d")
pub fn parse_duration(s: &str) -> crate::Result<std::time::Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(crate::Error::InvalidConfig("empty duration".into()));
    }

    let (num_str, unit) = if let Some(num) = s.strip_suffix("ms") {
        (num, "ms")
    } else {
        let split = s.len() - s.chars().last().map_or(0, char::len_utf8);
        (&s[..split], &s[split..])
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| crate::Error::InvalidConfig(format!("invalid duration: {}", s)))?;

    let secs = |factor: u64| {
        num.checked_mul(factor)
            .map(std::time::Duration::from_secs)
            .ok_or_else(|| crate::Error::InvalidConfig(format!("duration out of range: {}", s)))
    };

    let duration = match unit {
        "ms" => std::time::Duration::from_millis(num),
        "s" => std::time::Duration::from_secs(num),
        "m" => secs(60)?,
        "h" => secs(3600)?,
        "d" => secs(86400)?,
        _ => {
            return Err(crate::Error::InvalidConfig(format!(
                "unknown duration unit: {}",
                unit
            )))
        }
    };

    Ok(duration)
}

/// Validate a namespace identifier (RFC 1123 label)
pub fn validate_namespace(namespace: &str) -> crate::Result<()> {
    if namespace.is_empty() {
        return Err(crate::Error::InvalidDescriptor(
            "namespace cannot be empty".into(),
        ));
    }

    if namespace.len() > 63 {
        return Err(crate::Error::InvalidDescriptor(
            "namespace too long (max 63 characters)".into(),
        ));
    }

    let valid_char = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-';
    if !namespace.chars().all(valid_char) {
        return Err(crate::Error::InvalidDescriptor(format!(
            "namespace {:?} may only contain lowercase letters, digits and '-'",
            namespace
        )));
    }

    if namespace.starts_with('-') || namespace.ends_with('-') {
        return Err(crate::Error::InvalidDescriptor(format!(
            "namespace {:?} must start and end with a letter or digit",
            namespace
        )));
    }

    Ok(())
}

/// Validate a CouchDB database name
pub fn validate_database_name(db: &str) -> crate::Result<()> {
    let mut chars = db.chars();
    match chars.next() {
        None => {
            return Err(crate::Error::InvalidDescriptor(
                "database name cannot be empty".into(),
            ))
        }
        Some(first) if !first.is_ascii_lowercase() => {
            return Err(crate::Error::InvalidDescriptor(format!(
                "database name {:?} must start with a lowercase letter",
                db
            )))
        }
        Some(_) => {}
    }

    let valid_char = |c: char| {
        c.is_ascii_lowercase() || c.is_ascii_digit() || "_$()+-/".contains(c)
    };
    if !chars.all(valid_char) {
        return Err(crate::Error::InvalidDescriptor(format!(
            "database name {:?} contains invalid characters",
            db
        )));
    }

    Ok(())
}
