//! Request-scoped cap on the number of records returned.

/// How many records a caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Limit {
    /// No usable limit given: return everything.
    #[default]
    Unbounded,
    /// Return at most this many records. Zero means none.
    Take(usize),
}

impl Limit {
    /// Interprets the raw `limit` query value.
    ///
    /// A positive integer caps the list, zero or a negative integer empties
    /// it, and a missing or non-numeric value is ignored.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(text) = raw.map(str::trim) else {
            return Self::Unbounded;
        };

        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Self::Unbounded;
        }
        if negative {
            return Self::Take(0);
        }

        // Too large for usize is the same as no cap at all.
        digits.parse().map_or(Self::Unbounded, Self::Take)
    }

    /// Truncates `records`, keeping their order.
    pub fn apply<T>(self, mut records: Vec<T>) -> Vec<T> {
        if let Self::Take(n) = self {
            records.truncate(n);
        }
        records
    }
}
