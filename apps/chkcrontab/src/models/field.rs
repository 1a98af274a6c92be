//! Time field positions, their bounds and symbolic name tables.

use std::fmt;

const MONTH_NAMES: &[(&str, u32)] = &[
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
];

const DAY_NAMES: &[(&str, u32)] = &[
    ("sun", 0),
    ("mon", 1),
    ("tue", 2),
    ("wed", 3),
    ("thu", 4),
    ("fri", 5),
    ("sat", 6),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The five time fields of a numeric job line, in file order.
pub enum FieldName {
    Minute,
    Hour,
    DayOfMonth,
    Month,
    DayOfWeek,
}

impl FieldName {
    pub const ALL: [FieldName; 5] = [
        FieldName::Minute,
        FieldName::Hour,
        FieldName::DayOfMonth,
        FieldName::Month,
        FieldName::DayOfWeek,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FieldName::Minute => "minute",
            FieldName::Hour => "hour",
            FieldName::DayOfMonth => "day of month",
            FieldName::Month => "month",
            FieldName::DayOfWeek => "day of week",
        }
    }

    /// Inclusive bounds. Day of week allows both 0 and 7 for Sunday.
    pub fn bounds(self) -> (u32, u32) {
        match self {
            FieldName::Minute => (0, 59),
            FieldName::Hour => (0, 23),
            FieldName::DayOfMonth => (1, 31),
            FieldName::Month => (1, 12),
            FieldName::DayOfWeek => (0, 7),
        }
    }

    pub fn names(self) -> &'static [(&'static str, u32)] {
        match self {
            FieldName::Month => MONTH_NAMES,
            FieldName::DayOfWeek => DAY_NAMES,
            _ => &[],
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy)]
/// One time field of one job line, with the rules it is checked against.
pub struct Field<'a> {
    pub name: FieldName,
    pub text: &'a str,
    pub min: u32,
    pub max: u32,
    pub names: &'static [(&'static str, u32)],
}

impl<'a> Field<'a> {
    pub fn new(name: FieldName, text: &'a str) -> Self {
        let (min, max) = name.bounds();
        Self {
            name,
            text,
            min,
            max,
            names: name.names(),
        }
    }

    /// Resolve a symbolic name, ignoring ASCII case.
    pub fn resolve_name(&self, name: &str) -> Option<u32> {
        self.names
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_resolve_case_insensitively() {
        let f = Field::new(FieldName::Month, "JAN");
        assert_eq!(f.resolve_name("JAN"), Some(1));
        assert_eq!(f.resolve_name("Dec"), Some(12));
        assert_eq!(f.resolve_name("january"), None);
        let d = Field::new(FieldName::DayOfWeek, "sun");
        assert_eq!(d.resolve_name("sun"), Some(0));
        assert_eq!(Field::new(FieldName::Hour, "x").resolve_name("mon"), None);
    }

    #[test]
    fn test_bounds_are_ordered() {
        for name in FieldName::ALL {
            let (min, max) = name.bounds();
            assert!(min <= max, "{name}");
        }
    }
}
