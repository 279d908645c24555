//! Volcano class derivation from free-text primary type strings.

use std::fmt;

/// The four canonical volcano classes.
///
/// Derived from a free-text primary type via ordered substring matching;
/// see [`VolcanoClass::from_primary_type`]. Discriminants are the class
/// indices used throughout training and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolcanoClass {
    /// Primary type mentions "Stratovolcano".
    Stratovolcano,
    /// Primary type mentions "Shield".
    Shield,
    /// Primary type mentions "Caldera".
    Caldera,
    /// Everything else.
    Other,
}

impl VolcanoClass {
    /// All classes, in class-index order.
    pub const ALL: [VolcanoClass; 4] = [
        VolcanoClass::Stratovolcano,
        VolcanoClass::Shield,
        VolcanoClass::Caldera,
        VolcanoClass::Other,
    ];

    /// Derive the class from a free-text primary type.
    ///
    /// Rule order is significant: "Stratovolcano" wins over "Shield" wins
    /// over "Caldera"; anything unmatched is `Other`. Total and pure —
    /// every input maps to exactly one class.
    #[must_use]
    pub fn from_primary_type(primary_type: &str) -> Self {
        if primary_type.contains("Stratovolcano") {
            VolcanoClass::Stratovolcano
        } else if primary_type.contains("Shield") {
            VolcanoClass::Shield
        } else if primary_type.contains("Caldera") {
            VolcanoClass::Caldera
        } else {
            VolcanoClass::Other
        }
    }

    /// Return the zero-based class index.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            VolcanoClass::Stratovolcano => 0,
            VolcanoClass::Shield => 1,
            VolcanoClass::Caldera => 2,
            VolcanoClass::Other => 3,
        }
    }

    /// Return the canonical class name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            VolcanoClass::Stratovolcano => "Stratovolcano",
            VolcanoClass::Shield => "Shield",
            VolcanoClass::Caldera => "Caldera",
            VolcanoClass::Other => "Other",
        }
    }
}

impl fmt::Display for VolcanoClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
