//! Reference catalog of instructors and techniques.
//!
//! The catalog is static and read-only. Plans reference techniques by id and
//! progress entries reference metrics by `(technique id, metric id)`; this
//! module resolves those ids to display names and units.

use serde::Serialize;

/// A guitarist whose signature techniques appear in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Instructor {
    /// Unique id.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Short biography.
    pub bio: &'static str,
}

/// A measurable quantity tracked for a technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricDefinition {
    /// Unique within the owning technique.
    pub id: &'static str,
    /// Display label.
    pub label: &'static str,
    /// Unit suffix, possibly empty.
    pub unit: &'static str,
}

/// A guitar-playing skill with a fixed set of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Technique {
    /// Unique id.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// What the technique is.
    pub description: &'static str,
    /// The instructor the technique is associated with.
    pub instructor_id: &'static str,
    /// Metrics logged for this technique, in display order.
    pub default_metrics: &'static [MetricDefinition],
}

impl Technique {
    /// Look up one of this technique's metrics.
    #[must_use]
    pub fn metric(&self, metric_id: &str) -> Option<&'static MetricDefinition> {
        self.default_metrics.iter().find(|m| m.id == metric_id)
    }
}

const SPEED_BPM: MetricDefinition = MetricDefinition {
    id: "speed",
    label: "Speed (BPM)",
    unit: "bpm",
};

/// All instructors.
pub static INSTRUCTORS: &[Instructor] = &[
    Instructor {
        id: "eddie_van_halen",
        name: "Eddie Van Halen",
        bio: "A Dutch-American musician, songwriter, and producer. He was the main songwriter and lead guitarist of the American rock band Van Halen.",
    },
    Instructor {
        id: "dimebag_darrell",
        name: "Dimebag Darrell",
        bio: "An American musician and songwriter, best known as the guitarist and a founding member of Pantera and Damageplan.",
    },
    Instructor {
        id: "alexi_laiho",
        name: "Alexi Laiho",
        bio: "A Finnish guitarist, composer, and vocalist. He was best known as the lead guitarist, lead vocalist, and founding member of the melodic death metal band Children of Bodom.",
    },
];

/// All techniques, in catalog order.
pub static TECHNIQUES: &[Technique] = &[
    Technique {
        id: "legato",
        name: "Legato",
        description: "Playing musical notes smoothly and connected, often using hammer-ons and pull-offs to avoid picking every note.",
        instructor_id: "eddie_van_halen",
        default_metrics: &[
            SPEED_BPM,
            MetricDefinition {
                id: "accuracy",
                label: "Accuracy",
                unit: "%",
            },
        ],
    },
    Technique {
        id: "two_hand_tapping",
        name: "Two-Hand Tapping",
        description: "Using both hands on the fretboard to tap notes, allowing for wide intervals and fast passages.",
        instructor_id: "eddie_van_halen",
        default_metrics: &[
            SPEED_BPM,
            MetricDefinition {
                id: "cleanliness",
                label: "Cleanliness (1-10)",
                unit: "",
            },
        ],
    },
    Technique {
        id: "divebombs",
        name: "Divebombs",
        description: "Using the whammy bar to dramatically drop the pitch of a note and, optionally, return it.",
        instructor_id: "dimebag_darrell",
        default_metrics: &[MetricDefinition {
            id: "return_pitch",
            label: "Return to Pitch Accuracy",
            unit: "%",
        }],
    },
    Technique {
        id: "pinch_harmonics",
        name: "Pinch Harmonics",
        description: "A guitar technique to achieve high-pitched, 'squealing' harmonics by grazing the string with the thumb of the picking hand.",
        instructor_id: "dimebag_darrell",
        default_metrics: &[MetricDefinition {
            id: "consistency",
            label: "Consistency",
            unit: "%",
        }],
    },
    Technique {
        id: "shred_legato",
        name: "Shred Legato",
        description: "A very fast, aggressive form of legato playing often incorporating 3-note-per-string scales and complex patterns.",
        instructor_id: "alexi_laiho",
        default_metrics: &[
            SPEED_BPM,
            MetricDefinition {
                id: "stamina",
                label: "Stamina (seconds)",
                unit: "sec",
            },
        ],
    },
];

/// Look up a technique by id.
#[must_use]
pub fn technique(id: &str) -> Option<&'static Technique> {
    TECHNIQUES.iter().find(|t| t.id == id)
}

/// Look up an instructor by id.
#[must_use]
pub fn instructor(id: &str) -> Option<&'static Instructor> {
    INSTRUCTORS.iter().find(|i| i.id == id)
}

/// Look up a metric of a technique.
#[must_use]
pub fn metric(
    technique_id: &str,
    metric_id: &str,
) -> Option<(&'static Technique, &'static MetricDefinition)> {
    let tech = technique(technique_id)?;
    tech.metric(metric_id).map(|m| (tech, m))
}

/// Techniques associated with an instructor, in catalog order.
pub fn techniques_for(instructor_id: &str) -> impl Iterator<Item = &'static Technique> + '_ {
    TECHNIQUES
        .iter()
        .filter(move |t| t.instructor_id == instructor_id)
}

/// Every `(technique, metric)` pair in catalog order.
pub fn metric_pairs() -> impl Iterator<Item = (&'static Technique, &'static MetricDefinition)> {
    TECHNIQUES
        .iter()
        .flat_map(|t| t.default_metrics.iter().map(move |m| (t, m)))
}

/// Resolve a flat `{techniqueId}_{metricId}` key.
///
/// Ids may themselves contain underscores, so the key is matched against
/// every catalog pair and the first match in catalog order wins.
#[must_use]
pub fn resolve_composite_key(
    key: &str,
) -> Option<(&'static Technique, &'static MetricDefinition)> {
    metric_pairs().find(|(t, m)| {
        key.len() == t.id.len() + 1 + m.id.len()
            && key.starts_with(t.id)
            && key.as_bytes()[t.id.len()] == b'_'
            && key.ends_with(m.id)
    })
}
