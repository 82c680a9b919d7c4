//! Group header labels
//!
//! Header text is a presentation choice, so it goes through a
//! [`LabelFormatter`] instead of being sliced inline by the renderer.

use crate::dataset::GroupKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Turns a group key into column header text (before LaTeX escaping)
pub trait LabelFormatter {
    fn format(&self, key: &GroupKey) -> String;
}

/// Components verbatim, joined by a space
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl LabelFormatter for Verbatim {
    fn format(&self, key: &GroupKey) -> String {
        key.components().join(" ")
    }
}

/// First `width` characters of each component, joined by a space
#[derive(Debug, Clone, Copy)]
pub struct Abbreviate {
    pub width: usize,
}

impl Default for Abbreviate {
    fn default() -> Self {
        Self { width: 3 }
    }
}

impl LabelFormatter for Abbreviate {
    fn format(&self, key: &GroupKey) -> String {
        key.components()
            .iter()
            .map(|component| component.chars().take(self.width).collect::<String>())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Explicit per-component replacements, falling back to another formatter
///
/// A component without an entry is formatted by `fallback` on its own.
#[derive(Debug, Clone)]
pub struct Lookup<F: LabelFormatter> {
    pub map: BTreeMap<String, String>,
    pub fallback: F,
}

impl<F: LabelFormatter> LabelFormatter for Lookup<F> {
    fn format(&self, key: &GroupKey) -> String {
        key.parts()
            .iter()
            .map(|part| {
                let text = part.to_string();
                match self.map.get(&text) {
                    Some(short) => short.clone(),
                    None => self.fallback.format(&GroupKey(vec![part.clone()])),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Serializable choice of header formatting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum LabelStyle {
    Verbatim,
    Abbreviate {
        #[serde(default = "default_width")]
        width: usize,
    },
    Lookup {
        map: BTreeMap<String, String>,
        /// Abbreviation width for unmapped components (`None` keeps them whole)
        #[serde(default)]
        width: Option<usize>,
    },
}

fn default_width() -> usize {
    3
}

impl LabelStyle {
    /// Header style used for composite keys when none is configured
    pub fn composite_default() -> Self {
        LabelStyle::Abbreviate {
            width: default_width(),
        }
    }

    pub fn formatter(&self) -> Box<dyn LabelFormatter> {
        match self {
            LabelStyle::Verbatim => Box::new(Verbatim),
            LabelStyle::Abbreviate { width } => Box::new(Abbreviate { width: *width }),
            LabelStyle::Lookup {
                map,
                width: Some(width),
            } => Box::new(Lookup {
                map: map.clone(),
                fallback: Abbreviate { width: *width },
            }),
            LabelStyle::Lookup { map, width: None } => Box::new(Lookup {
                map: map.clone(),
                fallback: Verbatim,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::KeyPart;

    fn key(parts: &[&str]) -> GroupKey {
        GroupKey(parts.iter().map(|p| KeyPart::Text(p.to_string())).collect())
    }

    #[test]
    fn test_verbatim() {
        assert_eq!(Verbatim.format(&key(&["Treatment"])), "Treatment");
        assert_eq!(Verbatim.format(&key(&["High", "Low"])), "High Low");
    }

    #[test]
    fn test_abbreviate_each_component() {
        let f = Abbreviate::default();
        assert_eq!(f.format(&key(&["Fully Abstract", "Control"])), "Ful Con");
        assert_eq!(f.format(&key(&["A", "Bo"])), "A Bo");
    }

    #[test]
    fn test_abbreviate_counts_characters_not_bytes() {
        let f = Abbreviate { width: 2 };
        assert_eq!(f.format(&key(&["Übung"])), "Üb");
    }

    #[test]
    fn test_abbreviate_numeric_component() {
        let f = Abbreviate::default();
        let k = GroupKey(vec![KeyPart::Number(2024.0), KeyPart::Text("Spring".into())]);
        assert_eq!(f.format(&k), "202 Spr");
    }

    #[test]
    fn test_lookup_with_fallback() {
        let mut map = BTreeMap::new();
        map.insert("Fully Abstract".to_string(), "FA".to_string());
        map.insert("Semi Abstract".to_string(), "SA".to_string());
        let f = Lookup {
            map,
            fallback: Abbreviate::default(),
        };
        assert_eq!(f.format(&key(&["Fully Abstract", "Control"])), "FA Con");
    }

    #[test]
    fn test_lookup_clone_is_independent() {
        let base = Lookup {
            map: BTreeMap::from([("Fully Abstract".to_string(), "FA".to_string())]),
            fallback: Verbatim,
        };
        let mut wider = base.clone();
        wider.map.insert("Control".to_string(), "C".to_string());

        assert_eq!(base.format(&key(&["Fully Abstract", "Control"])), "FA Control");
        assert_eq!(wider.format(&key(&["Fully Abstract", "Control"])), "FA C");
        assert!(format!("{:?}", base).contains("Fully Abstract"));
    }

    #[test]
    fn test_label_style_from_toml() {
        let style: LabelStyle = toml::from_str("style = \"abbreviate\"\nwidth = 2").unwrap();
        assert_eq!(style, LabelStyle::Abbreviate { width: 2 });
        assert_eq!(style.formatter().format(&key(&["High", "Low"])), "Hi Lo");

        let style: LabelStyle = toml::from_str("style = \"verbatim\"").unwrap();
        assert_eq!(style, LabelStyle::Verbatim);
    }
}
