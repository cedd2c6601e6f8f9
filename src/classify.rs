//! First-match keyword classifier; matching is a lowercase substring test.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{Result, ScoreError};
use crate::models::{ClassifiedEvent, Event, ThematicCategory};

pub const FALLBACK_CATEGORY: &str = "geopolitical";
pub const FALLBACK_WEIGHT: f64 = 1.0;

pub const MIN_CATEGORY_WEIGHT: f64 = 0.7;
pub const MAX_CATEGORY_WEIGHT: f64 = 1.6;

/// Vocabulary in priority order.
pub fn default_vocabulary() -> Vec<ThematicCategory> {
    vec![
        ThematicCategory::new(
            "war",
            1.6,
            &["war", "invasion", "annexation"],
            &["defense equities", "gold"],
        ),
        ThematicCategory::new(
            "military",
            1.5,
            &["military", "troops", "missile", "airstrike", "drone attack", "naval"],
            &["defense equities", "gold"],
        ),
        ThematicCategory::new(
            "conflict",
            1.4,
            &["conflict", "clash", "insurgent", "militia", "terror"],
            &["gold", "sovereign bonds"],
        ),
        ThematicCategory::new(
            "strike",
            1.1,
            &["strike", "walkout", "industrial action"],
            &["equities", "freight"],
        ),
        ThematicCategory::new(
            "supply_disruption",
            1.2,
            &["supply chain", "shortage", "port closure", "shipping disruption", "blockade"],
            &["freight", "industrial metals"],
        ),
        ThematicCategory::new(
            "sanctions",
            1.3,
            &["sanction", "embargo", "tariff", "export control", "asset freeze"],
            &["fx", "commodities"],
        ),
        ThematicCategory::new(
            "energy",
            1.3,
            &["oil", "gas", "pipeline", "refinery", "lng", "opec", "power grid"],
            &["crude oil", "natural gas"],
        ),
        ThematicCategory::new(
            "political",
            1.0,
            &["government", "election", "parliament", "coup", "minister", "protest"],
            &["sovereign bonds", "fx"],
        ),
        ThematicCategory::new(
            "diplomacy",
            0.7,
            &["diplomat", "summit", "treaty", "negotiation", "talks", "ceasefire"],
            &["fx"],
        ),
    ]
}

pub fn fallback_category() -> ThematicCategory {
    ThematicCategory::new(FALLBACK_CATEGORY, FALLBACK_WEIGHT, &[], &[])
}

#[derive(Debug, Clone)]
pub struct Classifier {
    categories: Vec<ThematicCategory>,
    fallback: ThematicCategory,
}

impl Classifier {
    /// Build a classifier over an ordered vocabulary, rejecting vocabularies
    /// that could not classify deterministically.
    pub fn new(mut categories: Vec<ThematicCategory>, fallback: ThematicCategory) -> Result<Self> {
        if fallback.name.trim().is_empty() {
            return Err(ScoreError::Configuration(
                "vocabulary has no fallback category".to_string(),
            ));
        }
        check_weight(&fallback)?;

        let mut seen = HashSet::new();
        seen.insert(fallback.name.clone());
        for category in categories.iter_mut() {
            check_weight(category)?;
            normalize_keywords(category)?;
            if !seen.insert(category.name.clone()) {
                return Err(ScoreError::Configuration(format!(
                    "category `{}` is defined twice",
                    category.name
                )));
            }
        }

        Ok(Classifier {
            categories,
            fallback,
        })
    }

    pub fn standard() -> Result<Self> {
        Classifier::new(default_vocabulary(), fallback_category())
    }

    pub fn fallback(&self) -> &ThematicCategory {
        &self.fallback
    }

    pub fn classify(&self, text: &str) -> &ThematicCategory {
        let lowered = text.trim().to_lowercase();
        if lowered.is_empty() {
            return &self.fallback;
        }

        let category = self
            .categories
            .iter()
            .find(|category| category.matches(&lowered))
            .unwrap_or(&self.fallback);
        debug!(category = %category.name, "classified event text");
        category
    }

    pub fn classify_event(&self, event: Event) -> ClassifiedEvent {
        let category = self.classify(&event.text).clone();
        ClassifiedEvent { event, category }
    }
}

/// Lowercases and trims keywords; a blank keyword would match every text.
fn normalize_keywords(category: &mut ThematicCategory) -> Result<()> {
    if category.keywords.is_empty() {
        return Err(ScoreError::Configuration(format!(
            "category `{}` has no keywords",
            category.name
        )));
    }
    for keyword in category.keywords.iter_mut() {
        let normalized = keyword.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ScoreError::Configuration(format!(
                "category `{}` has a blank keyword",
                category.name
            )));
        }
        *keyword = normalized;
    }
    Ok(())
}

fn check_weight(category: &ThematicCategory) -> Result<()> {
    if !category.weight.is_finite()
        || category.weight < MIN_CATEGORY_WEIGHT
        || category.weight > MAX_CATEGORY_WEIGHT
    {
        return Err(ScoreError::Configuration(format!(
            "category `{}` weight {} outside [{MIN_CATEGORY_WEIGHT}, {MAX_CATEGORY_WEIGHT}]",
            category.name, category.weight
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::standard().unwrap()
    }

    fn name_and_weight(text: &str) -> (String, f64) {
        let classifier = classifier();
        let category = classifier.classify(text);
        (category.name.clone(), category.weight)
    }

    #[test]
    fn war_keyword_maps_to_war() {
        assert_eq!(
            name_and_weight("Full-scale invasion reported at dawn"),
            ("war".to_string(), 1.6)
        );
        assert_eq!(name_and_weight("WAR declared"), ("war".to_string(), 1.6));
    }

    #[test]
    fn earlier_category_wins_ties() {
        let (name, _) = name_and_weight("government mobilises for war");
        assert_eq!(name, "war");

        let (name, _) = name_and_weight("military airstrike on depot");
        assert_eq!(name, "military");
    }

    #[test]
    fn unmatched_and_blank_text_fall_back() {
        assert_eq!(
            name_and_weight("quarterly earnings beat estimates"),
            ("geopolitical".to_string(), 1.0)
        );
        assert_eq!(name_and_weight(""), ("geopolitical".to_string(), 1.0));
        assert_eq!(name_and_weight("   \t"), ("geopolitical".to_string(), 1.0));
    }

    #[test]
    fn substring_matching_is_kept() {
        let (name, _) = name_and_weight("Talks in Warsaw resume");
        assert_eq!(name, "war");
    }

    #[test]
    fn scenario_texts_classify() {
        assert_eq!(name_and_weight("oil refinery fire"), ("energy".to_string(), 1.3));
        assert_eq!(
            name_and_weight("government election results"),
            ("political".to_string(), 1.0)
        );
        assert_eq!(name_and_weight("summit ends"), ("diplomacy".to_string(), 0.7));
    }

    #[test]
    fn alternate_vocabulary_can_be_injected() {
        let classifier = Classifier::new(
            vec![ThematicCategory::new("cyber", 1.2, &["ransomware"], &["equities"])],
            fallback_category(),
        )
        .unwrap();
        assert_eq!(classifier.classify("Ransomware hits port").name, "cyber");
        assert_eq!(classifier.classify("war").name, "geopolitical");
    }

    #[test]
    fn rejects_bad_vocabularies() {
        let unnamed = ThematicCategory::new("", 1.0, &[], &[]);
        assert!(matches!(
            Classifier::new(default_vocabulary(), unnamed),
            Err(ScoreError::Configuration(_))
        ));

        let heavy = vec![ThematicCategory::new("heavy", 2.0, &["x"], &[])];
        assert!(Classifier::new(heavy, fallback_category()).is_err());

        let duplicate = vec![
            ThematicCategory::new("war", 1.6, &["war"], &[]),
            ThematicCategory::new("war", 1.5, &["battle"], &[]),
        ];
        assert!(Classifier::new(duplicate, fallback_category()).is_err());

        let shadowing = vec![ThematicCategory::new("geopolitical", 1.0, &["x"], &[])];
        assert!(Classifier::new(shadowing, fallback_category()).is_err());

        let mut catch_all = vec![ThematicCategory::new("cyber", 1.2, &["ransomware", ""], &[])];
        catch_all.extend(default_vocabulary());
        assert!(matches!(
            Classifier::new(catch_all, fallback_category()),
            Err(ScoreError::Configuration(_))
        ));

        let blank = vec![ThematicCategory::new("cyber", 1.2, &["  "], &[])];
        assert!(Classifier::new(blank, fallback_category()).is_err());

        let keywordless = vec![ThematicCategory::new("cyber", 1.2, &[], &[])];
        assert!(Classifier::new(keywordless, fallback_category()).is_err());
    }

    #[test]
    fn literal_keywords_are_normalized() {
        let opec = ThematicCategory {
            name: "cartel".to_string(),
            weight: 1.3,
            keywords: vec![" OPEC ".to_string()],
            assets: vec!["crude oil".to_string()],
        };
        let classifier = Classifier::new(vec![opec], fallback_category()).unwrap();
        assert_eq!(classifier.categories[0].keywords, vec!["opec".to_string()]);
        assert_eq!(classifier.classify("OPEC cuts output").name, "cartel");
        assert_eq!(classifier.classify("quarterly earnings").name, "geopolitical");
    }

    #[test]
    fn classify_event_keeps_event() {
        let event = Event {
            id: uuid::Uuid::new_v4(),
            region: "europe".to_string(),
            text: "New sanctions package".to_string(),
            occurred_at: chrono::Utc::now(),
        };
        let classified = classifier().classify_event(event.clone());
        assert_eq!(classified.event, event);
        assert_eq!(classified.category.name, "sanctions");
    }
}
