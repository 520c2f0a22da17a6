//! Minimum / recommended requirements block parsing
//!
//! The block is scraped as a flat token list such as
//! `["Minimum:", "OS:", "Windows 7", ..., "Recommended:", "OS:", "Windows 10", ...]`.
//! It is split into two sections around the section labels and each hardware
//! label is resolved to the token immediately following it.

use serde::{Deserialize, Serialize};

use crate::domain::SystemRequirements;
use crate::domain::constants::defaults;

/// Language-specific labels of the requirements block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelSet {
    pub min: String,
    pub rec: String,
    pub os: String,
    pub cpu: String,
    pub gpu: String,
    pub ram: String,
}

impl Default for LabelSet {
    fn default() -> Self {
        Self {
            min: defaults::MIN_LABEL.to_string(),
            rec: defaults::REC_LABEL.to_string(),
            os: defaults::OS_LABEL.to_string(),
            cpu: defaults::CPU_LABEL.to_string(),
            gpu: defaults::GPU_LABEL.to_string(),
            ram: defaults::RAM_LABEL.to_string(),
        }
    }
}

impl LabelSet {
    fn all(&self) -> [&str; 6] {
        [
            self.min.as_str(),
            self.rec.as_str(),
            self.os.as_str(),
            self.cpu.as_str(),
            self.gpu.as_str(),
            self.ram.as_str(),
        ]
    }

    /// True when some label is blank or two labels collide
    pub fn is_ambiguous(&self) -> bool {
        let labels = self.all();
        labels.iter().any(|label| label.trim().is_empty())
            || labels
                .iter()
                .enumerate()
                .any(|(i, label)| labels[i + 1..].contains(label))
    }
}

/// How the recommended section is cut out of the token list.
///
/// `Prefix` reproduces the legacy output: everything *before* the recommended
/// label (the whole list when it is absent), so recommended values resolve to
/// the minimum ones. `Suffix` takes the tokens from the recommended label
/// onward and is empty without one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementsSlicing {
    #[default]
    Prefix,
    Suffix,
}

/// Value of the token following `label` in `section`
pub fn get_labeled(section: &[&str], label: &str) -> Option<String> {
    let position = section.iter().position(|token| *token == label)?;
    section.get(position + 1).map(|value| (*value).to_string())
}

/// Parse with the legacy prefix slicing
pub fn parse<S: AsRef<str>>(tokens: &[S], labels: &LabelSet) -> SystemRequirements {
    parse_with(tokens, labels, RequirementsSlicing::Prefix)
}

pub fn parse_with<S: AsRef<str>>(
    tokens: &[S],
    labels: &LabelSet,
    slicing: RequirementsSlicing,
) -> SystemRequirements {
    let tokens: Vec<&str> = tokens
        .iter()
        .map(|token| token.as_ref().trim())
        .filter(|token| !token.is_empty())
        .collect();

    let min_index = tokens.iter().position(|token| *token == labels.min);
    let rec_index = tokens.iter().position(|token| *token == labels.rec);

    let min_section: &[&str] = match (min_index, rec_index) {
        (None, _) => &[],
        (Some(min), None) => &tokens[min..],
        (Some(min), Some(rec)) if min <= rec => &tokens[min..rec],
        (Some(_), Some(_)) => &[],
    };

    // a missing recommended label sits past the last token
    let rec_section: &[&str] = match (slicing, rec_index) {
        (RequirementsSlicing::Prefix, rec) => &tokens[..rec.unwrap_or(tokens.len())],
        (RequirementsSlicing::Suffix, Some(rec)) => &tokens[rec..],
        (RequirementsSlicing::Suffix, None) => &[],
    };

    SystemRequirements {
        min_os: get_labeled(min_section, &labels.os),
        min_cpu: get_labeled(min_section, &labels.cpu),
        min_ram: get_labeled(min_section, &labels.ram),
        min_gpu: get_labeled(min_section, &labels.gpu),
        rec_os: get_labeled(rec_section, &labels.os),
        rec_cpu: get_labeled(rec_section, &labels.cpu),
        rec_ram: get_labeled(rec_section, &labels.ram),
        rec_gpu: get_labeled(rec_section, &labels.gpu),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: [&str; 6] = ["Minimum:", "OS:", "Win7", "Recommended:", "OS:", "Win10"];

    fn full_block() -> Vec<&'static str> {
        vec![
            "Minimum:",
            " ",
            "OS:",
            " Windows 7 64-bit",
            "Processor:",
            " Intel Core i5",
            "Memory:",
            " 8 GB RAM",
            "Graphics:",
            " GTX 660",
            "\n",
            "Recommended:",
            "OS:",
            " Windows 10 64-bit",
            "Processor:",
            " Intel Core i7",
            "Memory:",
            " 16 GB RAM",
            "Graphics:",
            " GTX 1060",
        ]
    }

    #[test]
    fn prefix_slicing_resolves_recommended_to_minimum_values() {
        let reqs = parse(&SIMPLE, &LabelSet::default());
        assert_eq!(reqs.min_os.as_deref(), Some("Win7"));
        assert_eq!(reqs.rec_os.as_deref(), Some("Win7"));
    }

    #[test]
    fn suffix_slicing_reads_the_recommended_block() {
        let reqs = parse_with(&SIMPLE, &LabelSet::default(), RequirementsSlicing::Suffix);
        assert_eq!(reqs.min_os.as_deref(), Some("Win7"));
        assert_eq!(reqs.rec_os.as_deref(), Some("Win10"));
    }

    #[test]
    fn parses_full_block_with_noise_tokens() {
        let reqs = parse_with(&full_block(), &LabelSet::default(), RequirementsSlicing::Suffix);
        assert_eq!(reqs.min_os.as_deref(), Some("Windows 7 64-bit"));
        assert_eq!(reqs.min_cpu.as_deref(), Some("Intel Core i5"));
        assert_eq!(reqs.min_ram.as_deref(), Some("8 GB RAM"));
        assert_eq!(reqs.min_gpu.as_deref(), Some("GTX 660"));
        assert_eq!(reqs.rec_os.as_deref(), Some("Windows 10 64-bit"));
        assert_eq!(reqs.rec_cpu.as_deref(), Some("Intel Core i7"));
        assert_eq!(reqs.rec_ram.as_deref(), Some("16 GB RAM"));
        assert_eq!(reqs.rec_gpu.as_deref(), Some("GTX 1060"));
    }

    #[test]
    fn missing_recommended_label_prefix_spans_whole_list() {
        let reqs = parse(&["Minimum:", "OS:", "Win7"], &LabelSet::default());
        assert_eq!(reqs.min_os.as_deref(), Some("Win7"));
        assert_eq!(reqs.rec_os.as_deref(), Some("Win7"));
    }

    #[test]
    fn missing_recommended_label_suffix_is_empty() {
        let tokens = ["Minimum:", "OS:", "Win7", "Memory:", "4 GB"];
        let reqs = parse_with(&tokens, &LabelSet::default(), RequirementsSlicing::Suffix);
        assert_eq!(reqs.min_os.as_deref(), Some("Win7"));
        assert_eq!(reqs.min_ram.as_deref(), Some("4 GB"));
        assert_eq!(reqs.rec_os, None);
        assert_eq!(reqs.rec_ram, None);
    }

    #[test]
    fn missing_minimum_label_leaves_minimum_empty() {
        let tokens = ["OS:", "Win7", "Recommended:", "OS:", "Win10"];
        let reqs = parse(&tokens, &LabelSet::default());
        assert_eq!(reqs.min_os, None);
        assert_eq!(reqs.rec_os.as_deref(), Some("Win7"));
    }

    #[test]
    fn recommended_before_minimum_gives_empty_minimum() {
        let tokens = ["Recommended:", "OS:", "Win10", "Minimum:", "OS:", "Win7"];
        let reqs = parse_with(&tokens, &LabelSet::default(), RequirementsSlicing::Suffix);
        assert_eq!(reqs.min_os, None);
        assert_eq!(reqs.rec_os.as_deref(), Some("Win10"));
    }

    #[test]
    fn get_labeled_edge_cases() {
        assert_eq!(get_labeled(&[], "OS:"), None);
        assert_eq!(get_labeled(&["Memory:", "8 GB"], "OS:"), None);
        assert_eq!(get_labeled(&["OS:"], "OS:"), None);
        assert_eq!(get_labeled(&["OS:", "Win7", "OS:", "Win8"], "OS:"), Some("Win7".to_string()));
    }

    #[test]
    fn empty_tokens_yield_empty_requirements() {
        let tokens: [&str; 3] = ["", "  ", "\n"];
        assert!(parse(&tokens, &LabelSet::default()).is_empty());
    }

    #[test]
    fn custom_labels_are_honoured() {
        let labels = LabelSet {
            min: "Минимальные:".to_string(),
            rec: "Рекомендованные:".to_string(),
            os: "ОС:".to_string(),
            cpu: "Процессор:".to_string(),
            gpu: "Видеокарта:".to_string(),
            ram: "Оперативная память:".to_string(),
        };
        let tokens = ["Минимальные:", "ОС:", "Windows 7", "Оперативная память:", "4 GB"];
        let reqs = parse(&tokens, &labels);
        assert_eq!(reqs.min_os.as_deref(), Some("Windows 7"));
        assert_eq!(reqs.min_ram.as_deref(), Some("4 GB"));
    }

    #[test]
    fn label_set_ambiguity() {
        assert!(!LabelSet::default().is_ambiguous());

        let blank = LabelSet {
            os: " ".to_string(),
            ..LabelSet::default()
        };
        assert!(blank.is_ambiguous());

        let duplicate = LabelSet {
            rec: "Minimum:".to_string(),
            ..LabelSet::default()
        };
        assert!(duplicate.is_ambiguous());
    }

    #[test]
    fn slicing_deserializes_lowercase() {
        let slicing: RequirementsSlicing = serde_json::from_str("\"suffix\"").unwrap();
        assert_eq!(slicing, RequirementsSlicing::Suffix);
    }
}
