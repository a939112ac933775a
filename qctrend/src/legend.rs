//! Shortest-unique-prefix abbreviations for legend labels.
//!
//! Long peptide and ion labels crowd plot legends, so each label is shortened
//! to the smallest string that still distinguishes it from every other label
//! in the same analyte bucket (peptides and ions are disambiguated
//! separately). Abbreviation strategies, tried in order:
//!
//! 1. Labels short enough that abbreviating would not save space are kept
//!    whole.
//! 2. If no other label shares the minimum-length prefix: `ABD…`.
//! 3. If the prefix plus the last characters is unique: `ABC…FGH`.
//! 4. If the label is the only one of its length among the prefix+suffix
//!    clashes, the remaining character count: `ABF(5)`.
//! 5. Otherwise the prefix plus the characters at the positions where the
//!    clashing labels diverge, with runs of shared characters collapsed to an
//!    ellipsis: `ABG…B…B…`.
//!
//! Peptide labels have bracketed modifications folded into a lowercase
//! residue first (`AAB[80]` → `AAb`), so modified and unmodified forms
//! compare by sequence.

use rustc_hash::FxHashMap;

use crate::payload::DataType;

pub const ELLIPSIS: char = '\u{2026}';

#[derive(Debug, Clone)]
pub struct UniquePrefixGenerator {
    min_length: usize,
    peptide_buckets: FxHashMap<String, Vec<String>>,
    ion_buckets: FxHashMap<String, Vec<String>>,
}

impl UniquePrefixGenerator {
    /// Index every label that will appear in the legend. `is_peptide` selects
    /// the analyte bucket (and modification stripping).
    pub fn new<I, S>(labels: I, min_length: usize) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: AsRef<str>,
    {
        let mut generator = UniquePrefixGenerator {
            min_length,
            peptide_buckets: FxHashMap::default(),
            ion_buckets: FxHashMap::default(),
        };
        for (label, is_peptide) in labels {
            generator.add(label.as_ref(), is_peptide);
        }
        generator
    }

    fn add(&mut self, label: &str, is_peptide: bool) {
        let stripped = if is_peptide {
            strip_modifications(label)
        } else {
            label.to_string()
        };
        let chars: Vec<char> = stripped.chars().collect();
        if chars.len() <= self.min_length {
            return;
        }
        let prefix: String = chars[..self.min_length].iter().collect();
        let bucket = if is_peptide {
            &mut self.peptide_buckets
        } else {
            &mut self.ion_buckets
        };
        let entries = bucket.entry(prefix).or_default();
        if !entries.contains(&stripped) {
            entries.push(stripped);
        }
    }

    /// The abbreviated form of `label` among the labels this generator was
    /// built with.
    pub fn unique_prefix(&self, label: &str, is_peptide: bool) -> String {
        let stripped = if is_peptide {
            strip_modifications(label)
        } else {
            label.to_string()
        };
        let chars: Vec<char> = stripped.chars().collect();

        // Prefix + ellipsis + suffix is as long as the label itself below
        // this length, so keep the label whole.
        if chars.len() <= self.min_length * 2 + 1 {
            return stripped;
        }

        let prefix: String = chars[..self.min_length].iter().collect();
        let bucket = if is_peptide {
            &self.peptide_buckets
        } else {
            &self.ion_buckets
        };
        let clashes: &[String] = bucket.get(&prefix).map(Vec::as_slice).unwrap_or(&[]);
        if clashes.len() <= 1 {
            return format!("{prefix}{ELLIPSIS}");
        }

        let suffix: String = chars[chars.len() - self.min_length..].iter().collect();
        let with_suffix: Vec<&String> = clashes
            .iter()
            .filter(|other| other.ends_with(&suffix))
            .collect();
        if with_suffix.len() <= 1 {
            return format!("{prefix}{ELLIPSIS}{suffix}");
        }

        let same_length = with_suffix
            .iter()
            .filter(|other| other.chars().count() == chars.len())
            .count();
        if same_length <= 1 {
            return format!("{prefix}({})", chars.len() - self.min_length);
        }

        self.disambiguate(&prefix, &chars, &stripped, &with_suffix)
    }

    /// Strategy 5: walk the label remainders position by position, keeping
    /// the characters where the clashing labels branch apart and collapsing
    /// runs of shared characters (two or more) into an ellipsis.
    fn disambiguate(
        &self,
        prefix: &str,
        chars: &[char],
        stripped: &str,
        with_suffix: &[&String],
    ) -> String {
        let remainder = &chars[self.min_length..];
        let mut active: Vec<Vec<char>> = with_suffix
            .iter()
            .filter(|other| other.as_str() != stripped)
            .map(|other| other.chars().skip(self.min_length).collect())
            .collect();

        let mut out = String::from(prefix);
        let mut pending_run: Vec<char> = Vec::new();
        let mut depth = 0;
        while depth < remainder.len() {
            active.retain(|other| other.len() > depth);
            if active.is_empty() {
                break;
            }
            let c = remainder[depth];
            let shared = active.iter().all(|other| other[depth] == c);
            if shared {
                pending_run.push(c);
            } else {
                flush_run(&mut out, &mut pending_run);
                out.push(c);
                active.retain(|other| other[depth] == c);
            }
            depth += 1;
            if active.is_empty() {
                break;
            }
        }

        if depth < remainder.len() {
            out.push(ELLIPSIS);
        }
        out
    }
}

fn flush_run(out: &mut String, pending_run: &mut Vec<char>) {
    if pending_run.len() >= 2 {
        out.push(ELLIPSIS);
    } else {
        for c in pending_run.iter() {
            out.push(*c);
        }
    }
    pending_run.clear();
}

/// Fold bracketed modifications into a lowercase residue: `AAB[80]` → `AAb`.
pub fn strip_modifications(label: &str) -> String {
    let chars: Vec<char> = label.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '[' {
            // stray bracket group with no preceding residue
            while i < chars.len() && chars[i] != ']' {
                i += 1;
            }
            i += 1;
        } else if i + 1 < chars.len() && chars[i + 1] == '[' {
            out.extend(c.to_lowercase());
            i += 2;
            while i < chars.len() && chars[i] != ']' {
                i += 1;
            }
            i += 1;
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

/// Legend text for one fragment series.
pub fn legend_item_text(
    generator: &UniquePrefixGenerator,
    fragment: &str,
    data_type: DataType,
) -> String {
    generator.unique_prefix(fragment, data_type == DataType::Peptide)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(labels: &[(&str, bool)]) -> UniquePrefixGenerator {
        UniquePrefixGenerator::new(labels.iter().copied(), 3)
    }

    #[test]
    fn short_labels_stay_whole() {
        let g = generator(&[("ABCDEFG", true), ("ABCE", true)]);
        assert_eq!(g.unique_prefix("ABCDEFG", true), "ABCDEFG");
        assert_eq!(g.unique_prefix("ABCE", true), "ABCE");
    }

    #[test]
    fn unique_prefix_gets_bare_ellipsis() {
        let g = generator(&[("ABDEFGHI", true), ("ABCDEFGHI", true)]);
        assert_eq!(g.unique_prefix("ABDEFGHI", true), "ABD…");
    }

    #[test]
    fn suffix_disambiguates() {
        let g = generator(&[("ABCDEFGH", true), ("ABCDEFGHI", true)]);
        assert_eq!(g.unique_prefix("ABCDEFGH", true), "ABC…FGH");
        assert_eq!(g.unique_prefix("ABCDEFGHI", true), "ABC…GHI");
    }

    #[test]
    fn length_count_disambiguates() {
        let g = generator(&[("ABFFFGHI", true), ("ABFFFFGHI", true)]);
        assert_eq!(g.unique_prefix("ABFFFGHI", true), "ABF(5)");
        assert_eq!(g.unique_prefix("ABFFFFGHI", true), "ABF(6)");
    }

    #[test]
    fn branch_characters_disambiguate() {
        let g = generator(&[("C16:0 fishy breath", false), ("C16:0 doggy breath", false)]);
        assert_eq!(g.unique_prefix("C16:0 fishy breath", false), "C16…f…");
        assert_eq!(g.unique_prefix("C16:0 doggy breath", false), "C16…d…");
    }

    #[test]
    fn modifications_fold_to_lowercase() {
        assert_eq!(strip_modifications("ABGAAB[80]AAB[99]AGHI"), "ABGAAbAAbAGHI");
        assert_eq!(strip_modifications("PEPTIDE"), "PEPTIDE");
    }

    #[test]
    fn peptides_and_ions_bucket_separately() {
        // identical prefixes across buckets do not clash
        let g = generator(&[("ABCDEFGH", true), ("ABCDEFGX", false)]);
        assert_eq!(g.unique_prefix("ABCDEFGH", true), "ABC…");
        assert_eq!(g.unique_prefix("ABCDEFGX", false), "ABC…");
    }
}
