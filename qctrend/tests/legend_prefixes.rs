//! Legend abbreviation table carried over from the production test values.
//!
//! Every (input, expected) pair below must match character for character —
//! the abbreviations are part of the rendered legend contract.

use qctrend::UniquePrefixGenerator;

const PEPTIDE: bool = true;
const ION: bool = false;

/// (fragment, is_peptide, expected abbreviation)
const TEST_VALUES: [(&str, bool, &str); 41] = [
    ("", PEPTIDE, ""),
    ("A", PEPTIDE, "A"),
    ("A", PEPTIDE, "A"), // duplicate
    ("AB", PEPTIDE, "AB"),
    ("ABC", PEPTIDE, "ABC"),
    ("ABCD", PEPTIDE, "ABCD"),
    ("ABCDE", PEPTIDE, "ABCDE"),
    ("ABCDEF", PEPTIDE, "ABCDEF"),
    ("ABCDEFG", PEPTIDE, "ABCDEFG"),
    ("ABCDEFGH", PEPTIDE, "ABC…FGH"),
    ("ABCDEFGHI", PEPTIDE, "ABC…GHI"),
    ("ABCE", PEPTIDE, "ABCE"),
    ("ABDEFGHI", PEPTIDE, "ABD…"),
    ("ABEFGHI", PEPTIDE, "ABEFGHI"),
    ("ABEFGHIJ", PEPTIDE, "ABE…HIJ"),
    ("ABEFHI", PEPTIDE, "ABEFHI"),
    ("ABFFFGHI", PEPTIDE, "ABF(5)"),
    ("ABFFFFGHI", PEPTIDE, "ABF(6)"),
    ("ABFFFFAFGHI", PEPTIDE, "ABF…FA…"),
    ("ABFFFAFFGHI", PEPTIDE, "ABF…A…"),
    ("ABGAABAABAGHI", PEPTIDE, "ABG…B…B…"),
    ("ABGAAbAABAGHI", PEPTIDE, "ABG…b…B…"),
    ("ABGAABAAbAGHI", PEPTIDE, "ABG…B…b…"),
    ("ABGAAB[80]AAB[99]AGHI", PEPTIDE, "ABG…b…b…"),
    ("C32:0", ION, "C32:0"),
    ("C32:1", ION, "C32:1"),
    ("C32:2", ION, "C32:2"),
    ("C32:2", ION, "C32:2"), // duplicate
    ("C30:0", ION, "C30:0"),
    ("C[30]:0", ION, "C[30]:0"),
    ("C[400]:0", ION, "C[4…"),
    ("C12:0 fish breath", ION, "C12…"),
    ("C15:0 fish breath", ION, "C15(14)"),
    ("C15:0 doggy breath", ION, "C15(15)"),
    ("C16:0 fishy breath", ION, "C16…f…"),
    ("C16:0 doggy breath", ION, "C16…d…"),
    ("C14", ION, "C14"),
    ("C14:1", ION, "C14:1"),
    ("C14:1-OH", ION, "C14:1…"),
    ("C14:2", ION, "C14:2"),
    ("C14:2-OH", ION, "C14:2…"),
];

fn generator() -> UniquePrefixGenerator {
    UniquePrefixGenerator::new(
        TEST_VALUES
            .iter()
            .map(|(fragment, is_peptide, _)| (*fragment, *is_peptide)),
        3,
    )
}

#[test]
fn reproduces_the_full_abbreviation_table() {
    let generator = generator();
    for (fragment, is_peptide, expected) in TEST_VALUES {
        let actual = generator.unique_prefix(fragment, is_peptide);
        assert_eq!(
            actual, expected,
            "abbreviation mismatch for {fragment:?} (peptide: {is_peptide})"
        );
    }
}

#[test]
fn hydroxyl_ion_variants() {
    let labels = [
        ("C14", ION),
        ("C14:1", ION),
        ("C14:1-OH", ION),
        ("C14:2", ION),
        ("C14:2-OH", ION),
    ];
    let generator = UniquePrefixGenerator::new(labels.iter().copied(), 3);
    assert_eq!(generator.unique_prefix("C14", ION), "C14");
    assert_eq!(generator.unique_prefix("C14:1", ION), "C14:1");
    assert_eq!(generator.unique_prefix("C14:1-OH", ION), "C14:1…");
    assert_eq!(generator.unique_prefix("C14:2", ION), "C14:2");
    assert_eq!(generator.unique_prefix("C14:2-OH", ION), "C14:2…");
}

#[test]
fn dataset_wide_uniqueness_of_long_labels() {
    // abbreviations of distinct long labels inside one bucket never collide
    let generator = generator();
    let mut seen = std::collections::HashSet::new();
    for (fragment, is_peptide, _) in TEST_VALUES {
        if !is_peptide || fragment.len() <= 7 {
            continue;
        }
        let abbreviated = generator.unique_prefix(fragment, is_peptide);
        assert!(
            seen.insert(abbreviated.clone()),
            "collision on {abbreviated} for {fragment}"
        );
    }
}
