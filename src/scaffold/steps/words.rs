//! Word lists for database suffixes. Lowercase ASCII letters only, so a
//! suffix always has the shape `[a-z]+_[a-z]+`.

use rand::prelude::IndexedRandom;
use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "amber", "bold", "brave", "bright", "calm", "clever", "cosmic", "crisp", "dusty", "eager",
    "fancy", "gentle", "golden", "happy", "hidden", "humble", "jolly", "keen", "lively", "lucky",
    "mellow", "misty", "nimble", "noble", "plucky", "proud", "quick", "quiet", "rapid", "rustic",
    "shiny", "silent", "sleek", "snowy", "solar", "steady", "sunny", "swift", "tidy", "vivid",
    "warm", "wild", "witty", "zesty",
];

const NOUNS: &[&str] = &[
    "acorn", "badger", "beacon", "birch", "canyon", "cedar", "comet", "coral", "crane", "delta",
    "ember", "falcon", "fern", "fjord", "fox", "glacier", "harbor", "hawk", "heron", "island",
    "lagoon", "lantern", "lynx", "maple", "meadow", "mesa", "moose", "nebula", "orchid", "otter",
    "panda", "pebble", "pine", "prairie", "raven", "reef", "river", "sparrow", "summit", "thistle",
    "tundra", "walrus", "willow", "wren",
];

/// A fresh `adjective_noun` pair.
pub(crate) fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES.choose(rng).unwrap_or(&"quiet");
    let noun = NOUNS.choose(rng).unwrap_or(&"otter");
    format!("{adjective}_{noun}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_are_lowercase_letters() {
        for word in ADJECTIVES.iter().chain(NOUNS) {
            assert!(
                !word.is_empty() && word.chars().all(|c| c.is_ascii_lowercase()),
                "{word}"
            );
        }
    }

    #[test]
    fn test_suffix_shape() {
        let mut rng = rand::rng();
        for _ in 0..50 {
            let suffix = random_suffix(&mut rng);
            let (adj, noun) = suffix.split_once('_').unwrap();
            assert!(ADJECTIVES.contains(&adj));
            assert!(NOUNS.contains(&noun));
        }
    }
}
