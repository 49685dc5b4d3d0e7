// src/ngram/generator/char_ngrams.rs

use ahash::AHashMap;
use log::trace;

use crate::parser::TextParser;
use crate::ngram::types::{NGram, MARKER_UNIT};

use super::core::NGramGenerator;

impl<P: TextParser> NGramGenerator<P> {
    /// Length of the unit sequence after marker and short-string padding.
    pub(crate) fn padded_len(&self, unit_count: usize) -> usize {
        let n = self.config.ngram_size;
        let framed = if self.config.use_markers {
            unit_count + 2 * (n - 1)
        } else {
            unit_count
        };
        framed.max(n)
    }

    fn padded_units(&self, units: &[u32]) -> Vec<u32> {
        let n = self.config.ngram_size;
        let mut padded = Vec::with_capacity(self.padded_len(units.len()));
        if self.config.use_markers {
            padded.extend(std::iter::repeat(MARKER_UNIT).take(n - 1));
        }
        padded.extend_from_slice(units);
        if self.config.use_markers {
            padded.extend(std::iter::repeat(MARKER_UNIT).take(n - 1));
        }
        if padded.len() < n {
            padded.resize(n, MARKER_UNIT);
        }
        padded
    }

    /// Slide a window of `n` units over the padded sequence, numbering
    /// repeats so the result is a set.
    pub(crate) fn ngrams_from_units(&self, units: &[u32]) -> Vec<NGram> {
        let n = self.config.ngram_size;
        let padded = self.padded_units(units);
        let total_windows = padded.len() + 1 - n;

        let mut seen: AHashMap<&[u32], u32> = AHashMap::with_capacity(total_windows);
        let mut ngrams = Vec::with_capacity(total_windows);

        for window in padded.windows(n) {
            let occurrence = seen.entry(window).or_insert(0);
            *occurrence += 1;
            ngrams.push(NGram::new(window.to_vec(), *occurrence));
        }

        trace!("Generated {} ngrams from {} units (n={}, markers={})",
            ngrams.len(), units.len(), n, self.config.use_markers);
        ngrams
    }
}

#[cfg(test)]
mod tests {
    use crate::config::subsystems::generator::GeneratorConfig;
    use crate::ngram::types::{NGram, MARKER_UNIT};
    use crate::ngram::NGramGenerator;
    use crate::error::Error;

    fn generator(n: usize, markers: bool, unicode: bool) -> NGramGenerator {
        NGramGenerator::from_config(GeneratorConfig::new(n, markers, unicode)).unwrap()
    }

    fn units(s: &str) -> Vec<u32> {
        s.bytes().map(u32::from).collect()
    }

    #[test]
    fn plain_trigrams() {
        let grams = generator(3, false, false).extract(b"abcd").unwrap();
        assert_eq!(grams, vec![
            NGram::new(units("abc"), 1),
            NGram::new(units("bcd"), 1),
        ]);
    }

    #[test]
    fn markers_frame_both_ends() {
        let grams = generator(3, true, false).extract(b"ab").unwrap();
        let m = MARKER_UNIT;
        assert_eq!(grams.len(), 4);
        assert_eq!(grams[0].units, vec![m, m, 0x61]);
        assert_eq!(grams[1].units, vec![m, 0x61, 0x62]);
        assert_eq!(grams[2].units, vec![0x61, 0x62, m]);
        assert_eq!(grams[3].units, vec![0x62, m, m]);
    }

    #[test]
    fn repeated_ngrams_are_numbered() {
        let grams = generator(2, false, false).extract(b"aaaa").unwrap();
        let occurrences: Vec<u32> = grams.iter().map(|g| g.occurrence).collect();
        assert_eq!(occurrences, vec![1, 2, 3]);
        assert!(grams.iter().all(|g| g.units == units("aa")));
    }

    #[test]
    fn short_and_empty_strings_are_padded() {
        let gen = generator(3, false, false);
        let grams = gen.extract(b"a").unwrap();
        assert_eq!(grams, vec![NGram::new(vec![0x61, MARKER_UNIT, MARKER_UNIT], 1)]);

        let empty = gen.extract(b"").unwrap();
        assert_eq!(empty, vec![NGram::new(vec![MARKER_UNIT; 3], 1)]);

        let unigram_marked = generator(1, true, false).extract(b"").unwrap();
        assert_eq!(unigram_marked.len(), 1);
    }

    #[test]
    fn count_matches_extract() {
        for (n, markers) in [(1, false), (2, true), (3, false), (4, true)] {
            let gen = generator(n, markers, false);
            for text in ["", "a", "ab", "hello world", "aaaaaa"] {
                let extracted = gen.extract(text.as_bytes()).unwrap().len();
                assert_eq!(gen.count(text.as_bytes()).unwrap(), extracted, "n={} text={:?}", n, text);
            }
        }
    }

    #[test]
    fn unicode_mode_counts_codepoints() {
        let text = "スパゲティ".as_bytes();
        assert_eq!(generator(3, false, true).extract(text).unwrap().len(), 3);
        assert_eq!(generator(3, false, false).extract(text).unwrap().len(), 13);
    }

    #[test]
    fn unicode_mode_rejects_malformed_input() {
        let err = generator(3, false, true).extract(&[0x61, 0xFF]).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn keys_are_sorted_and_unique() {
        let keys = generator(2, true, false).extract_keys(b"banana").unwrap();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(keys.len(), 7);
    }

    #[test]
    fn invalid_size_is_a_config_error() {
        let err = NGramGenerator::from_config(GeneratorConfig::new(0, false, false)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
