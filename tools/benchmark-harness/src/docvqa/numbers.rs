//! English number words ↔ digits
//!
//! Covers non-negative integers below one trillion and decimals read digit by
//! digit ("3.25" ↔ "three point two five"), which is how amounts appear in
//! DocVQA answers.

const ONES: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven", "twelve",
    "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen", "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const SCALES: [(u64, &str); 3] = [(1_000_000_000, "billion"), (1_000_000, "million"), (1_000, "thousand")];

const MAX: u64 = 999_999_999_999;

fn below_thousand(n: u64, words: &mut Vec<&'static str>) {
    let hundreds = n / 100;
    let rest = n % 100;
    if hundreds > 0 {
        words.push(ONES[hundreds as usize]);
        words.push("hundred");
    }
    if rest >= 20 {
        words.push(TENS[(rest / 10) as usize]);
        if rest % 10 > 0 {
            words.push(ONES[(rest % 10) as usize]);
        }
    } else if rest > 0 {
        words.push(ONES[rest as usize]);
    }
}

/// Spell out an integer: `123` → `"one hundred twenty three"`
pub fn integer_to_words(n: u64) -> Option<String> {
    if n > MAX {
        return None;
    }
    if n == 0 {
        return Some(ONES[0].to_string());
    }

    let mut words = Vec::new();
    let mut rest = n;
    for (scale, name) in SCALES {
        if rest >= scale {
            below_thousand(rest / scale, &mut words);
            words.push(name);
            rest %= scale;
        }
    }
    below_thousand(rest, &mut words);
    Some(words.join(" "))
}

/// Spell out a plain numeral (`"42"`, `"1,000"`, `"3.5"`); `None` for anything else
pub fn numeral_to_words(text: &str) -> Option<String> {
    let text = text.trim().replace(',', "");
    let (integer, fraction) = match text.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (text.as_str(), None),
    };
    if integer.is_empty() || !integer.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let mut words = integer_to_words(integer.parse().ok()?)?;
    if let Some(fraction) = fraction {
        if fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        words.push_str(" point");
        for digit in fraction.chars() {
            words.push(' ');
            words.push_str(ONES[digit.to_digit(10)? as usize]);
        }
    }
    Some(words)
}

fn small_value(word: &str) -> Option<u64> {
    if let Some(i) = ONES.iter().position(|w| *w == word) {
        return Some(i as u64);
    }
    TENS.iter()
        .position(|w| !w.is_empty() && *w == word)
        .map(|i| i as u64 * 10)
}

/// Rejects sequences that only add up by accident ("one one", "five ten");
/// a unit may follow a tens word and scales must descend.
fn words_to_integer(words: &[&str]) -> Option<u64> {
    let mut total = 0u64;
    let mut current = 0u64;
    let mut previous_small: Option<u64> = None;
    let mut last_scale = u64::MAX;
    let mut seen_number = false;

    for word in words {
        match *word {
            "and" => {}
            "hundred" => {
                if current == 0 || current >= 100 {
                    return None;
                }
                current *= 100;
                previous_small = None;
            }
            "thousand" | "million" | "billion" => {
                let scale = SCALES.iter().find(|(_, name)| name == word).map(|(scale, _)| *scale)?;
                if current == 0 || scale >= last_scale {
                    return None;
                }
                total = total.checked_add(current.checked_mul(scale)?)?;
                current = 0;
                previous_small = None;
                last_scale = scale;
            }
            other => {
                let value = small_value(other)?;
                match previous_small {
                    None => {}
                    Some(tens) if tens >= 20 && (1..10).contains(&value) => {}
                    Some(_) => return None,
                }
                current += value;
                previous_small = Some(value);
                seen_number = true;
            }
        }
    }

    if !seen_number {
        return None;
    }
    total.checked_add(current)
}

/// Read number words back as a numeral: `"three point five"` → `"3.5"`
///
/// Hyphenated tens ("twenty-one") are accepted. Returns `None` when any word
/// is not part of a number.
pub fn words_to_numeral(text: &str) -> Option<String> {
    let lowered = text.trim().to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|w| !w.is_empty())
        .collect();

    let (integer_words, fraction_words) = match words.iter().position(|w| *w == "point") {
        Some(i) => (&words[..i], Some(&words[i + 1..])),
        None => (&words[..], None),
    };

    let mut numeral = words_to_integer(integer_words)?.to_string();
    if let Some(fraction_words) = fraction_words {
        if fraction_words.is_empty() {
            return None;
        }
        numeral.push('.');
        for word in fraction_words {
            let digit = small_value(word).filter(|d| *d < 10)?;
            numeral.push_str(&digit.to_string());
        }
    }
    Some(numeral)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_to_words() {
        assert_eq!(integer_to_words(0).unwrap(), "zero");
        assert_eq!(integer_to_words(7).unwrap(), "seven");
        assert_eq!(integer_to_words(40).unwrap(), "forty");
        assert_eq!(integer_to_words(123).unwrap(), "one hundred twenty three");
        assert_eq!(integer_to_words(1_005).unwrap(), "one thousand five");
        assert_eq!(
            integer_to_words(2_000_310_000).unwrap(),
            "two billion three hundred ten thousand"
        );
        assert!(integer_to_words(1_000_000_000_000).is_none());
    }

    #[test]
    fn test_numeral_to_words() {
        assert_eq!(numeral_to_words("3.5").unwrap(), "three point five");
        assert_eq!(numeral_to_words("1,000").unwrap(), "one thousand");
        assert_eq!(numeral_to_words(" 12 ").unwrap(), "twelve");
        assert!(numeral_to_words("$100").is_none());
        assert!(numeral_to_words("3.").is_none());
        assert!(numeral_to_words("abc").is_none());
    }

    #[test]
    fn test_words_to_numeral() {
        assert_eq!(words_to_numeral("three").unwrap(), "3");
        assert_eq!(words_to_numeral("Twenty-One").unwrap(), "21");
        assert_eq!(words_to_numeral("one hundred and five").unwrap(), "105");
        assert_eq!(words_to_numeral("three point five").unwrap(), "3.5");
        assert_eq!(words_to_numeral("two million four thousand").unwrap(), "2004000");
        assert!(words_to_numeral("three apples").is_none());
        assert!(words_to_numeral("hundred").is_none());
        assert!(words_to_numeral("").is_none());
    }

    #[test]
    fn test_words_to_numeral_rejects_accidental_sums() {
        assert!(words_to_numeral("one one").is_none());
        assert!(words_to_numeral("and").is_none());
        assert!(words_to_numeral("twenty twenty").is_none());
        assert!(words_to_numeral("five ten").is_none());
        assert!(words_to_numeral("twenty zero").is_none());
        assert!(words_to_numeral("one thousand two thousand").is_none());
        assert_eq!(words_to_numeral("nineteen hundred and ninety nine").unwrap(), "1999");
        assert_eq!(words_to_numeral("zero").unwrap(), "0");
    }

    #[test]
    fn test_round_trip_through_words() {
        for n in [0u64, 9, 19, 20, 99, 101, 999, 12_345, 1_000_001, 987_654_321_012] {
            let words = integer_to_words(n).unwrap();
            assert_eq!(words_to_numeral(&words).unwrap(), n.to_string(), "{}", words);
        }
    }
}
