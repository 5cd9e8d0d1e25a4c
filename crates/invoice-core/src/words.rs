//! # Amounts in Words
//!
//! Spells whole amounts for the "amount in words" line of the invoice
//! footer.
//!
//! ```text
//! 3,442,000  persian  سه میلیون و چهارصد و چهل و دو هزار
//!            english  three million four hundred forty-two thousand
//! ```
//!
//! Numbers are split into groups of three digits; each non-zero group is
//! spelled and followed by its scale word. Persian joins groups (and the
//! parts inside a group) with " و ".

use serde::{Deserialize, Serialize};

/// Language used to spell amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberWords {
    #[default]
    English,
    Persian,
}

impl NumberWords {
    /// Spells `n` in this language.
    ///
    /// ## Example
    /// ```rust
    /// use invoice_core::words::NumberWords;
    ///
    /// assert_eq!(NumberWords::English.spell(2_006_000), "two million six thousand");
    /// assert_eq!(NumberWords::Persian.spell(2_006_000), "دو میلیون و شش هزار");
    /// ```
    pub fn spell(&self, n: i64) -> String {
        let spelled = match self {
            NumberWords::English => spell_with(n.unsigned_abs(), &ENGLISH),
            NumberWords::Persian => spell_with(n.unsigned_abs(), &PERSIAN),
        };
        if n < 0 {
            let minus = match self {
                NumberWords::English => ENGLISH.minus,
                NumberWords::Persian => PERSIAN.minus,
            };
            format!("{minus} {spelled}")
        } else {
            spelled
        }
    }
}

struct Vocabulary {
    zero: &'static str,
    minus: &'static str,
    /// 1..=19, index 0 unused.
    small: [&'static str; 20],
    /// 20, 30, .. 90 at index 2..=9.
    tens: [&'static str; 10],
    /// 100 .. 900 at index 1..=9, `None` when built from `small` + hundred.
    hundreds: Option<[&'static str; 10]>,
    hundred: &'static str,
    scales: [&'static str; 7],
    /// Between the parts of one group (hundreds, tens, ones).
    part_joiner: &'static str,
    /// Between tens and ones ("forty-two" / "چهل و دو").
    tens_joiner: &'static str,
    /// Between groups.
    group_joiner: &'static str,
}

const ENGLISH: Vocabulary = Vocabulary {
    zero: "zero",
    minus: "minus",
    small: [
        "", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
        "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen",
        "eighteen", "nineteen",
    ],
    tens: [
        "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
    ],
    hundreds: None,
    hundred: "hundred",
    scales: [
        "", "thousand", "million", "billion", "trillion", "quadrillion", "quintillion",
    ],
    part_joiner: " ",
    tens_joiner: "-",
    group_joiner: " ",
};

const PERSIAN: Vocabulary = Vocabulary {
    zero: "صفر",
    minus: "منفی",
    small: [
        "", "یک", "دو", "سه", "چهار", "پنج", "شش", "هفت", "هشت", "نه", "ده", "یازده",
        "دوازده", "سیزده", "چهارده", "پانزده", "شانزده", "هفده", "هجده", "نوزده",
    ],
    tens: [
        "", "", "بیست", "سی", "چهل", "پنجاه", "شصت", "هفتاد", "هشتاد", "نود",
    ],
    hundreds: Some([
        "", "صد", "دویست", "سیصد", "چهارصد", "پانصد", "ششصد", "هفتصد", "هشتصد", "نهصد",
    ]),
    hundred: "صد",
    scales: ["", "هزار", "میلیون", "میلیارد", "تریلیون", "کوادریلیون", "کوینتیلیون"],
    part_joiner: " و ",
    tens_joiner: " و ",
    group_joiner: " و ",
};

fn spell_with(n: u64, vocab: &Vocabulary) -> String {
    if n == 0 {
        return vocab.zero.to_string();
    }

    let mut groups = Vec::new();
    let mut rest = n;
    while rest > 0 {
        groups.push((rest % 1000) as usize);
        rest /= 1000;
    }

    let mut parts = Vec::new();
    for (scale, &group) in groups.iter().enumerate().rev() {
        if group == 0 {
            continue;
        }
        let mut spelled = spell_group(group, vocab);
        if !vocab.scales[scale].is_empty() {
            spelled.push(' ');
            spelled.push_str(vocab.scales[scale]);
        }
        parts.push(spelled);
    }
    parts.join(vocab.group_joiner)
}

/// Spells 1..=999.
fn spell_group(n: usize, vocab: &Vocabulary) -> String {
    let mut parts = Vec::new();

    let hundreds = n / 100;
    if hundreds > 0 {
        match &vocab.hundreds {
            Some(words) => parts.push(words[hundreds].to_string()),
            None => parts.push(format!("{} {}", vocab.small[hundreds], vocab.hundred)),
        }
    }

    let below = n % 100;
    if below >= 20 {
        let tens = vocab.tens[below / 10];
        match below % 10 {
            0 => parts.push(tens.to_string()),
            ones => parts.push(format!("{}{}{}", tens, vocab.tens_joiner, vocab.small[ones])),
        }
    } else if below > 0 {
        parts.push(vocab.small[below].to_string());
    }

    parts.join(vocab.part_joiner)
}
